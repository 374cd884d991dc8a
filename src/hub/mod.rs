//! Multicast hub: one producer, many independent subscribers.
//!
//! Every subscriber owns a bounded buffer. A hub configured with a replay
//! depth `N` hands the last `N` published values to each new subscriber
//! before any live value, which is how the state stream replays its current
//! snapshot. A replay depth of zero gives fire-once delivery for effects.
//!
//! ```text
//! publish ──→ history (last N) ──→ Slot ──→ Subscription
//!                          ├─────→ Slot ──→ Subscription
//!                          └─────→ Slot ──→ Subscription
//! ```

mod subscription;

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::OverflowPolicy;

use subscription::{Push, Slot};

pub use subscription::Subscription;

/// Explicitly owned multicast hub with a subscriber list.
pub struct Hub<T> {
    inner: Arc<HubInner<T>>,
}

struct HubInner<T> {
    replay: usize,
    capacity: usize,
    overflow: OverflowPolicy,
    state: Mutex<HubState<T>>,
}

struct HubState<T> {
    history: VecDeque<T>,
    subscribers: Vec<Arc<Slot<T>>>,
    closed: bool,
}

impl<T> Clone for Hub<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone> Hub<T> {
    /// Create a hub replaying the last `replay` values.
    ///
    /// `capacity` is clamped so a subscriber buffer always fits the replay.
    pub fn new(replay: usize, capacity: usize, overflow: OverflowPolicy) -> Self {
        Self {
            inner: Arc::new(HubInner {
                replay,
                capacity: capacity.max(replay).max(1),
                overflow,
                state: Mutex::new(HubState {
                    history: VecDeque::with_capacity(replay),
                    subscribers: Vec::new(),
                    closed: false,
                }),
            }),
        }
    }

    /// Seed the replay history as if `value` had been published.
    pub fn with_seed(self, value: T) -> Self {
        {
            let mut state = self.inner.state.lock();
            self.inner.record(&mut state, &value);
        }
        self
    }

    /// Attach a new subscriber. On a closed hub the subscription yields the
    /// replay history and then ends.
    pub fn subscribe(&self) -> Subscription<T> {
        let mut state = self.inner.state.lock();
        let slot = Arc::new(Slot::new(state.history.clone(), state.closed));
        if !state.closed {
            state.subscribers.push(Arc::clone(&slot));
        }
        Subscription::new(slot)
    }

    /// Deliver `value` to every attached subscriber.
    ///
    /// Returns false if the hub is closed. Under `OverflowPolicy::Suspend`
    /// this waits for each full subscriber buffer to make room.
    pub async fn publish(&self, value: T) -> bool {
        let targets = {
            let mut state = self.inner.state.lock();
            if state.closed {
                return false;
            }
            self.inner.record(&mut state, &value);
            self.inner.targets(&mut state)
        };
        self.inner.deliver(targets, value).await;
        true
    }

    /// Like [`publish`](Self::publish), but skips a value equal to the most
    /// recently replayed one. Returns whether the value was delivered.
    pub async fn publish_distinct(&self, value: T) -> bool
    where
        T: PartialEq,
    {
        let targets = {
            let mut state = self.inner.state.lock();
            if state.closed {
                return false;
            }
            if self.inner.replay > 0 && state.history.back() == Some(&value) {
                return false;
            }
            self.inner.record(&mut state, &value);
            self.inner.targets(&mut state)
        };
        self.inner.deliver(targets, value).await;
        true
    }

    /// Mark the hub completed. Subscribers drain their buffers and end.
    pub fn close(&self) {
        let subscribers = {
            let mut state = self.inner.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            std::mem::take(&mut state.subscribers)
        };
        for slot in subscribers {
            slot.close();
        }
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }

    /// Number of subscribers still attached.
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .state
            .lock()
            .subscribers
            .iter()
            .filter(|slot| !slot.is_detached())
            .count()
    }
}

impl<T: Clone> HubInner<T> {
    fn record(&self, state: &mut HubState<T>, value: &T) {
        if self.replay == 0 {
            return;
        }
        if state.history.len() == self.replay {
            state.history.pop_front();
        }
        state.history.push_back(value.clone());
    }

    fn targets(&self, state: &mut HubState<T>) -> Vec<Arc<Slot<T>>> {
        state.subscribers.retain(|slot| !slot.is_detached());
        state.subscribers.clone()
    }

    async fn deliver(&self, targets: Vec<Arc<Slot<T>>>, value: T) {
        for slot in targets {
            let mut pending = value.clone();
            loop {
                match slot.push(pending, self.capacity, self.overflow) {
                    Push::Delivered | Push::Gone => break,
                    Push::Full(value) => {
                        pending = value;
                        slot.wait_for_space(self.capacity).await;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::time::Duration;

    #[tokio::test]
    async fn replay_one_yields_seed_then_live_values() {
        let hub = Hub::new(1, 8, OverflowPolicy::DropOldest).with_seed(0);
        let mut early = hub.subscribe();
        assert_eq!(early.recv().await, Some(0));

        hub.publish(1).await;
        let mut late = hub.subscribe();
        hub.publish(2).await;

        assert_eq!(early.recv().await, Some(1));
        assert_eq!(early.recv().await, Some(2));
        assert_eq!(late.recv().await, Some(1));
        assert_eq!(late.recv().await, Some(2));
    }

    #[tokio::test]
    async fn replay_zero_skips_values_published_before_subscribe() {
        let hub = Hub::new(0, 8, OverflowPolicy::DropOldest);
        hub.publish("before").await;
        let mut subscription = hub.subscribe();
        assert_eq!(subscription.try_recv(), None);

        hub.publish("after").await;
        assert_eq!(subscription.recv().await, Some("after"));
    }

    #[tokio::test]
    async fn replay_depth_keeps_last_n() {
        let hub = Hub::new(2, 8, OverflowPolicy::DropOldest);
        for value in 1..=4 {
            hub.publish(value).await;
        }
        let subscription = hub.subscribe();
        hub.close();
        let replayed: Vec<i32> = subscription.collect().await;
        assert_eq!(replayed, vec![3, 4]);
    }

    #[tokio::test]
    async fn drop_oldest_counts_discarded_values() {
        let hub = Hub::new(0, 2, OverflowPolicy::DropOldest);
        let mut subscription = hub.subscribe();
        for value in 1..=5 {
            hub.publish(value).await;
        }
        assert_eq!(subscription.dropped(), 3);
        assert_eq!(subscription.recv().await, Some(4));
        assert_eq!(subscription.recv().await, Some(5));
    }

    #[tokio::test]
    async fn suspend_waits_for_room() {
        let hub = Hub::new(0, 1, OverflowPolicy::Suspend);
        let mut subscription = hub.subscribe();
        hub.publish(1).await;

        let publisher = {
            let hub = hub.clone();
            tokio::spawn(async move { hub.publish(2).await })
        };
        tokio::task::yield_now().await;
        assert!(!publisher.is_finished());

        assert_eq!(subscription.recv().await, Some(1));
        let delivered = tokio::time::timeout(Duration::from_secs(1), publisher)
            .await
            .expect("publisher stayed blocked")
            .expect("publisher panicked");
        assert!(delivered);
        assert_eq!(subscription.recv().await, Some(2));
    }

    #[tokio::test]
    async fn dropped_subscriber_never_blocks_others() {
        let hub = Hub::new(0, 1, OverflowPolicy::Suspend);
        let stalled = hub.subscribe();
        let mut active = hub.subscribe();
        hub.publish(1).await;

        let publisher = {
            let hub = hub.clone();
            tokio::spawn(async move { hub.publish(2).await })
        };
        assert_eq!(active.recv().await, Some(1));
        stalled.unsubscribe();

        tokio::time::timeout(Duration::from_secs(1), publisher)
            .await
            .expect("publisher stayed blocked")
            .expect("publisher panicked");
        assert_eq!(active.recv().await, Some(2));
        assert_eq!(hub.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn close_drains_then_ends() {
        let hub = Hub::new(1, 8, OverflowPolicy::DropOldest).with_seed(0);
        let mut subscription = hub.subscribe();
        hub.publish(1).await;
        hub.close();

        assert!(!hub.publish(2).await);
        assert_eq!(subscription.recv().await, Some(0));
        assert_eq!(subscription.recv().await, Some(1));
        assert_eq!(subscription.recv().await, None);

        let mut late = hub.subscribe();
        assert_eq!(late.recv().await, Some(1));
        assert_eq!(late.recv().await, None);
    }

    #[tokio::test]
    async fn publish_distinct_conflates_equal_values() {
        let hub = Hub::new(1, 8, OverflowPolicy::DropOldest).with_seed(0);
        let mut subscription = hub.subscribe();
        assert!(!hub.publish_distinct(0).await);
        assert!(hub.publish_distinct(1).await);
        assert!(!hub.publish_distinct(1).await);
        hub.close();
        let values: Vec<i32> = (&mut subscription).collect().await;
        assert_eq!(values, vec![0, 1]);
    }
}
