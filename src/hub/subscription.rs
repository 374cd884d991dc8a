use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use futures::Stream;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::config::OverflowPolicy;

/// Outcome of pushing one value into a subscriber slot.
pub(crate) enum Push<T> {
    Delivered,
    /// The subscriber is gone or the hub closed; the value is discarded.
    Gone,
    /// `Suspend` policy and the buffer is full; the value is handed back.
    Full(T),
}

/// Per-subscriber buffer shared between the hub and one `Subscription`.
pub(crate) struct Slot<T> {
    queue: Mutex<SlotQueue<T>>,
    space: Notify,
}

struct SlotQueue<T> {
    values: VecDeque<T>,
    waker: Option<Waker>,
    /// Hub completed; drain `values` then end.
    closed: bool,
    /// Subscription dropped.
    detached: bool,
    dropped: u64,
}

impl<T> Slot<T> {
    pub(crate) fn new(replay: VecDeque<T>, closed: bool) -> Self {
        Self {
            queue: Mutex::new(SlotQueue {
                values: replay,
                waker: None,
                closed,
                detached: false,
                dropped: 0,
            }),
            space: Notify::new(),
        }
    }

    pub(crate) fn push(&self, value: T, capacity: usize, overflow: OverflowPolicy) -> Push<T> {
        let waker = {
            let mut queue = self.queue.lock();
            if queue.detached || queue.closed {
                return Push::Gone;
            }
            if queue.values.len() >= capacity {
                match overflow {
                    OverflowPolicy::DropOldest => {
                        queue.values.pop_front();
                        queue.dropped += 1;
                        tracing::trace!(dropped = queue.dropped, "Subscriber buffer full, dropped oldest value");
                    }
                    OverflowPolicy::Suspend => return Push::Full(value),
                }
            }
            queue.values.push_back(value);
            queue.waker.take()
        };
        if let Some(waker) = waker {
            waker.wake();
        }
        Push::Delivered
    }

    /// Wait until a push could succeed or would be discarded.
    pub(crate) async fn wait_for_space(&self, capacity: usize) {
        loop {
            let notified = self.space.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let queue = self.queue.lock();
                if queue.detached || queue.closed || queue.values.len() < capacity {
                    return;
                }
            }
            notified.await;
        }
    }

    pub(crate) fn is_detached(&self) -> bool {
        self.queue.lock().detached
    }

    pub(crate) fn close(&self) {
        let waker = {
            let mut queue = self.queue.lock();
            queue.closed = true;
            queue.waker.take()
        };
        if let Some(waker) = waker {
            waker.wake();
        }
        self.space.notify_waiters();
    }

    fn detach(&self) {
        {
            let mut queue = self.queue.lock();
            queue.detached = true;
            queue.values.clear();
            queue.waker = None;
        }
        self.space.notify_waiters();
    }

    fn poll_pop(&self, cx: &mut Context<'_>) -> Poll<Option<T>> {
        let mut queue = self.queue.lock();
        if let Some(value) = queue.values.pop_front() {
            drop(queue);
            self.space.notify_waiters();
            return Poll::Ready(Some(value));
        }
        if queue.closed {
            return Poll::Ready(None);
        }
        queue.waker = Some(cx.waker().clone());
        Poll::Pending
    }

    fn try_pop(&self) -> Option<T> {
        let value = self.queue.lock().values.pop_front();
        if value.is_some() {
            self.space.notify_waiters();
        }
        value
    }
}

/// Receiving side of a [`Hub`](super::Hub).
///
/// Yields replayed values first, then live values in publish order, and
/// ends once the hub is closed and the buffer is drained. Dropping the
/// subscription detaches it.
pub struct Subscription<T> {
    slot: Arc<Slot<T>>,
}

impl<T> Subscription<T> {
    pub(crate) fn new(slot: Arc<Slot<T>>) -> Self {
        Self { slot }
    }

    /// Next value, or `None` once the hub has completed.
    pub async fn recv(&mut self) -> Option<T> {
        futures::future::poll_fn(|cx| self.slot.poll_pop(cx)).await
    }

    /// Next buffered value without waiting.
    pub fn try_recv(&mut self) -> Option<T> {
        self.slot.try_pop()
    }

    /// Values discarded from this subscriber's buffer under `DropOldest`.
    pub fn dropped(&self) -> u64 {
        self.slot.queue.lock().dropped
    }

    /// Detach from the hub. Equivalent to dropping the subscription.
    pub fn unsubscribe(self) {}
}

impl<T> Stream for Subscription<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.slot.poll_pop(cx)
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.slot.detach();
    }
}
