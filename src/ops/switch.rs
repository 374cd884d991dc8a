//! Switch-latest: each upstream request starts a new derivation and
//! supersedes the one still running.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::BoxStream;
use futures::Stream;
use tokio_util::sync::CancellationToken;

use super::panic_message;

/// Lazily produced results of one derivation. An `Err` item ends it.
pub type Derivation<T> = BoxStream<'static, anyhow::Result<T>>;

/// Consecutive ready results forwarded before upstream is checked again.
pub(crate) const READY_BUDGET: usize = 32;

/// Stream returned by [`switch_latest`].
pub struct SwitchLatest<S, F, T> {
    upstream: Option<S>,
    derive: F,
    live: Option<Live<T>>,
    generation: u64,
    /// Results forwarded since upstream was last polled.
    streak: usize,
}

/// The single derivation whose results are forwarded downstream.
struct Live<T> {
    generation: u64,
    token: CancellationToken,
    results: Derivation<T>,
}

impl<T> Drop for Live<T> {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

enum LivePoll<T> {
    Item(T),
    Finished,
    Pending,
}

/// Map every upstream request to a derivation, keeping only the latest live.
///
/// `derive` receives the request and a fresh [`CancellationToken`] that is
/// cancelled as soon as the derivation is superseded, finishes, or the
/// combinator is dropped. Results already forwarded are never retracted.
///
/// A derivation whose next result is ready is drained before the next
/// request is taken, so synchronous derivations never overtake each other.
/// The drain is bounded: after a run of ready results upstream is polled,
/// and a waiting request supersedes even a derivation that never suspends.
/// Errors and panics, whether raised by `derive` itself or by the stream it
/// returns, end that derivation and are logged; the combinator keeps going.
pub fn switch_latest<S, F, T>(upstream: S, derive: F) -> SwitchLatest<S, F, T>
where
    S: Stream + Unpin,
    F: FnMut(S::Item, CancellationToken) -> anyhow::Result<Derivation<T>>,
{
    SwitchLatest {
        upstream: Some(upstream),
        derive,
        live: None,
        generation: 0,
        streak: 0,
    }
}

impl<S, F, T> SwitchLatest<S, F, T>
where
    S: Stream + Unpin,
    F: FnMut(S::Item, CancellationToken) -> anyhow::Result<Derivation<T>>,
{
    fn start(&mut self, request: S::Item) {
        if let Some(previous) = self.live.take() {
            tracing::debug!(generation = previous.generation, "Superseding live derivation");
        }

        self.generation += 1;
        self.streak = 0;
        let generation = self.generation;
        let token = CancellationToken::new();
        let derive = &mut self.derive;
        let cancel = token.clone();

        match catch_unwind(AssertUnwindSafe(|| derive(request, cancel))) {
            Ok(Ok(results)) => {
                self.live = Some(Live {
                    generation,
                    token,
                    results,
                });
            }
            Ok(Err(err)) => {
                tracing::warn!(generation, error = %err, "Derivation failed, no mutations produced");
            }
            Err(payload) => {
                tracing::warn!(
                    generation,
                    panic = %panic_message(payload.as_ref()),
                    "Derivation panicked, no mutations produced"
                );
            }
        }
    }
}

fn poll_live<T>(live: &mut Live<T>, cx: &mut Context<'_>) -> LivePoll<T> {
    let generation = live.generation;
    match catch_unwind(AssertUnwindSafe(|| live.results.as_mut().poll_next(cx))) {
        Ok(Poll::Ready(Some(Ok(item)))) => LivePoll::Item(item),
        Ok(Poll::Ready(Some(Err(err)))) => {
            tracing::warn!(generation, error = %err, "Derivation raised an error, ending it");
            LivePoll::Finished
        }
        Ok(Poll::Ready(None)) => LivePoll::Finished,
        Ok(Poll::Pending) => LivePoll::Pending,
        Err(payload) => {
            tracing::warn!(
                generation,
                panic = %panic_message(payload.as_ref()),
                "Derivation panicked, ending it"
            );
            LivePoll::Finished
        }
    }
}

// `derive` is never pinned and `upstream` is required to be `Unpin`.
impl<S: Unpin, F, T> Unpin for SwitchLatest<S, F, T> {}

impl<S, F, T> Stream for SwitchLatest<S, F, T>
where
    S: Stream + Unpin,
    F: FnMut(S::Item, CancellationToken) -> anyhow::Result<Derivation<T>>,
{
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        let this = &mut *self;
        loop {
            if this.streak >= READY_BUDGET {
                this.streak = 0;
                if let Some(upstream) = this.upstream.as_mut() {
                    match Pin::new(upstream).poll_next(cx) {
                        Poll::Ready(Some(request)) => this.start(request),
                        Poll::Ready(None) => this.upstream = None,
                        Poll::Pending => {}
                    }
                }
            }

            if let Some(live) = this.live.as_mut() {
                match poll_live(live, cx) {
                    LivePoll::Item(item) => {
                        this.streak += 1;
                        return Poll::Ready(Some(item));
                    }
                    LivePoll::Finished => this.live = None,
                    LivePoll::Pending => {}
                }
            }

            let Some(upstream) = this.upstream.as_mut() else {
                return if this.live.is_none() {
                    Poll::Ready(None)
                } else {
                    Poll::Pending
                };
            };

            this.streak = 0;
            match Pin::new(upstream).poll_next(cx) {
                Poll::Ready(Some(request)) => this.start(request),
                Poll::Ready(None) => {
                    this.upstream = None;
                    if this.live.is_none() {
                        return Poll::Ready(None);
                    }
                    return Poll::Pending;
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream::{self, StreamExt};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn ready(values: Vec<anyhow::Result<u32>>) -> anyhow::Result<Derivation<u32>> {
        Ok(stream::iter(values).boxed())
    }

    #[tokio::test]
    async fn ready_derivations_are_concatenated() {
        let requests = stream::iter(vec![1u32, 2, 3]);
        let results: Vec<u32> = switch_latest(requests, |n, _| ready(vec![Ok(n * 10), Ok(n * 10 + 1)]))
            .collect()
            .await;
        assert_eq!(results, vec![10, 11, 20, 21, 30, 31]);
    }

    #[tokio::test]
    async fn errors_end_only_their_derivation() {
        let requests = stream::iter(vec![1u32, 2, 3]);
        let results: Vec<u32> = switch_latest(requests, |n, _| match n {
            1 => ready(vec![Ok(1), Err(anyhow::anyhow!("boom")), Ok(99)]),
            2 => Err(anyhow::anyhow!("sync failure")),
            _ => ready(vec![Ok(n)]),
        })
        .collect()
        .await;
        assert_eq!(results, vec![1, 3]);
    }

    #[tokio::test]
    async fn panics_are_contained() {
        let requests = stream::iter(vec![1u32, 2]);
        let results: Vec<u32> = switch_latest(requests, |n, _| {
            if n == 1 {
                panic!("derive exploded");
            }
            ready(vec![Ok(n)])
        })
        .collect()
        .await;
        assert_eq!(results, vec![2]);
    }

    #[tokio::test(start_paused = true)]
    async fn new_request_cancels_suspended_derivation() {
        let cancelled = Arc::new(AtomicBool::new(false));
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<&'static str>();
        let requests = tokio_stream_from(rx);

        let switched = {
            let cancelled = cancelled.clone();
            switch_latest(requests, move |request, token: CancellationToken| match request {
                "slow" => {
                    let cancelled = cancelled.clone();
                    tokio::spawn(async move {
                        token.cancelled().await;
                        cancelled.store(true, Ordering::SeqCst);
                    });
                    Ok(async_stream::stream! {
                        tokio::time::sleep(Duration::from_secs(10)).await;
                        yield Ok::<_, anyhow::Error>("slow result");
                    }
                    .boxed())
                }
                other => Ok(stream::iter(vec![Ok(other)]).boxed()),
            })
        };

        tx.send("slow").unwrap();
        tx.send("fast").unwrap();
        drop(tx);

        let results: Vec<&str> = switched.collect().await;
        assert_eq!(results, vec!["fast"]);
        tokio::task::yield_now().await;
        assert!(cancelled.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn endless_ready_derivation_is_superseded() {
        let requests = stream::iter(vec![0u32, 7]);
        let results: Vec<u32> = switch_latest(requests, |n, _| match n {
            0 => Ok(stream::repeat_with(|| Ok(0)).boxed()),
            _ => ready(vec![Ok(n)]),
        })
        .collect()
        .await;
        assert_eq!(results.len(), READY_BUDGET + 1);
        assert_eq!(results.last(), Some(&7));
    }

    #[tokio::test(start_paused = true)]
    async fn upstream_end_lets_live_derivation_finish() {
        let requests = stream::iter(vec![1u32]);
        let results: Vec<u32> = switch_latest(requests, |n, _| {
            Ok(async_stream::stream! {
                tokio::time::sleep(Duration::from_secs(1)).await;
                yield Ok::<_, anyhow::Error>(n);
            }
            .boxed())
        })
        .collect()
        .await;
        assert_eq!(results, vec![1]);
    }

    fn tokio_stream_from<T: Send + 'static>(
        mut rx: tokio::sync::mpsc::UnboundedReceiver<T>,
    ) -> BoxStream<'static, T> {
        async_stream::stream! {
            while let Some(item) = rx.recv().await {
                yield item;
            }
        }
        .boxed()
    }
}
