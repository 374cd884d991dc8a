use async_stream::stream;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;

/// Where a mutation goes after the post-derivation transform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routed<M, E> {
    /// Forward to the fold.
    Fold(M),
    /// Hand to the effect channel. Nothing is folded.
    Effect(E),
}

/// Split mutations into a fold-bound stream and an effect channel.
///
/// `route` takes each mutation by value, so a mutation is either folded or
/// sent as an effect, never both. Sending waits while the channel is full.
pub fn route_effects<S, M, E, R>(
    mutations: S,
    mut route: R,
    effects: mpsc::Sender<E>,
) -> impl Stream<Item = M>
where
    S: Stream<Item = M>,
    R: FnMut(M) -> Routed<M, E>,
{
    stream! {
        futures::pin_mut!(mutations);
        while let Some(mutation) = mutations.next().await {
            match route(mutation) {
                Routed::Fold(mutation) => {
                    yield mutation;
                }
                Routed::Effect(effect) => {
                    if effects.send(effect).await.is_err() {
                        tracing::debug!("Effect consumer gone, discarding effect");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[tokio::test]
    async fn effects_bypass_the_fold_stream() {
        let (sender, mut effects) = mpsc::channel(8);

        let folded: Vec<i32> = route_effects(
            stream::iter(vec![1, -2, 3, -4]),
            |m| if m < 0 { Routed::Effect(format!("effect {m}")) } else { Routed::Fold(m) },
            sender,
        )
        .collect()
        .await;

        assert_eq!(folded, vec![1, 3]);
        assert_eq!(effects.recv().await.as_deref(), Some("effect -2"));
        assert_eq!(effects.recv().await.as_deref(), Some("effect -4"));
        assert_eq!(effects.recv().await, None);
    }
}
