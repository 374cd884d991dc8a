//! Constructors for the mutation stream returned by `mutate`.

use futures::stream::{self, BoxStream, StreamExt};
use futures::{future, Stream};

/// Mutations derived from one action. An `Err` item ends the derivation;
/// items already produced are still folded.
pub type MutationStream<M> = BoxStream<'static, anyhow::Result<M>>;

pub fn empty<M: Send + 'static>() -> MutationStream<M> {
    stream::empty().boxed()
}

pub fn just<M: Send + 'static>(mutation: M) -> MutationStream<M> {
    stream::once(future::ready(Ok(mutation))).boxed()
}

pub fn iter<M, I>(mutations: I) -> MutationStream<M>
where
    M: Send + 'static,
    I: IntoIterator<Item = M>,
    I::IntoIter: Send + 'static,
{
    stream::iter(mutations.into_iter().map(Ok)).boxed()
}

/// Pre-computed results, e.g. a mutation followed by a failure.
pub fn results<M, I>(results: I) -> MutationStream<M>
where
    M: Send + 'static,
    I: IntoIterator<Item = anyhow::Result<M>>,
    I::IntoIter: Send + 'static,
{
    stream::iter(results).boxed()
}

pub fn from_stream<M, S>(mutations: S) -> MutationStream<M>
where
    M: Send + 'static,
    S: Stream<Item = M> + Send + 'static,
{
    mutations.map(Ok).boxed()
}

pub fn try_from_stream<M, S>(mutations: S) -> MutationStream<M>
where
    M: Send + 'static,
    S: Stream<Item = anyhow::Result<M>> + Send + 'static,
{
    mutations.boxed()
}
