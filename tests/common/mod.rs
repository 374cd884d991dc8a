//! Shared test reactors and subscription helpers.

#![allow(dead_code, unused_imports)]

use flowreactor::{mutations, MutateContext, MutationStream, Reactor, Subscription};
use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

// -- Subscription helpers -----------------------------------------------------

/// Next value from a subscription; panics on timeout or end of stream.
pub async fn next<T>(subscription: &mut Subscription<T>) -> T {
    tokio::time::timeout(RECV_TIMEOUT, subscription.recv())
        .await
        .expect("timed out waiting for a value")
        .expect("subscription ended unexpectedly")
}

/// Collect exactly `count` values.
pub async fn take<T>(subscription: &mut Subscription<T>, count: usize) -> Vec<T> {
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        values.push(next(subscription).await);
    }
    values
}

/// Drain a subscription until the hub completes.
pub async fn collect_until_end<T>(subscription: &mut Subscription<T>) -> Vec<T> {
    let mut values = Vec::new();
    loop {
        match tokio::time::timeout(RECV_TIMEOUT, subscription.recv()).await {
            Ok(Some(value)) => values.push(value),
            Ok(None) => return values,
            Err(_) => panic!("timed out waiting for the subscription to end"),
        }
    }
}

// -- Counter reactor ----------------------------------------------------------

/// `reduce(s, _) = s + 1`, one mutation per action.
///
/// When the state equals `error_at` at derivation time, the derivation emits
/// its mutation and then fails.
#[derive(Default)]
pub struct CounterReactor {
    pub error_at: Option<i32>,
    pub derivations: AtomicUsize,
}

impl CounterReactor {
    pub fn failing_at(state: i32) -> Self {
        Self {
            error_at: Some(state),
            ..Self::default()
        }
    }
}

impl Reactor for CounterReactor {
    type Action = ();
    type Mutation = ();
    type State = i32;
    type Effect = Infallible;

    fn mutate(&self, ctx: MutateContext<i32>, action: ()) -> anyhow::Result<MutationStream<()>> {
        self.derivations.fetch_add(1, Ordering::SeqCst);
        if Some(ctx.current_state()) == self.error_at {
            return Ok(mutations::results(vec![
                Ok(action),
                Err(anyhow::anyhow!("derivation failed after one mutation")),
            ]));
        }
        Ok(mutations::just(action))
    }

    fn reduce(&self, state: &i32, _mutation: ()) -> anyhow::Result<i32> {
        Ok(state + 1)
    }
}

// -- Hook trace reactor -------------------------------------------------------

/// Every hook appends a marker, so the final state records the hook order.
pub struct TraceReactor;

impl Reactor for TraceReactor {
    type Action = Vec<String>;
    type Mutation = Vec<String>;
    type State = Vec<String>;
    type Effect = Infallible;

    fn transform_actions(
        &self,
        actions: futures::stream::BoxStream<'static, Vec<String>>,
    ) -> futures::stream::BoxStream<'static, Vec<String>> {
        use futures::StreamExt;
        actions.map(|action| with(action, "transformedAction")).boxed()
    }

    fn mutate(
        &self,
        _ctx: MutateContext<Vec<String>>,
        action: Vec<String>,
    ) -> anyhow::Result<MutationStream<Vec<String>>> {
        Ok(mutations::just(with(action, "mutation")))
    }

    fn transform_mutations(
        &self,
        mutations: futures::stream::BoxStream<'static, Vec<String>>,
    ) -> futures::stream::BoxStream<'static, Vec<String>> {
        use futures::StreamExt;
        mutations.map(|mutation| with(mutation, "transformedMutation")).boxed()
    }

    fn reduce(&self, state: &Vec<String>, mutation: Vec<String>) -> anyhow::Result<Vec<String>> {
        let mut next = state.clone();
        next.extend(mutation);
        Ok(next)
    }

    fn transform_states(
        &self,
        states: futures::stream::BoxStream<'static, Vec<String>>,
    ) -> futures::stream::BoxStream<'static, Vec<String>> {
        use futures::StreamExt;
        states.map(|state| with(state, "transformedState")).boxed()
    }
}

fn with(mut values: Vec<String>, marker: &str) -> Vec<String> {
    values.push(marker.to_string());
    values
}

pub fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

// -- Sum reactor --------------------------------------------------------------

/// Adds each action to the state; negative numbers fail in `reduce`,
/// zero panics in `reduce`.
pub struct SumReactor;

impl Reactor for SumReactor {
    type Action = i64;
    type Mutation = i64;
    type State = i64;
    type Effect = Infallible;

    fn mutate(&self, _ctx: MutateContext<i64>, action: i64) -> anyhow::Result<MutationStream<i64>> {
        Ok(mutations::just(action))
    }

    fn reduce(&self, state: &i64, mutation: i64) -> anyhow::Result<i64> {
        if mutation < 0 {
            anyhow::bail!("negative mutation {mutation}");
        }
        if mutation == 0 {
            panic!("zero mutation");
        }
        Ok(state + mutation)
    }
}

// -- Cancellation probe -------------------------------------------------------

/// Records whether a derivation's cancellation token fired.
#[derive(Clone, Default)]
pub struct CancelProbe {
    fired: Arc<AtomicBool>,
}

impl CancelProbe {
    /// Watch `ctx`'s token from a separate task.
    pub fn watch<S: Clone + Send + Sync + 'static>(&self, ctx: &MutateContext<S>) {
        let fired = Arc::clone(&self.fired);
        let token = ctx.cancellation();
        tokio::spawn(async move {
            token.cancelled().await;
            fired.store(true, Ordering::SeqCst);
        });
    }

    pub fn fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }
}
