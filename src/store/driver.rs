//! Pipeline assembly and the per-reactor driver task.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::stream::BoxStream;
use futures::{FutureExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::hub::Hub;
use crate::lifecycle::Lifecycle;
use crate::ops::{fold, panic_message, route_effects, switch_latest};
use crate::reactor::{MutateContext, Reactor, StateCell};

/// Everything the driver task owns.
pub(crate) struct Driver<R: Reactor> {
    pub(crate) states: BoxStream<'static, R::State>,
    pub(crate) cell: StateCell<R::State>,
    pub(crate) state_hub: Hub<R::State>,
    pub(crate) effect_hub: Hub<R::Effect>,
    pub(crate) effect_pump: JoinHandle<()>,
    pub(crate) lifecycle: Lifecycle,
    pub(crate) cancel: CancellationToken,
}

/// Outcome of pulling the next state out of the pipeline.
pub(crate) enum Next<S> {
    State(S),
    End,
    Panicked(String),
}

/// Actions from the ingress queue. After `closing` fires the queue stops
/// accepting and the stream yields what is buffered, then ends.
pub(crate) fn ingress<A: Send + 'static>(
    mut receiver: mpsc::Receiver<A>,
    closing: CancellationToken,
) -> BoxStream<'static, A> {
    async_stream::stream! {
        loop {
            let received = tokio::select! {
                biased;
                action = receiver.recv() => Some(action),
                _ = closing.cancelled() => None,
            };
            let next = match received {
                Some(action) => action,
                None => {
                    receiver.close();
                    receiver.recv().await
                }
            };
            match next {
                Some(action) => {
                    yield action;
                }
                None => break,
            }
        }
    }
    .boxed()
}

/// Compose actions → mutations → states for one reactor.
pub(crate) fn pipeline<R: Reactor>(
    reactor: Arc<R>,
    actions: BoxStream<'static, R::Action>,
    initial_state: R::State,
    cell: StateCell<R::State>,
    effects: mpsc::Sender<R::Effect>,
) -> BoxStream<'static, R::State> {
    let actions = reactor.transform_actions(actions);

    let derive = {
        let reactor = Arc::clone(&reactor);
        move |action, cancel| reactor.mutate(MutateContext::new(cell.clone(), cancel), action)
    };
    let mutations = reactor.transform_mutations(switch_latest(actions, derive).boxed());

    let routed = {
        let reactor = Arc::clone(&reactor);
        route_effects(mutations, move |mutation| reactor.route(mutation), effects)
    };

    let states = {
        let reactor = Arc::clone(&reactor);
        fold(initial_state, routed, move |state: &R::State, mutation| {
            reactor.reduce(state, mutation)
        })
    };

    reactor.transform_states(states.boxed())
}

/// Publish routed effects through `transform_effects`, once per reactor.
/// Ends when the pipeline drops its effect sender or the hub closes.
pub(crate) async fn pump_effects<R: Reactor>(
    reactor: Arc<R>,
    mut receiver: mpsc::Receiver<R::Effect>,
    effect_hub: Hub<R::Effect>,
) {
    let routed = async_stream::stream! {
        while let Some(effect) = receiver.recv().await {
            yield effect;
        }
    };
    let mut effects = reactor.transform_effects(routed.boxed());
    loop {
        match next_state(&mut effects).await {
            Next::State(effect) => {
                if !effect_hub.publish(effect).await {
                    break;
                }
            }
            Next::End => break,
            Next::Panicked(message) => {
                tracing::error!(panic = %message, "Effect transform panicked, discarding further effects");
                break;
            }
        }
    }
}

/// Pull one item, containing panics raised by hook streams.
pub(crate) async fn next_state<S>(states: &mut BoxStream<'static, S>) -> Next<S> {
    match AssertUnwindSafe(states.next()).catch_unwind().await {
        Ok(Some(state)) => Next::State(state),
        Ok(None) => Next::End,
        Err(payload) => Next::Panicked(panic_message(payload.as_ref())),
    }
}

/// Same as [`next_state`] without waiting: `None` if nothing is ready.
pub(crate) fn try_next_state<S>(states: &mut BoxStream<'static, S>) -> Option<Next<S>> {
    next_state(states).now_or_never()
}

impl<R: Reactor> Driver<R> {
    /// Run until the pipeline ends, a hook panics, or the reactor is
    /// cancelled. The state cell is frozen afterwards.
    pub(crate) async fn run(mut self, first: Option<Next<R::State>>) {
        let mut pending = first;
        loop {
            let next = match pending.take() {
                Some(next) => next,
                None => {
                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => {
                            tracing::debug!("Reactor cancelled");
                            break;
                        }
                        next = next_state(&mut self.states) => next,
                    }
                }
            };

            match next {
                Next::State(state) => {
                    self.cell.set(state.clone());
                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => {
                            tracing::debug!("Reactor cancelled while publishing state");
                            break;
                        }
                        _ = self.state_hub.publish_distinct(state) => {}
                    }
                    // A derivation that never suspends must not starve the runtime.
                    tokio::task::consume_budget().await;
                }
                Next::End => {
                    tracing::debug!("State stream completed");
                    break;
                }
                Next::Panicked(message) => {
                    tracing::error!(panic = %message, "Pipeline hook panicked, completing reactor");
                    break;
                }
            }
        }
        self.finish().await;
    }

    async fn finish(self) {
        let Driver {
            states,
            state_hub,
            effect_hub,
            mut effect_pump,
            lifecycle,
            cancel,
            ..
        } = self;

        // Dropping the pipeline cancels the live derivation and drops the
        // effect sender, so the pump drains what was routed and ends.
        drop(states);
        state_hub.close();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => effect_pump.abort(),
            joined = &mut effect_pump => {
                if let Err(err) = joined {
                    tracing::error!(error = %err, "Effect pump failed");
                }
            }
        }
        effect_hub.close();
        cancel.cancel();
        if lifecycle.complete() {
            tracing::debug!("Reactor completed");
        }
    }
}
