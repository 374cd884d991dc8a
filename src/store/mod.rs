//! Reactor orchestrator: runs the pipeline and owns the state cell.
//!
//! ```text
//! dispatch ──→ ingress ──→ transform_actions ──→ switch_latest(mutate)
//!     ──→ transform_mutations ──→ route ─┬─→ fold(reduce) ──→ transform_states ──→ states()
//!                                        └─→ transform_effects ──→ effects()
//! ```
//!
//! One driver task per reactor polls the composed stream, writes the state
//! cell and publishes states, so every subscriber observes the same
//! sequence. A second task publishes effects after `transform_effects`.

mod dispatcher;
mod driver;

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::ReactorConfig;
use crate::error::DispatchError;
use crate::hub::{Hub, Subscription};
use crate::lifecycle::{Lifecycle, Phase};
use crate::reactor::{Reactor, StateCell};

pub use dispatcher::Dispatcher;

use driver::{Driver, Next};

/// Handle to a running reactor.
///
/// Clones share the same reactor. Once every handle and [`Dispatcher`] is
/// dropped the ingress closes and the reactor completes.
pub struct ReactorHandle<R: Reactor> {
    id: Uuid,
    reactor: Arc<R>,
    dispatcher: Dispatcher<R::Action>,
    cell: StateCell<R::State>,
    state_hub: Hub<R::State>,
    effect_hub: Hub<R::Effect>,
    lifecycle: Lifecycle,
    closing: CancellationToken,
    cancel: CancellationToken,
}

impl<R: Reactor> Clone for ReactorHandle<R> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            reactor: Arc::clone(&self.reactor),
            dispatcher: self.dispatcher.clone(),
            cell: self.cell.clone(),
            state_hub: self.state_hub.clone(),
            effect_hub: self.effect_hub.clone(),
            lifecycle: self.lifecycle.clone(),
            closing: self.closing.clone(),
            cancel: self.cancel.clone(),
        }
    }
}

impl<R: Reactor> ReactorHandle<R> {
    /// Start `reactor` with the default configuration.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(reactor: R, initial_state: R::State) -> Self {
        Self::spawn_with_config(reactor, initial_state, ReactorConfig::default())
    }

    /// Start `reactor` with explicit buffering configuration.
    ///
    /// The initial state is passed through `transform_states` before this
    /// returns whenever that hook yields it without waiting, so
    /// [`current_state`](Self::current_state) and the first value of
    /// [`states`](Self::states) already reflect it.
    pub fn spawn_with_config(reactor: R, initial_state: R::State, config: ReactorConfig) -> Self {
        if let Err(err) = config.validate() {
            tracing::warn!(error = %err, "Invalid reactor config, clamping capacities to 1");
        }

        let id = Uuid::new_v4();
        let reactor = Arc::new(reactor);
        let lifecycle = Lifecycle::new();
        let closing = CancellationToken::new();
        let cancel = CancellationToken::new();
        let (sender, receiver) = mpsc::channel(config.ingress_capacity.max(1));
        let (effect_sender, effect_receiver) = mpsc::channel(config.subscriber_capacity.max(1));
        let cell = StateCell::new(initial_state.clone());
        let effect_hub = Hub::new(0, config.subscriber_capacity, config.overflow);

        let span = tracing::debug_span!("reactor", reactor_id = %id);
        let (states, first) = span.in_scope(|| {
            let actions = driver::ingress(receiver, closing.clone());
            let mut states = driver::pipeline(
                Arc::clone(&reactor),
                actions,
                initial_state.clone(),
                cell.clone(),
                effect_sender,
            );
            let first = driver::try_next_state(&mut states);
            (states, first)
        });

        let (seed, first) = match first {
            Some(Next::State(state)) => {
                cell.set(state.clone());
                (state, None)
            }
            other => (initial_state, other),
        };
        let state_hub = Hub::new(1, config.subscriber_capacity, config.overflow).with_seed(seed);

        let effect_pump = tokio::spawn(
            driver::pump_effects(Arc::clone(&reactor), effect_receiver, effect_hub.clone())
                .instrument(span.clone()),
        );
        let driver = Driver::<R> {
            states,
            cell: cell.clone(),
            state_hub: state_hub.clone(),
            effect_hub: effect_hub.clone(),
            effect_pump,
            lifecycle: lifecycle.clone(),
            cancel: cancel.clone(),
        };
        tokio::spawn(driver.run(first).instrument(span));
        tracing::debug!(reactor_id = %id, "Reactor started");

        Self {
            id,
            reactor,
            dispatcher: Dispatcher::new(sender, closing.clone(), lifecycle.clone()),
            cell,
            state_hub,
            effect_hub,
            lifecycle,
            closing,
            cancel,
        }
    }

    /// Unique id of this reactor, also recorded on its tracing span.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The reactor whose hooks this handle drives.
    pub fn reactor(&self) -> &R {
        &self.reactor
    }

    /// Feed an action into the pipeline without waiting.
    pub fn dispatch(&self, action: R::Action) -> Result<(), DispatchError> {
        self.dispatcher.dispatch(action)
    }

    /// Feed an action into the pipeline, waiting for ingress space.
    pub async fn send(&self, action: R::Action) -> Result<(), DispatchError> {
        self.dispatcher.send(action).await
    }

    /// A cloneable producer for other tasks.
    pub fn dispatcher(&self) -> Dispatcher<R::Action> {
        self.dispatcher.clone()
    }

    /// Current state first, then every new state.
    pub fn states(&self) -> Subscription<R::State> {
        self.state_hub.subscribe()
    }

    /// Effects published after this call.
    pub fn effects(&self) -> Subscription<R::Effect> {
        self.effect_hub.subscribe()
    }

    /// Latest state written by the pipeline.
    pub fn current_state(&self) -> R::State {
        self.cell.get()
    }

    /// Current lifecycle phase.
    pub fn lifecycle(&self) -> Phase {
        self.lifecycle.phase()
    }

    /// True until the reactor has completed.
    pub fn is_running(&self) -> bool {
        self.lifecycle.is_running()
    }

    /// Stop accepting actions. Queued actions and the live derivation are
    /// processed, then the reactor completes.
    pub fn close(&self) {
        if !self.closing.is_cancelled() {
            tracing::debug!(reactor_id = %self.id, "Closing reactor ingress");
        }
        self.closing.cancel();
    }

    /// Complete immediately, cancelling the live derivation.
    pub fn cancel(&self) {
        self.closing.cancel();
        self.cancel.cancel();
    }

    /// Wait until the reactor has completed.
    pub async fn completed(&self) {
        self.lifecycle.wait().await
    }
}
