use std::future::Future;

use tokio_util::sync::CancellationToken;

use super::state::StateCell;

/// Handed to [`Reactor::mutate`](super::Reactor::mutate) for one action.
///
/// Owns a clone of the state cell and the derivation's cancellation token,
/// so it can be moved into the returned stream.
pub struct MutateContext<S> {
    state: StateCell<S>,
    cancel: CancellationToken,
}

impl<S> Clone for MutateContext<S> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            cancel: self.cancel.clone(),
        }
    }
}

impl<S: Clone> MutateContext<S> {
    pub(crate) fn new(state: StateCell<S>, cancel: CancellationToken) -> Self {
        Self { state, cancel }
    }

    /// Latest state written by the pipeline.
    pub fn current_state(&self) -> S {
        self.state.get()
    }

    /// Token cancelled when a newer action supersedes this derivation.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    /// Run `future` unless this derivation is cancelled first.
    pub async fn run_until_cancelled<F: Future>(&self, future: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            output = future => Some(output),
        }
    }
}
