use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

use crate::error::DispatchError;
use crate::lifecycle::Lifecycle;

/// Cloneable producer handle feeding actions into one reactor.
pub struct Dispatcher<A> {
    sender: mpsc::Sender<A>,
    closing: CancellationToken,
    lifecycle: Lifecycle,
}

impl<A> Clone for Dispatcher<A> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            closing: self.closing.clone(),
            lifecycle: self.lifecycle.clone(),
        }
    }
}

impl<A> Dispatcher<A> {
    pub(crate) fn new(
        sender: mpsc::Sender<A>,
        closing: CancellationToken,
        lifecycle: Lifecycle,
    ) -> Self {
        Self {
            sender,
            closing,
            lifecycle,
        }
    }

    /// Enqueue without waiting.
    pub fn dispatch(&self, action: A) -> Result<(), DispatchError> {
        if !self.accepts() {
            return Err(DispatchError::Closed);
        }
        self.sender.try_send(action).map_err(|err| match err {
            TrySendError::Full(_) => DispatchError::Full,
            TrySendError::Closed(_) => DispatchError::Closed,
        })
    }

    /// Enqueue, waiting for buffer space.
    pub async fn send(&self, action: A) -> Result<(), DispatchError> {
        if !self.accepts() {
            return Err(DispatchError::Closed);
        }
        self.sender
            .send(action)
            .await
            .map_err(|_| DispatchError::Closed)
    }

    /// Whether new actions are still accepted.
    pub fn accepts(&self) -> bool {
        !self.closing.is_cancelled() && self.lifecycle.is_running() && !self.sender.is_closed()
    }
}
