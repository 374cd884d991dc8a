//! Errors surfaced to action producers.

use thiserror::Error;

/// Why an action could not be enqueued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The reactor was closed or cancelled, or has completed.
    #[error("reactor no longer accepts actions")]
    Closed,
    /// The ingress buffer is full. `send` waits for space instead.
    #[error("reactor ingress buffer is full")]
    Full,
}
