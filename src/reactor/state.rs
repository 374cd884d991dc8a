//! State bound and the authoritative state cell.

use std::sync::Arc;

use parking_lot::RwLock;

/// Bound for reactor state snapshots.
///
/// States should be:
/// - Immutable (Clone to create new states)
/// - Comparable (PartialEq, consecutive equal states are conflated)
/// - Shareable across the driver task and readers
pub trait ReactorState: Clone + PartialEq + Send + Sync + 'static {}

impl<T> ReactorState for T where T: Clone + PartialEq + Send + Sync + 'static {}

/// The single state cell of one reactor, written only by its driver task.
pub(crate) struct StateCell<S> {
    inner: Arc<RwLock<S>>,
}

impl<S> Clone for StateCell<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Clone> StateCell<S> {
    pub(crate) fn new(initial: S) -> Self {
        Self {
            inner: Arc::new(RwLock::new(initial)),
        }
    }

    pub(crate) fn get(&self) -> S {
        self.inner.read().clone()
    }

    pub(crate) fn set(&self, state: S) {
        *self.inner.write() = state;
    }
}
