use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// Lifecycle phase of a reactor. `Completed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Phase {
    Running = 0,
    Completed = 1,
}

/// Shared phase cell with an awaitable completion signal.
#[derive(Clone)]
pub struct Lifecycle {
    phase: Arc<AtomicU8>,
    notify: Arc<Notify>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            phase: Arc::new(AtomicU8::new(Phase::Running as u8)),
            notify: Arc::new(Notify::new()),
        }
    }

    pub fn phase(&self) -> Phase {
        match self.phase.load(Ordering::SeqCst) {
            0 => Phase::Running,
            _ => Phase::Completed,
        }
    }

    pub fn is_running(&self) -> bool {
        self.phase() == Phase::Running
    }

    /// Move to `Completed`. Returns false if already completed.
    pub fn complete(&self) -> bool {
        let previous = self.phase.swap(Phase::Completed as u8, Ordering::SeqCst);
        if previous == Phase::Completed as u8 {
            return false;
        }
        self.notify.notify_waiters();
        true
    }

    /// Wait until the phase is `Completed`.
    pub async fn wait(&self) {
        // Register with Notify before checking the phase so a concurrent
        // complete() between the check and the await is not lost.
        let notified = self.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if !self.is_running() {
            return;
        }
        notified.await;
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
