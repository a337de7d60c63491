//! Cancellation for the single outstanding location request, similar to
//! Golang's Context.

use std::{future::Future, sync::Arc};
use tokio::sync::watch;

#[derive(Clone, Debug)]
pub struct CancellationContext {
    inner: Arc<watch::Sender<bool>>,
}

impl CancellationContext {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            inner: Arc::new(sender),
        }
    }

    /// Cancel the context. Every clone observes it.
    pub fn cancel(&self) {
        self.inner.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.borrow()
    }

    /// Resolves once the context has been cancelled.
    pub async fn cancelled(&self) {
        let mut receiver = self.inner.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }

    /// Drives `future` unless the context gets cancelled first.
    /// Returns `None` on cancellation; the future is dropped.
    pub async fn run_until_cancelled<F: Future>(&self, future: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            _ = self.cancelled() => None,
            output = future => Some(output),
        }
    }
}

impl Default for CancellationContext {
    fn default() -> Self {
        Self::new()
    }
}
