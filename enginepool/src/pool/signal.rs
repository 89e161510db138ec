//! One-shot broadcast signal.
//!
//! Closing is idempotent: the first `close` flips the signal and wakes every
//! waiter, later calls are no-ops.

use std::sync::Arc;

use tokio::sync::watch;

/// A cloneable, close-once broadcast.
#[derive(Debug, Clone)]
pub struct Signal {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for Signal {
    fn default() -> Self {
        Self::new()
    }
}

impl Signal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Closes the signal. Returns `true` only for the call that closed it.
    pub fn close(&self) -> bool {
        self.tx.send_if_modified(|closed| !std::mem::replace(closed, true))
    }

    pub fn is_closed(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once the signal is closed.
    pub async fn closed(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|closed| *closed).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_close_twice_is_harmless() {
        let signal = Signal::new();
        assert!(!signal.is_closed());
        assert!(signal.close());
        assert!(!signal.close());
        assert!(signal.is_closed());
    }

    #[tokio::test]
    async fn test_clones_observe_close() {
        let signal = Signal::new();
        let observer = signal.clone();

        let waiter = tokio::spawn(async move { observer.closed().await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        signal.close();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter was not woken")
            .unwrap();
    }

    #[tokio::test]
    async fn test_closed_after_close_returns_immediately() {
        let signal = Signal::new();
        signal.close();
        tokio::time::timeout(Duration::from_millis(50), signal.closed())
            .await
            .expect("closed() should not block");
    }
}
