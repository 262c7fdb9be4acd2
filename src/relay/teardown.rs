//! Close-once coordination between the two halves of a session.

use std::sync::Arc;
use tokio::sync::watch;

/// Shared teardown flag for one session.
///
/// The first `close` wins; every later call is a no-op. Waiters in
/// [`Teardown::closed`] are released as soon as the flag is set, including
/// waiters that subscribe afterwards.
#[derive(Debug, Clone)]
pub struct Teardown {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Teardown {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Request teardown. Returns `true` only for the call that initiated it.
    pub fn close(&self) -> bool {
        self.tx.send_if_modified(|closed| {
            if *closed {
                false
            } else {
                *closed = true;
                true
            }
        })
    }

    pub fn is_closed(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once teardown has been requested.
    pub async fn closed(&self) {
        let mut rx = self.rx.clone();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|closed| *closed).await;
    }
}

impl Default for Teardown {
    fn default() -> Self {
        Self::new()
    }
}

/// Requests teardown when dropped.
///
/// Held by the inline half of a session so that abandoning the session
/// future still releases the spawned half.
#[derive(Debug)]
pub struct TeardownGuard(Teardown);

impl TeardownGuard {
    pub fn new(teardown: Teardown) -> Self {
        Self(teardown)
    }
}

impl Drop for TeardownGuard {
    fn drop(&mut self) {
        self.0.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn close_is_idempotent() {
        let teardown = Teardown::new();
        assert!(!teardown.is_closed());
        assert!(teardown.close());
        assert!(!teardown.close());
        assert!(!teardown.clone().close());
        assert!(teardown.is_closed());
    }

    #[tokio::test]
    async fn waiters_are_released() {
        let teardown = Teardown::new();
        let waiter = {
            let teardown = teardown.clone();
            tokio::spawn(async move { teardown.closed().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        teardown.close();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter released")
            .unwrap();

        // Late subscribers return immediately.
        tokio::time::timeout(Duration::from_millis(50), teardown.closed())
            .await
            .expect("already closed");
    }

    #[test]
    fn guard_closes_on_drop() {
        let teardown = Teardown::new();
        let guard = TeardownGuard::new(teardown.clone());
        assert!(!teardown.is_closed());
        drop(guard);
        assert!(teardown.is_closed());
    }
}
