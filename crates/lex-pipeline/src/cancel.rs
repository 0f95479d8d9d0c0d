//! Cooperative cancellation shared by every stage

use std::sync::Arc;
use tokio::sync::watch;

/// Cancellation signal passed through every stage call
///
/// Clones observe the same signal. Cancelling is idempotent.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// Fresh, uncancelled token
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx: Arc::new(tx), rx }
    }

    /// Signal cancellation to every clone
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Whether cancellation was signalled
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once cancellation is signalled
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        // The sender lives as long as any clone of the token, including self.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    /// Guard that cancels the token when dropped
    #[must_use]
    pub fn drop_guard(&self) -> CancelOnDrop {
        CancelOnDrop {
            token: Some(self.clone()),
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Cancels its token on drop unless disarmed
///
/// Held by request handlers so a dropped request future stops in-flight work.
#[derive(Debug)]
pub struct CancelOnDrop {
    token: Option<CancelToken>,
}

impl CancelOnDrop {
    /// Drop without cancelling
    pub fn disarm(mut self) {
        self.token = None;
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn clones_share_signal() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
        tokio::time::timeout(Duration::from_millis(100), clone.cancelled())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn cancelled_waits_until_signal() {
        let token = CancelToken::new();
        let waiter = token.clone();
        let handle = tokio::spawn(async move { waiter.cancelled().await });
        tokio::task::yield_now().await;
        assert!(!handle.is_finished());
        token.cancel();
        tokio::time::timeout(Duration::from_millis(100), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[test]
    fn drop_guard_cancels_unless_disarmed() {
        let token = CancelToken::new();
        drop(token.drop_guard());
        assert!(token.is_cancelled());

        let token = CancelToken::new();
        token.drop_guard().disarm();
        assert!(!token.is_cancelled());
    }
}
