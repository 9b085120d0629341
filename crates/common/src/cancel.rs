//! Cooperative cancellation shared between the orchestrator and its workers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

use crate::error::{BlueError, BlueResult};

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Clonable stop flag. Workers poll it between steps and wait on it during
/// sleeps, so a stop is observed within one socket or process deadline.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop. Idempotent.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once a stop was requested.
    #[inline]
    pub fn check(&self) -> BlueResult<()> {
        if self.is_cancelled() {
            Err(BlueError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Resolves when the token is cancelled.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    /// Sleep for `duration` unless cancelled first.
    pub async fn sleep(&self, duration: Duration) -> BlueResult<()> {
        self.check()?;
        tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            _ = self.cancelled() => Err(BlueError::Cancelled),
        }
    }

    /// Run `fut` unless cancelled first.
    pub async fn run<F, T>(&self, fut: F) -> BlueResult<T>
    where
        F: std::future::Future<Output = BlueResult<T>>,
    {
        self.check()?;
        tokio::select! {
            res = fut => res,
            _ = self.cancelled() => Err(BlueError::Cancelled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn sleep_completes_without_cancel() {
        let token = CancelToken::new();
        assert!(token.sleep(Duration::from_secs(3)).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_interrupts_sleep() {
        let token = CancelToken::new();
        let other = token.clone();
        let handle = tokio::spawn(async move { other.sleep(Duration::from_secs(3600)).await });
        tokio::task::yield_now().await;
        token.cancel();
        let res = handle.await.unwrap();
        assert!(matches!(res, Err(BlueError::Cancelled)));
    }

    #[tokio::test]
    async fn check_after_cancel() {
        let token = CancelToken::new();
        assert!(token.check().is_ok());
        token.cancel();
        token.cancel();
        assert!(token.check().unwrap_err().is_cancellation());
        assert!(token.run(async { Ok(1) }).await.is_err());
    }
}
