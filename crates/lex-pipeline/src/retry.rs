//! Bounded retry with exponential backoff for collaborator calls

use crate::cancel::CancelToken;
use crate::config::PipelineConfig;
use crate::error::{CollaboratorError, FetchError};
use std::fmt::Display;
use std::future::Future;

/// Errors that may go away on retry
pub(crate) trait Transient: Display {
    fn is_transient(&self) -> bool;
}

impl Transient for CollaboratorError {
    fn is_transient(&self) -> bool {
        self.is_retryable()
    }
}

impl Transient for FetchError {
    fn is_transient(&self) -> bool {
        self.is_retryable()
    }
}

/// Why a retried call gave up
#[derive(Debug)]
pub(crate) enum GaveUp<E> {
    /// Last error after the budget was spent, or a permanent error
    Failed(E),
    /// Cancellation was signalled
    Cancelled,
}

/// Run `op` until it succeeds, fails permanently, or `retries` extra attempts
/// are spent. Cancellation interrupts both the call and the backoff sleep.
pub(crate) async fn with_retries<T, E, F, Fut>(
    config: &PipelineConfig,
    retries: u32,
    cancel: &CancelToken,
    what: &str,
    mut op: F,
) -> Result<T, GaveUp<E>>
where
    E: Transient,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0u32;
    loop {
        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(GaveUp::Cancelled),
            r = op() => r,
        };
        let err = match outcome {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if !err.is_transient() || attempt >= retries {
            return Err(GaveUp::Failed(err));
        }
        attempt += 1;
        let delay = config.backoff(attempt);
        tracing::debug!(what, attempt, error = %err, delay_ms = delay.as_millis() as u64, "retrying");
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(GaveUp::Cancelled),
            () = tokio::time::sleep(delay) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn fast() -> PipelineConfig {
        PipelineConfig::default().with_retry_backoff(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn transient_errors_are_retried_within_budget() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, GaveUp<FetchError>> = with_retries(&fast(), 2, &CancelToken::new(), "t", || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(FetchError::Transient("busy".into()))
            } else {
                Ok(n)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retries(&fast(), 5, &CancelToken::new(), "t", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(FetchError::Permanent("404".into()))
        })
        .await;
        assert!(matches!(result, Err(GaveUp::Failed(FetchError::Permanent(_)))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn budget_exhaustion_returns_last_error() {
        let result: Result<(), _> = with_retries(&fast(), 1, &CancelToken::new(), "t", || async {
            Err(CollaboratorError::Timeout)
        })
        .await;
        assert!(matches!(result, Err(GaveUp::Failed(CollaboratorError::Timeout))));
    }

    #[tokio::test]
    async fn cancellation_stops_waiting() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let result: Result<(), GaveUp<FetchError>> =
            with_retries(&fast(), 3, &cancel, "t", || std::future::pending()).await;
        assert!(matches!(result, Err(GaveUp::Cancelled)));
    }
}
