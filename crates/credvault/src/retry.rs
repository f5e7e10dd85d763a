//! Bounded retries and caller-triggered cancellation for suspension points.
//!
//! Every call to the issuer or the content store goes through
//! [`RetryPolicy::run`]: each attempt is bounded by a timeout, transient
//! failures back off exponentially, and a [`CancelToken`] can abort the
//! whole thing at any await.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::config::LifecycleConfig;
use crate::error::VaultError;
use crate::issuer::IssuerError;
use credvault_store::StoreError;

/// Errors that know whether a retry may help.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

impl Transient for StoreError {
    fn is_transient(&self) -> bool {
        StoreError::is_transient(self)
    }
}

impl Transient for IssuerError {
    fn is_transient(&self) -> bool {
        IssuerError::is_transient(self)
    }
}

/// A cloneable flag that aborts in-flight lifecycle operations.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Request cancellation. Every clone observes it.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        // The sender lives as long as any clone of the token, including self.
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Timeout and backoff settings for one kind of call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub attempt_timeout: Duration,
    pub initial_backoff: Duration,
    pub backoff_factor: f64,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Policy for issuer calls.
    pub fn for_issuer(config: &LifecycleConfig) -> Self {
        Self::with_timeout(config, config.issuer_timeout())
    }

    /// Policy for content store calls.
    pub fn for_store(config: &LifecycleConfig) -> Self {
        Self::with_timeout(config, config.store_timeout())
    }

    fn with_timeout(config: &LifecycleConfig, attempt_timeout: Duration) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            attempt_timeout,
            initial_backoff: config.initial_backoff(),
            backoff_factor: config.backoff_factor,
            max_backoff: config.max_backoff(),
        }
    }

    fn next_delay(&self, delay: Duration) -> Duration {
        let scaled = delay.as_secs_f64() * self.backoff_factor.max(1.0);
        Duration::from_secs_f64(scaled.min(self.max_backoff.as_secs_f64()))
    }

    /// Run `op` until it succeeds, fails permanently, runs out of attempts
    /// or is cancelled.
    ///
    /// Permanent errors are returned as-is. Exhausting the attempts on
    /// timeouts or transient errors yields [`VaultError::Timeout`].
    pub async fn run<T, E, F, Fut>(
        &self,
        operation: &str,
        cancel: &CancelToken,
        mut op: F,
    ) -> Result<T, VaultError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Transient + Into<VaultError> + std::fmt::Display,
    {
        let mut delay = self.initial_backoff;

        for attempt in 1..=self.max_attempts {
            if cancel.is_cancelled() {
                return Err(VaultError::Cancelled);
            }

            debug!(operation, attempt, max_attempts = self.max_attempts, "attempt");

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(VaultError::Cancelled),
                outcome = tokio::time::timeout(self.attempt_timeout, op()) => outcome,
            };

            match outcome {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) if !e.is_transient() => return Err(e.into()),
                Ok(Err(e)) => {
                    warn!(operation, attempt, error = %e, "transient failure");
                }
                Err(_elapsed) => {
                    warn!(operation, attempt, timeout = ?self.attempt_timeout, "attempt timed out");
                }
            }

            if attempt < self.max_attempts {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(VaultError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
                delay = self.next_delay(delay);
            }
        }

        Err(VaultError::Timeout {
            operation: operation.to_string(),
            attempts: self.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            attempt_timeout: Duration::from_secs(1),
            initial_backoff: Duration::from_millis(10),
            backoff_factor: 2.0,
            max_backoff: Duration::from_millis(40),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_then_success() {
        let calls = AtomicU32::new(0);
        let result = policy(3)
            .run("put", &CancelToken::new(), || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(StoreError::Unavailable("busy".into()))
                } else {
                    Ok(7)
                }
            })
            .await;

        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_is_timeout() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = policy(2)
            .run("put", &CancelToken::new(), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(StoreError::Unavailable("down".into()))
            })
            .await;

        assert_eq!(
            result,
            Err(VaultError::Timeout {
                operation: "put".into(),
                attempts: 2
            })
        );
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = policy(5)
            .run("get", &CancelToken::new(), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(StoreError::NotFound("bafk".into()))
            })
            .await;

        assert_eq!(result, Err(VaultError::NotFound("bafk".into())));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_attempts_time_out() {
        let result: Result<(), VaultError> = policy(2)
            .run("issue", &CancelToken::new(), || async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<_, IssuerError>(())
            })
            .await;

        assert!(matches!(result, Err(VaultError::Timeout { attempts: 2, .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_attempt() {
        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let result: Result<(), VaultError> = policy(3)
            .run("issue", &cancel, || async {
                tokio::time::sleep(Duration::from_millis(900)).await;
                Ok::<_, IssuerError>(())
            })
            .await;

        assert_eq!(result, Err(VaultError::Cancelled));
    }

    #[tokio::test]
    async fn test_already_cancelled() {
        let cancel = CancelToken::new();
        cancel.cancel();
        assert!(cancel.is_cancelled());

        let result: Result<(), VaultError> = policy(3)
            .run("get", &cancel, || async { Ok::<_, StoreError>(()) })
            .await;
        assert_eq!(result, Err(VaultError::Cancelled));
    }

    proptest::proptest! {
        #[test]
        fn backoff_never_shrinks_or_exceeds_cap(
            start_ms in 1u64..10_000,
            factor in 1.0f64..8.0,
            cap_ms in 1u64..60_000,
        ) {
            let p = RetryPolicy {
                max_attempts: 3,
                attempt_timeout: Duration::from_secs(1),
                initial_backoff: Duration::from_millis(start_ms),
                backoff_factor: factor,
                max_backoff: Duration::from_millis(cap_ms),
            };
            let start = Duration::from_millis(start_ms.min(cap_ms));
            let next = p.next_delay(start);
            proptest::prop_assert!(next <= p.max_backoff);
            proptest::prop_assert!(next + Duration::from_micros(1) >= start);
        }
    }

    #[test]
    fn test_backoff_is_capped() {
        let p = policy(5);
        let d1 = p.next_delay(Duration::from_millis(10));
        let d2 = p.next_delay(d1);
        let d3 = p.next_delay(d2);
        assert_eq!(d1, Duration::from_millis(20));
        assert_eq!(d2, Duration::from_millis(40));
        assert_eq!(d3, Duration::from_millis(40));
    }
}
