//! Lifecycle configuration.

use std::time::Duration;

use serde::Deserialize;

/// Configuration for a [`CredentialLifecycle`](crate::CredentialLifecycle).
///
/// Every field has a default, so hosts can load a partial JSON object.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Timeout for a single issuer call, in milliseconds.
    pub issuer_timeout_ms: u64,

    /// Timeout for a single content store call, in milliseconds.
    pub store_timeout_ms: u64,

    /// Attempts per suspension point, including the first (minimum 1).
    pub max_attempts: u32,

    /// Delay before the first retry, in milliseconds.
    pub initial_backoff_ms: u64,

    /// Multiplier applied to the delay after each retry.
    pub backoff_factor: f64,

    /// Upper bound on the delay between retries, in milliseconds.
    pub max_backoff_ms: u64,

    /// Keep a copy of each envelope in the local vault record.
    pub cache_envelopes: bool,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            issuer_timeout_ms: 30_000,
            store_timeout_ms: 15_000,
            max_attempts: 3,
            initial_backoff_ms: 250,
            backoff_factor: 2.0,
            max_backoff_ms: 5_000,
            cache_envelopes: true,
        }
    }
}

impl LifecycleConfig {
    pub fn issuer_timeout(&self) -> Duration {
        Duration::from_millis(self.issuer_timeout_ms)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}
