//! Retry policy for bus transport calls.
//!
//! Uses `backon` for exponential backoff with jitter. Only transient
//! transport failures are retried; in-band events never reach this layer.

use std::time::Duration;

use backon::ExponentialBuilder;
use serde::Deserialize;

use crate::error::TransportError;

/// Transport retry configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retry transient failures at all.
    pub enabled: bool,
    /// First backoff delay in milliseconds.
    pub min_delay_ms: u64,
    /// Backoff ceiling in milliseconds.
    pub max_delay_ms: u64,
    /// Retries after the first attempt.
    pub max_times: usize,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_delay_ms: 100,
            max_delay_ms: 2_000,
            max_times: 3,
        }
    }
}

impl RetryConfig {
    /// No retries.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Backoff builder for this configuration.
    ///
    /// - Min delay: `min_delay_ms`
    /// - Max delay: `max_delay_ms`
    /// - Max attempts: `max_times` (0 when disabled)
    /// - Jitter enabled
    pub fn backoff(&self) -> ExponentialBuilder {
        let max_times = if self.enabled { self.max_times } else { 0 };
        ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(self.min_delay_ms))
            .with_max_delay(Duration::from_millis(self.max_delay_ms))
            .with_max_times(max_times)
            .with_jitter()
    }
}

/// Determines if a transport failure is worth retrying.
pub fn is_retryable_transport(err: &TransportError) -> bool {
    err.is_retryable()
}
