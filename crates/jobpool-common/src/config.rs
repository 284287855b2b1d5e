//! Process-wide autoscaler configuration
//!
//! Built once at startup by the embedding process (the `jobpool` CLI reads
//! flags and environment) and handed to the reconciler by value. Nothing in
//! the reconciliation path looks configuration up on its own.

use std::time::Duration;

use crate::retry::RetryConfig;
use crate::DEFAULT_MAX_WORKERS;

/// Default connection timeout for kube clients
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default read timeout for kube clients
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings shared by every reconciliation in the process
#[derive(Clone, Debug, PartialEq)]
pub struct AutoscalerConfig {
    /// Whether reconciliation runs at all. Off by default.
    pub enabled: bool,
    /// Ceiling on active jobs per group when the owner does not set one
    pub max_workers: u32,
    /// Backoff policy wrapped around every remote call
    pub retry: RetryConfig,
    /// Connect timeout for the Kubernetes client
    pub connect_timeout: Duration,
    /// Read timeout for the Kubernetes client
    pub read_timeout: Duration,
}

impl Default for AutoscalerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_workers: DEFAULT_MAX_WORKERS,
            retry: RetryConfig::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

impl AutoscalerConfig {
    /// Default configuration with reconciliation switched on
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Default::default()
        }
    }

    /// Override the default worker ceiling
    pub fn with_max_workers(mut self, max_workers: u32) -> Self {
        self.max_workers = max_workers;
        self
    }

    /// Override the retry policy
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_by_default() {
        let config = AutoscalerConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.max_workers, 10);
    }

    #[test]
    fn builders_override_fields() {
        let config = AutoscalerConfig::enabled()
            .with_max_workers(3)
            .with_retry(RetryConfig::no_retry());
        assert!(config.enabled);
        assert_eq!(config.max_workers, 3);
        assert_eq!(config.retry.max_attempts, 1);
    }
}
