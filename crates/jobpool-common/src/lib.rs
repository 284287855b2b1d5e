//! Common types shared by jobpool crates
//!
//! - [`error`] - Gateway and infrastructure error taxonomy
//! - [`retry`] - Exponential backoff for remote calls
//! - [`labels`] - Wire-visible label keys attached to worker resources
//! - [`config`] - Process-wide autoscaler configuration
//! - [`telemetry`] - Logging setup for binaries

#![deny(missing_docs)]

pub mod config;
pub mod error;
pub mod labels;
pub mod retry;
pub mod telemetry;

pub use config::AutoscalerConfig;
pub use error::Error;
pub use retry::{retry_with_backoff, retry_with_backoff_if, RetryConfig};

/// Result type alias using the common Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Namespace used when neither the manifest nor the connection context names one
pub const DEFAULT_NAMESPACE: &str = "default";

/// Default ceiling on concurrently active worker jobs per group
pub const DEFAULT_MAX_WORKERS: u32 = 10;
