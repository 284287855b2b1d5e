//! Error types for remote gateway operations
//!
//! Kubernetes errors are classified on the way in so callers can tell an
//! absent resource apart from a failure worth retrying, and both apart from
//! a request the API server refused outright.

use thiserror::Error;

/// HTTP status codes the API server uses for conditions that may clear on retry
const TRANSIENT_STATUS_CODES: &[u16] = &[408, 429, 500, 502, 503, 504];

/// Main error type for gateway and infrastructure operations
#[derive(Debug, Error)]
pub enum Error {
    /// The addressed resource does not exist (HTTP 404)
    #[error("not found during {operation}: {message}")]
    NotFound {
        /// Gateway operation that observed the miss (e.g. "delete_job")
        operation: String,
        /// Message reported by the API server
        message: String,
    },

    /// Network failure or server-side condition that may clear on retry
    #[error("transient failure during {operation}: {message}")]
    Transient {
        /// Gateway operation that failed
        operation: String,
        /// Description of the failure
        message: String,
    },

    /// The API server refused the request (authorization, validation, conflict)
    #[error("{operation} rejected with status {code}: {message}")]
    Rejected {
        /// Gateway operation that was rejected
        operation: String,
        /// HTTP status code returned by the API server
        code: u16,
        /// Message reported by the API server
        message: String,
    },

    /// Kubernetes client error that fits no other class
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        source: kube::Error,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
    },

    /// Invalid or unreadable connection configuration
    #[error("configuration error: {message}")]
    Config {
        /// Description of what's invalid
        message: String,
    },

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Where the error occurred (e.g. "connect", "reaper")
        context: String,
        /// Description of what failed
        message: String,
    },
}

impl Error {
    /// Classify a kube-rs error raised by the named gateway operation
    pub fn from_kube(operation: &str, err: kube::Error) -> Self {
        match err {
            kube::Error::Api(response) if response.code == 404 => Self::NotFound {
                operation: operation.to_string(),
                message: response.message,
            },
            kube::Error::Api(response) if TRANSIENT_STATUS_CODES.contains(&response.code) => {
                Self::Transient {
                    operation: operation.to_string(),
                    message: format!("{} ({})", response.message, response.code),
                }
            }
            kube::Error::Api(response) => Self::Rejected {
                operation: operation.to_string(),
                code: response.code,
                message: response.message,
            },
            kube::Error::HyperError(e) => Self::Transient {
                operation: operation.to_string(),
                message: e.to_string(),
            },
            kube::Error::Service(e) => Self::Transient {
                operation: operation.to_string(),
                message: e.to_string(),
            },
            other => Self::Kube { source: other },
        }
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
        }
    }

    /// Create a configuration error with the given message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create an internal error with context
    pub fn internal_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            context: context.into(),
            message: msg.into(),
        }
    }

    /// Whether the resource was already absent
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether the operation may succeed if attempted again
    ///
    /// Only transient failures qualify. A missing resource stays missing and
    /// a rejected request will be rejected again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

impl From<kube::Error> for Error {
    fn from(err: kube::Error) -> Self {
        Self::from_kube("kubernetes api", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::error::ErrorResponse;

    fn api_error(code: u16) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: format!("status {code}"),
            reason: "Test".to_string(),
            code,
        })
    }

    #[test]
    fn api_404_is_not_found() {
        let err = Error::from_kube("delete_job", api_error(404));
        assert!(err.is_not_found());
        assert!(!err.is_retryable());
    }

    #[test]
    fn server_side_failures_are_transient() {
        for code in [429, 500, 503] {
            let err = Error::from_kube("list_jobs", api_error(code));
            assert!(err.is_retryable(), "code {code} should be retryable");
        }
    }

    #[test]
    fn client_side_failures_are_rejected() {
        for code in [401, 403, 409, 422] {
            let err = Error::from_kube("create_job", api_error(code));
            match err {
                Error::Rejected { code: c, .. } => assert_eq!(c, code),
                other => panic!("expected Rejected, got {other:?}"),
            }
        }
    }

    #[test]
    fn conversion_classifies_too() {
        let err: Error = api_error(404).into();
        assert!(err.is_not_found());
    }

    #[test]
    fn display_includes_operation() {
        let err = Error::from_kube("delete_pod", api_error(404));
        assert!(err.to_string().contains("delete_pod"));
    }
}
