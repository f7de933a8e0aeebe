use std::time::Duration;

use thiserror::Error;

/// Errors produced by shared-context access.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    #[error("write to field '{field}' not permitted (allowed: {allowed})")]
    WriteNotPermitted { field: String, allowed: String },
}

/// Failure of a single phase handler.
///
/// The executor converts any of these into a failed phase result; handlers
/// never need to catch their own errors.
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("{service} failed: {message}")]
    Service { service: String, message: String },

    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: String,
        timeout: Duration,
    },

    #[error("circuit open for {0}")]
    CircuitOpen(String),

    #[error("missing input: {0}")]
    MissingInput(String),

    #[error("context error: {0}")]
    Context(#[from] ContextError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HandlerError {
    pub fn service(service: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Service {
            service: service.into(),
            message: err.to_string(),
        }
    }

    pub fn missing(what: impl Into<String>) -> Self {
        Self::MissingInput(what.into())
    }

    /// Whether repeating the same call could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Service { .. } | Self::Timeout { .. } | Self::Other(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(HandlerError::service("marketplace", "503").is_retryable());
        assert!(HandlerError::Timeout {
            operation: "render.poll".into(),
            timeout: Duration::from_secs(1),
        }
        .is_retryable());
        assert!(!HandlerError::CircuitOpen("speech".into()).is_retryable());
        assert!(!HandlerError::missing("topic").is_retryable());
    }

    #[test]
    fn test_service_error_message() {
        let err = HandlerError::service("copywriter", "quota exceeded");
        assert_eq!(err.to_string(), "copywriter failed: quota exceeded");
    }
}
