//! Structured error types for the DataSetIQ client.
//!
//! Wire errors mirror the service's error envelope and HTTP status; local
//! errors cover misuse of the library (bad input shapes, bad options) and are
//! never retried.

use serde_json::Value;
use thiserror::Error;

/// Every failure the client can surface.
#[derive(Debug, Error)]
pub enum DataError {
    /// HTTP 429 with code `RATE_LIMIT`. The caller must back off.
    #[error("rate limited: {message}{}", retry_hint(.retry_after_secs))]
    RateLimit {
        message: String,
        retry_after_secs: Option<u64>,
    },

    /// HTTP 429 with code `QUOTA_EXCEEDED`. Not retryable.
    #[error("quota exceeded: {message} (used {}, limit {})", fmt_count(.used), fmt_count(.limit))]
    QuotaExceeded {
        message: String,
        limit: Option<u64>,
        used: Option<u64>,
    },

    /// HTTP 404.
    #[error("not found: {message}")]
    NotFound { message: String },

    /// HTTP 400.
    #[error("validation error [{code}]: {message}")]
    Validation { code: String, message: String },

    /// HTTP 5xx, surfaced after the retry budget is spent.
    #[error("service error (HTTP {status}) [{code}]: {message}")]
    Service {
        status: u16,
        code: String,
        message: String,
    },

    /// Any other non-success status.
    #[error("API error (HTTP {status}) [{code}]: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
        details: Option<Value>,
    },

    #[error("network error: {message}")]
    Network { message: String, transient: bool },

    #[error("unexpected response format: {0}")]
    ResponseFormat(String),

    /// Input of the wrong shape for the requested operation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("frame must include a 'value' column or exactly one value column")]
    MissingValueColumn,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("frame error: {0}")]
    Frame(#[from] polars::error::PolarsError),
}

fn retry_hint(secs: &Option<u64>) -> String {
    secs.map(|s| format!(" (retry after {s}s)")).unwrap_or_default()
}

fn fmt_count(n: &Option<u64>) -> String {
    n.map(|v| v.to_string()).unwrap_or_else(|| "?".into())
}

impl DataError {
    /// HTTP status this error was derived from, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RateLimit { .. } | Self::QuotaExceeded { .. } => Some(429),
            Self::NotFound { .. } => Some(404),
            Self::Validation { .. } => Some(400),
            Self::Service { status, .. } | Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Machine-readable error code from the service envelope, if any.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::RateLimit { .. } => Some("RATE_LIMIT"),
            Self::QuotaExceeded { .. } => Some("QUOTA_EXCEEDED"),
            Self::NotFound { .. } => Some("NOT_FOUND"),
            Self::Validation { code, .. } | Self::Service { code, .. } | Self::Api { code, .. } => {
                Some(code.as_str())
            }
            _ => None,
        }
    }

    /// Whether the transport may retry the request that produced this error.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Service { .. } => true,
            Self::Network { transient, .. } => *transient,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_service_and_transient_network_errors_retry() {
        let service = DataError::Service {
            status: 503,
            code: "SERVICE_ERROR".into(),
            message: "down".into(),
        };
        assert!(service.is_retryable());

        let rate = DataError::RateLimit {
            message: "slow down".into(),
            retry_after_secs: Some(1),
        };
        assert!(!rate.is_retryable());

        let quota = DataError::QuotaExceeded {
            message: "monthly".into(),
            limit: Some(25),
            used: Some(25),
        };
        assert!(!quota.is_retryable());
        assert!(!DataError::NotFound { message: "x".into() }.is_retryable());

        let refused = DataError::Network {
            message: "connection refused".into(),
            transient: true,
        };
        assert!(refused.is_retryable());
    }

    #[test]
    fn status_and_code_accessors() {
        let quota = DataError::QuotaExceeded {
            message: "Monthly quota exceeded".into(),
            limit: Some(25),
            used: Some(25),
        };
        assert_eq!(quota.status(), Some(429));
        assert_eq!(quota.code(), Some("QUOTA_EXCEEDED"));
        assert_eq!(
            quota.to_string(),
            "quota exceeded: Monthly quota exceeded (used 25, limit 25)"
        );

        let invalid = DataError::InvalidInput("bad".into());
        assert_eq!(invalid.status(), None);
        assert_eq!(invalid.code(), None);
    }

    #[test]
    fn rate_limit_message_includes_hint() {
        let err = DataError::RateLimit {
            message: "Rate limit exceeded".into(),
            retry_after_secs: Some(30),
        };
        assert_eq!(
            err.to_string(),
            "rate limited: Rate limit exceeded (retry after 30s)"
        );
    }
}
