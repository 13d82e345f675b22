//! Error types for gateway webhook handling.
//!
//! The status code mapping drives the gateway's retry behavior, so the
//! classification here is load-bearing: acknowledging an event the system
//! failed to durably record would lose it forever.

use axum::http::StatusCode;
use thiserror::Error;

/// Errors that occur during webhook processing.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Signature verification failed.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Webhook timestamp is older than the acceptance window.
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// Event timestamp is in the future beyond clock skew tolerance.
    #[error("Invalid timestamp")]
    InvalidTimestamp,

    /// Failed to parse the payload or the signature header.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Required field missing from the event payload.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// Event was intentionally dropped (not an error condition).
    #[error("Event ignored: {0}")]
    Ignored(String),

    /// Attempted state transition the subscription machine forbids.
    #[error("Invalid state transition: {0}")]
    InvalidTransition(String),

    /// Backing store operation failed.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl WebhookError {
    /// True if the gateway should retry delivering this event.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WebhookError::Storage(_))
    }

    /// Maps the error to the HTTP status returned to the gateway.
    ///
    /// - 2xx: event acknowledged, no retry
    /// - 4xx: rejected, no retry
    /// - 5xx: transient, gateway will retry
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::InvalidSignature
            | WebhookError::TimestampOutOfRange
            | WebhookError::InvalidTimestamp
            | WebhookError::ParseError(_)
            | WebhookError::MissingField(_) => StatusCode::BAD_REQUEST,

            // Dropped events are acknowledged so the gateway stops resending
            WebhookError::Ignored(_) => StatusCode::OK,

            WebhookError::InvalidTransition(_) | WebhookError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ══════════════════════════════════════════════════════════════
    // Retryability Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn storage_error_is_retryable() {
        assert!(WebhookError::Storage("pool exhausted".to_string()).is_retryable());
    }

    #[test]
    fn rejections_are_not_retryable() {
        assert!(!WebhookError::InvalidSignature.is_retryable());
        assert!(!WebhookError::TimestampOutOfRange.is_retryable());
        assert!(!WebhookError::ParseError("bad json".to_string()).is_retryable());
        assert!(!WebhookError::MissingField("subscription").is_retryable());
        assert!(!WebhookError::Ignored("unknown reference".to_string()).is_retryable());
    }

    // ══════════════════════════════════════════════════════════════
    // Status Code Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn signature_failures_return_bad_request() {
        assert_eq!(
            WebhookError::InvalidSignature.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            WebhookError::TimestampOutOfRange.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            WebhookError::InvalidTimestamp.status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn malformed_payloads_return_bad_request() {
        assert_eq!(
            WebhookError::ParseError("syntax".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            WebhookError::MissingField("id").status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn ignored_returns_ok() {
        assert_eq!(
            WebhookError::Ignored("not relevant".to_string()).status_code(),
            StatusCode::OK
        );
    }

    #[test]
    fn transient_failures_return_internal_error() {
        assert_eq!(
            WebhookError::Storage("down".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            WebhookError::InvalidTransition("bad".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
