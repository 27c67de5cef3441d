//! Errors raised while authenticating provider callbacks.

use thiserror::Error;

/// Why a webhook or push callback was rejected before touching the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookError {
    /// The signature header was absent.
    #[error("Missing signature header")]
    MissingSignature,

    /// Webhook signature verification failed.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Webhook timestamp is outside the acceptable window (5 minutes).
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// Event timestamp is in the future beyond clock skew tolerance.
    #[error("Invalid timestamp")]
    InvalidTimestamp,

    /// The push callback token did not match.
    #[error("Invalid callback token")]
    InvalidCallbackToken,

    /// A test-mode event reached an endpoint that only accepts live events.
    #[error("Test mode event rejected")]
    LivemodeMismatch,

    /// Failed to parse webhook payload or signature header.
    #[error("Parse error: {0}")]
    ParseError(String),
}

impl WebhookError {
    /// True for failures of authenticity, as opposed to a malformed but
    /// authentic payload.
    pub fn is_authentication_failure(&self) -> bool {
        !matches!(self, WebhookError::ParseError(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_signature_displays_correctly() {
        assert_eq!(WebhookError::InvalidSignature.to_string(), "Invalid signature");
    }

    #[test]
    fn parse_error_displays_message() {
        let err = WebhookError::ParseError("invalid JSON".to_string());
        assert_eq!(err.to_string(), "Parse error: invalid JSON");
    }

    #[test]
    fn authenticity_classification() {
        assert!(WebhookError::MissingSignature.is_authentication_failure());
        assert!(WebhookError::InvalidSignature.is_authentication_failure());
        assert!(WebhookError::TimestampOutOfRange.is_authentication_failure());
        assert!(WebhookError::InvalidTimestamp.is_authentication_failure());
        assert!(WebhookError::InvalidCallbackToken.is_authentication_failure());
        assert!(WebhookError::LivemodeMismatch.is_authentication_failure());
        assert!(!WebhookError::ParseError("x".to_string()).is_authentication_failure());
    }
}
