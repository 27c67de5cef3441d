//! Billing error taxonomy.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | InvalidRequest | 400 |
//! | SignatureInvalid | 400 |
//! | CallbackUnauthorized | 401 |
//! | InsufficientCredit | 402 |
//! | NotFound | 404 |
//! | AccountNotFound | 404 |
//! | UnknownTransaction | 404 |
//! | AlreadySettled | 409 |
//! | RewriteFailed | 502 |
//! | PaymentProviderUnavailable | 503 |
//! | EntitlementMutationFailed | 500 |
//! | Infrastructure | 500 |

use super::payment::PaymentStatus;
use super::webhook_errors::WebhookError;
use crate::domain::foundation::{DomainError, ErrorCode, TransactionId, UserId, ValidationError};

/// Errors surfaced by billing operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingError {
    /// Missing or malformed input, rejected before any provider call.
    InvalidRequest { field: String, message: String },

    /// The payment provider could not be reached or refused our credentials.
    PaymentProviderUnavailable(String),

    /// Card webhook failed signature verification.
    SignatureInvalid(String),

    /// Push callback presented a wrong or missing token.
    CallbackUnauthorized,

    /// No attempt exists for this transaction id.
    UnknownTransaction(TransactionId),

    /// The attempt is already terminal.
    AlreadySettled {
        transaction_id: TransactionId,
        status: PaymentStatus,
    },

    /// The balance does not cover the cost of the action.
    InsufficientCredit { required: i64, available: i64 },

    /// A settled payment could not be applied to the owner's entitlement.
    EntitlementMutationFailed(String),

    /// Scoped lookup found nothing visible to the caller.
    NotFound(String),

    /// The caller has no entitlement record.
    AccountNotFound(UserId),

    /// The language model call failed after the debit committed.
    RewriteFailed(String),

    /// Storage or other internal failure.
    Infrastructure(String),
}

impl BillingError {
    pub fn invalid_request(field: impl Into<String>, message: impl Into<String>) -> Self {
        BillingError::InvalidRequest {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn provider_unavailable(message: impl Into<String>) -> Self {
        BillingError::PaymentProviderUnavailable(message.into())
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        BillingError::Infrastructure(message.into())
    }

    pub fn payment_not_found(transaction_id: &TransactionId) -> Self {
        BillingError::NotFound(format!("Payment {} not found", transaction_id))
    }

    /// Stable machine-readable code used in API responses.
    pub fn code(&self) -> &'static str {
        match self {
            BillingError::InvalidRequest { .. } => "INVALID_REQUEST",
            BillingError::PaymentProviderUnavailable(_) => "PAYMENT_PROVIDER_UNAVAILABLE",
            BillingError::SignatureInvalid(_) => "SIGNATURE_INVALID",
            BillingError::CallbackUnauthorized => "CALLBACK_UNAUTHORIZED",
            BillingError::UnknownTransaction(_) => "UNKNOWN_TRANSACTION",
            BillingError::AlreadySettled { .. } => "ALREADY_SETTLED",
            BillingError::InsufficientCredit { .. } => "INSUFFICIENT_CREDIT",
            BillingError::EntitlementMutationFailed(_) => "ENTITLEMENT_MUTATION_FAILED",
            BillingError::NotFound(_) => "NOT_FOUND",
            BillingError::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            BillingError::RewriteFailed(_) => "REWRITE_FAILED",
            BillingError::Infrastructure(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns a user-facing error message.
    pub fn message(&self) -> String {
        match self {
            BillingError::InvalidRequest { field, message } => {
                format!("Invalid '{}': {}", field, message)
            }
            BillingError::PaymentProviderUnavailable(msg) => {
                format!("Payment provider unavailable: {}", msg)
            }
            BillingError::SignatureInvalid(msg) => format!("Webhook signature invalid: {}", msg),
            BillingError::CallbackUnauthorized => "Callback not authorized".to_string(),
            BillingError::UnknownTransaction(id) => format!("Unknown transaction: {}", id),
            BillingError::AlreadySettled {
                transaction_id,
                status,
            } => format!("Transaction {} already settled as {}", transaction_id, status),
            BillingError::InsufficientCredit {
                required,
                available,
            } => format!(
                "Insufficient credits: {} required, {} available",
                required, available
            ),
            BillingError::EntitlementMutationFailed(msg) => {
                format!("Entitlement update failed: {}", msg)
            }
            BillingError::NotFound(msg) => msg.clone(),
            BillingError::AccountNotFound(user_id) => format!("No account for user {}", user_id),
            BillingError::RewriteFailed(msg) => format!("Rewrite failed: {}", msg),
            // internal details stay in the logs
            BillingError::Infrastructure(_) => "Internal error".to_string(),
        }
    }

    /// True when a provider delivering a callback should retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BillingError::Infrastructure(_)
                | BillingError::EntitlementMutationFailed(_)
                | BillingError::PaymentProviderUnavailable(_)
        )
    }
}

impl std::fmt::Display for BillingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BillingError::Infrastructure(msg) => write!(f, "Infrastructure error: {}", msg),
            other => write!(f, "{}", other.message()),
        }
    }
}

impl std::error::Error for BillingError {}

impl From<ValidationError> for BillingError {
    fn from(err: ValidationError) -> Self {
        BillingError::InvalidRequest {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<DomainError> for BillingError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed => BillingError::InvalidRequest {
                field: err.details.get("field").cloned().unwrap_or_default(),
                message: err.message,
            },
            ErrorCode::PaymentNotFound => BillingError::NotFound(err.message),
            _ => BillingError::Infrastructure(err.to_string()),
        }
    }
}

impl From<WebhookError> for BillingError {
    fn from(err: WebhookError) -> Self {
        match err {
            WebhookError::InvalidCallbackToken => BillingError::CallbackUnauthorized,
            WebhookError::ParseError(msg) => BillingError::invalid_request("payload", msg),
            other => BillingError::SignatureInvalid(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_credit_message_includes_amounts() {
        let err = BillingError::InsufficientCredit {
            required: 3,
            available: 2,
        };
        assert_eq!(err.code(), "INSUFFICIENT_CREDIT");
        assert_eq!(err.to_string(), "Insufficient credits: 3 required, 2 available");
    }

    #[test]
    fn infrastructure_message_hides_details() {
        let err = BillingError::infrastructure("pool timed out");
        assert_eq!(err.message(), "Internal error");
        assert!(err.to_string().contains("pool timed out"));
    }

    #[test]
    fn validation_error_becomes_invalid_request() {
        let err: BillingError = ValidationError::empty_field("phone_number").into();
        assert!(matches!(
            err,
            BillingError::InvalidRequest { ref field, .. } if field == "phone_number"
        ));
    }

    #[test]
    fn database_domain_error_becomes_infrastructure() {
        let err: BillingError = DomainError::database("connection refused").into();
        assert!(matches!(err, BillingError::Infrastructure(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn webhook_errors_map_by_kind() {
        assert!(matches!(
            BillingError::from(WebhookError::InvalidSignature),
            BillingError::SignatureInvalid(_)
        ));
        assert!(matches!(
            BillingError::from(WebhookError::TimestampOutOfRange),
            BillingError::SignatureInvalid(_)
        ));
        assert_eq!(
            BillingError::from(WebhookError::InvalidCallbackToken),
            BillingError::CallbackUnauthorized
        );
        assert!(matches!(
            BillingError::from(WebhookError::ParseError("bad".into())),
            BillingError::InvalidRequest { .. }
        ));
    }

    #[test]
    fn client_errors_are_not_retryable() {
        assert!(!BillingError::invalid_request("plan_id", "missing").is_retryable());
        assert!(!BillingError::SignatureInvalid("x".into()).is_retryable());
        assert!(!BillingError::InsufficientCredit {
            required: 1,
            available: 0
        }
        .is_retryable());
    }
}
