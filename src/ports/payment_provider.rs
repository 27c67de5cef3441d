//! Payment provider ports.
//!
//! Two channels are supported: a mobile-money push (`PushPaymentProvider`)
//! and hosted card checkout (`CardPaymentProvider`). Both hand back a
//! provider-issued tracking id that becomes the payment attempt's
//! transaction id.
//!
//! Implementations must bound every outbound call with a timeout and report
//! auth/network failures as `PaymentError` rather than hanging.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::billing::{PhoneNumber, VerifiedEvent, WebhookError};
use crate::domain::foundation::{TransactionId, UserId};

/// Port for the push (STK) channel.
#[async_trait]
pub trait PushPaymentProvider: Send + Sync {
    /// Sends a payment prompt to the payer's handset.
    ///
    /// Returns only once the provider has accepted the request.
    async fn initiate_push(
        &self,
        request: PushPaymentRequest,
    ) -> Result<PushPaymentAccepted, PaymentError>;
}

/// Port for the card checkout channel.
#[async_trait]
pub trait CardPaymentProvider: Send + Sync {
    /// Creates a hosted checkout session for one plan purchase.
    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError>;

    /// Verifies a webhook signature over the raw body and parses the event.
    fn verify_webhook(&self, payload: &[u8], signature: &str)
        -> Result<VerifiedEvent, WebhookError>;
}

/// Request to prompt a payer on the push channel.
#[derive(Debug, Clone)]
pub struct PushPaymentRequest {
    pub user_id: UserId,
    pub plan_id: String,
    pub phone_number: PhoneNumber,
    /// Whole KES.
    pub amount: i64,
    pub description: String,
}

impl PushPaymentRequest {
    /// Merchant reference shown on the payer's statement.
    pub fn account_reference(&self) -> String {
        format!("PLAN-{}", self.plan_id)
    }
}

/// Provider acknowledgement of a push request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushPaymentAccepted {
    pub transaction_id: TransactionId,
    pub merchant_request_id: Option<String>,
    pub customer_message: Option<String>,
}

/// Request to open a card checkout session.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    /// Stored as the session's `client_reference_id`.
    pub user_id: UserId,
    pub plan_id: String,
    pub price_id: String,
    pub customer_email: Option<String>,
}

/// Checkout session created by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: TransactionId,

    /// Hosted payment page the client is redirected to.
    pub url: Option<String>,
}

/// Payment operation error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentError {
    /// Error code for categorization.
    pub code: PaymentErrorCode,

    /// Human-readable message.
    pub message: String,

    /// Provider's error code (if available).
    pub provider_code: Option<String>,

    /// Whether the operation can be retried.
    pub retryable: bool,
}

impl PaymentError {
    /// Create a new payment error.
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    /// Create with provider code.
    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    /// Create a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::Timeout, message)
    }

    /// Create an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::AuthenticationError, message)
    }

    /// Create a rejected-request error.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::RequestRejected, message)
    }

    /// Create a provider API error.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::ProviderError, message)
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PaymentError {}

/// Payment error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    /// Network connectivity issue.
    NetworkError,

    /// The provider did not answer within the configured timeout.
    Timeout,

    /// API authentication failed.
    AuthenticationError,

    /// The provider refused the request (bad number, invalid price, ...).
    RequestRejected,

    /// Rate limit exceeded.
    RateLimitExceeded,

    /// Provider API error or unexpected response.
    ProviderError,
}

impl PaymentErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentErrorCode::NetworkError
                | PaymentErrorCode::Timeout
                | PaymentErrorCode::RateLimitExceeded
        )
    }
}

impl std::fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentErrorCode::NetworkError => "network_error",
            PaymentErrorCode::Timeout => "timeout",
            PaymentErrorCode::AuthenticationError => "authentication_error",
            PaymentErrorCode::RequestRejected => "request_rejected",
            PaymentErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            PaymentErrorCode::ProviderError => "provider_error",
        };
        write!(f, "{}", s)
    }
}
