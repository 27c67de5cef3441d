//! HTTP DTOs (Data Transfer Objects) for billing endpoints.
//!
//! JSON field names are camelCase to match the existing web client. Provider
//! acknowledgements use the shapes the providers expect.

use serde::{Deserialize, Serialize};

use crate::application::handlers::billing::{
    HumanizeTextResult, InitiatePaymentResult, PaymentMethod,
};
use crate::domain::billing::{
    BillingError, Entitlement, PaymentAttempt, PaymentChannel, PaymentStatus, PlanTier,
};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to start a plan purchase.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentIntentRequest {
    pub plan_id: Option<String>,
    /// "mpesa" or "card".
    pub channel: Option<PaymentChannel>,
    /// Required for the mpesa channel.
    pub phone_number: Option<String>,
}

impl CreatePaymentIntentRequest {
    /// Checks required fields and picks the payment method.
    pub fn into_parts(self) -> Result<(String, PaymentMethod), BillingError> {
        let plan_id = self
            .plan_id
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| BillingError::invalid_request("planId", "planId is required"))?;

        let method = match self.channel {
            Some(PaymentChannel::Mpesa) => {
                let phone_number = self
                    .phone_number
                    .filter(|p| !p.trim().is_empty())
                    .ok_or_else(|| {
                        BillingError::invalid_request(
                            "phoneNumber",
                            "phoneNumber is required for mpesa payments",
                        )
                    })?;
                PaymentMethod::Push { phone_number }
            }
            Some(PaymentChannel::Card) => PaymentMethod::Card,
            None => {
                return Err(BillingError::invalid_request(
                    "channel",
                    "channel must be 'mpesa' or 'card'",
                ))
            }
        };

        Ok((plan_id, method))
    }
}

/// Request to rewrite text.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HumanizeRequest {
    #[serde(default)]
    pub text: String,
    pub tone: Option<String>,
    /// 0 to 10.
    pub creativity: Option<i64>,
}

impl HumanizeRequest {
    pub fn creativity(&self) -> Result<Option<u8>, BillingError> {
        self.creativity
            .map(|c| {
                u8::try_from(c).map_err(|_| {
                    BillingError::invalid_request("creativity", "must be between 0 and 10")
                })
            })
            .transpose()
    }
}

/// `?token=` on the push callback URL.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PushCallbackParams {
    pub token: Option<String>,
}

/// `?limit=` on the payment history.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListPaymentsParams {
    pub limit: Option<u32>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Response for a started payment.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentResponse {
    pub transaction_id: String,
    pub channel: PaymentChannel,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_message: Option<String>,
}

impl From<InitiatePaymentResult> for PaymentIntentResponse {
    fn from(result: InitiatePaymentResult) -> Self {
        Self {
            transaction_id: result.transaction_id.to_string(),
            channel: result.channel,
            status: result.status,
            checkout_url: result.checkout_url,
            customer_message: result.customer_message,
        }
    }
}

/// Status of one payment, as seen by its owner.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusResponse {
    pub transaction_id: String,
    pub status: PaymentStatus,
    pub channel: PaymentChannel,
    pub plan_id: String,
    pub amount: i64,
    /// ISO 8601.
    pub created_at: String,
    /// ISO 8601.
    pub updated_at: String,
}

impl From<PaymentAttempt> for PaymentStatusResponse {
    fn from(attempt: PaymentAttempt) -> Self {
        Self {
            transaction_id: attempt.transaction_id.to_string(),
            status: attempt.status,
            channel: attempt.channel,
            plan_id: attempt.plan_id,
            amount: attempt.amount,
            created_at: attempt.created_at.as_datetime().to_rfc3339(),
            updated_at: attempt.updated_at.as_datetime().to_rfc3339(),
        }
    }
}

/// The caller's payment history.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentListResponse {
    pub payments: Vec<PaymentStatusResponse>,
}

/// Account view wrapped as `{"user": {...}}`.
#[derive(Debug, Clone, Serialize)]
pub struct AccountResponse {
    pub user: AccountView,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountView {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub plan: PlanTier,
    pub credits: i64,
}

impl AccountResponse {
    pub fn new(entitlement: Entitlement, email: Option<String>) -> Self {
        Self {
            user: AccountView {
                id: entitlement.user_id.to_string(),
                email,
                plan: entitlement.plan,
                credits: entitlement.credits,
            },
        }
    }
}

/// Result of a rewrite.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HumanizeResponse {
    pub humanized_text: String,
    pub credits_used: i64,
    pub remaining_credits: i64,
}

impl From<HumanizeTextResult> for HumanizeResponse {
    fn from(result: HumanizeTextResult) -> Self {
        Self {
            humanized_text: result.humanized_text,
            credits_used: result.credits_used,
            remaining_credits: result.remaining_credits,
        }
    }
}

/// Acknowledgement for the push callback, in the shape Daraja expects.
#[derive(Debug, Clone, Serialize)]
pub struct PushCallbackAck {
    #[serde(rename = "ResultCode")]
    pub result_code: i32,
    #[serde(rename = "ResultDesc")]
    pub result_desc: &'static str,
    pub received: bool,
}

impl PushCallbackAck {
    pub fn accepted() -> Self {
        Self {
            result_code: 0,
            result_desc: "Callback received successfully",
            received: true,
        }
    }
}

/// Acknowledgement for the card webhook.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

/// Liveness check body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Standard error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional details (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(
        error_code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: Some(details),
        }
    }
}
