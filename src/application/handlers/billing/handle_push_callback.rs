//! HandlePushCallbackHandler - Command handler for M-Pesa STK callbacks.
//!
//! The callback URL carries a shared token; a request without the right token
//! is refused before the body is looked at.

use std::sync::Arc;

use crate::domain::billing::{verify_callback_token, BillingError, PaymentChannel, PushCallback};
use crate::ports::PaymentAttemptRepository;

use super::reconcile::{apply_settlement, CallbackOutcome};

/// Command carrying one push callback delivery.
#[derive(Debug, Clone)]
pub struct HandlePushCallbackCommand {
    /// `token` query parameter of the callback request.
    pub token: Option<String>,
    /// Request body exactly as delivered; parsed only once the token checks out.
    pub payload: Vec<u8>,
}

/// Handler for push channel settlement callbacks.
pub struct HandlePushCallbackHandler {
    attempts: Arc<dyn PaymentAttemptRepository>,
    callback_token: String,
}

impl HandlePushCallbackHandler {
    pub fn new(attempts: Arc<dyn PaymentAttemptRepository>, callback_token: String) -> Self {
        Self {
            attempts,
            callback_token,
        }
    }

    pub async fn handle(
        &self,
        cmd: HandlePushCallbackCommand,
    ) -> Result<CallbackOutcome, BillingError> {
        verify_callback_token(&self.callback_token, cmd.token.as_deref()).map_err(|e| {
            tracing::warn!(
                token_present = cmd.token.is_some(),
                "Rejected push callback with invalid token"
            );
            BillingError::from(e)
        })?;

        let callback = PushCallback::from_slice(&cmd.payload).map_err(|e| {
            tracing::warn!(error = %e, "Malformed push callback body");
            BillingError::from(e)
        })?;

        tracing::debug!(
            checkout_request_id = %callback.callback.checkout_request_id,
            result_code = callback.callback.result_code,
            receipt = ?callback.receipt_number(),
            amount = ?callback.amount_paid(),
            "Push callback received"
        );

        let request = callback.into_settlement()?;
        apply_settlement(self.attempts.as_ref(), request, PaymentChannel::Mpesa).await
    }
}
