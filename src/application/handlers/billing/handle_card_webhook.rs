//! HandleCardWebhookHandler - Command handler for Stripe checkout webhooks.
//!
//! Verifies the signature over the raw body, maps the event onto a ledger
//! action, and settles the attempt keyed by the checkout session id.

use std::sync::Arc;

use crate::domain::billing::{BillingError, CardEventAction, PaymentChannel, VerifiedEvent};
use crate::domain::foundation::TransactionId;
use crate::ports::{CardPaymentProvider, PaymentAttemptRepository};

use super::reconcile::{apply_settlement, CallbackOutcome};

/// Command carrying one webhook delivery.
#[derive(Debug, Clone)]
pub struct HandleCardWebhookCommand {
    /// Raw request body, exactly as received.
    pub payload: Vec<u8>,
    /// `Stripe-Signature` header value.
    pub signature: Option<String>,
}

/// Handler for card channel settlement webhooks.
pub struct HandleCardWebhookHandler {
    attempts: Arc<dyn PaymentAttemptRepository>,
    card_provider: Arc<dyn CardPaymentProvider>,
}

impl HandleCardWebhookHandler {
    pub fn new(
        attempts: Arc<dyn PaymentAttemptRepository>,
        card_provider: Arc<dyn CardPaymentProvider>,
    ) -> Self {
        Self {
            attempts,
            card_provider,
        }
    }

    pub async fn handle(
        &self,
        cmd: HandleCardWebhookCommand,
    ) -> Result<CallbackOutcome, BillingError> {
        let signature = cmd.signature.as_deref().ok_or_else(|| {
            tracing::warn!("Card webhook without Stripe-Signature header");
            BillingError::SignatureInvalid("Missing Stripe-Signature header".to_string())
        })?;

        let VerifiedEvent { event, raw } = self
            .card_provider
            .verify_webhook(&cmd.payload, signature)
            .map_err(|e| {
                if e.is_authentication_failure() {
                    tracing::warn!(error = %e, "Card webhook failed verification");
                } else {
                    tracing::warn!(error = %e, "Card webhook body could not be parsed");
                }
                BillingError::from(e)
            })?;

        tracing::debug!(
            event_id = %event.id,
            event_type = %event.event_type,
            livemode = event.livemode,
            "Card webhook verified"
        );

        match event.card_action(raw)? {
            CardEventAction::Ignore { reason } => {
                tracing::info!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    reason = reason,
                    "Card webhook ignored"
                );
                Ok(CallbackOutcome::Ignored { reason })
            }
            CardEventAction::Settle {
                request,
                client_reference_id,
            } => {
                if let Some(reference) = client_reference_id.as_deref() {
                    self.check_reference(&request.transaction_id, reference).await;
                }
                apply_settlement(self.attempts.as_ref(), request, PaymentChannel::Card).await
            }
        }
    }

    /// Logs when the session names a different user than the stored attempt.
    /// The attempt's owner is authoritative either way.
    async fn check_reference(&self, transaction_id: &TransactionId, reference: &str) {
        match self.attempts.find_by_transaction_id(transaction_id).await {
            Ok(Some(attempt)) if attempt.user_id.as_str() != reference => {
                tracing::error!(
                    anomaly = "client_reference_mismatch",
                    transaction_id = %transaction_id,
                    attempt_user_id = %attempt.user_id,
                    client_reference_id = reference,
                    "Checkout session references a different user than its attempt"
                );
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(
                    transaction_id = %transaction_id,
                    error = %e,
                    "Reference check lookup failed"
                );
            }
        }
    }
}
