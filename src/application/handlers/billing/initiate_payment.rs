//! InitiatePaymentHandler - Command handler for starting a plan purchase.
//!
//! The provider's acceptance is the commit point: a `pending` attempt is
//! recorded only after the provider hands back its tracking id, and a
//! provider failure leaves nothing behind.

use std::sync::Arc;

use crate::domain::billing::{
    BillingError, NewPaymentAttempt, PaymentAttempt, PaymentChannel, PaymentStatus, PhoneNumber,
    Plan, PlanCatalog,
};
use crate::domain::foundation::{AuthenticatedUser, ErrorCode, Timestamp, TransactionId};
use crate::ports::{
    CardPaymentProvider, CheckoutRequest, PaymentAttemptRepository, PaymentError,
    PushPaymentProvider, PushPaymentRequest,
};

/// How the caller wants to pay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentMethod {
    /// M-Pesa STK push to this number (any accepted local format).
    Push { phone_number: String },
    /// Hosted card checkout.
    Card,
}

/// Command to start a payment.
#[derive(Debug, Clone)]
pub struct InitiatePaymentCommand {
    pub user: AuthenticatedUser,
    pub plan_id: String,
    pub method: PaymentMethod,
}

/// Result of a started payment.
#[derive(Debug, Clone)]
pub struct InitiatePaymentResult {
    /// Id the client polls with.
    pub transaction_id: TransactionId,
    pub channel: PaymentChannel,
    pub status: PaymentStatus,
    /// Hosted checkout page (card only).
    pub checkout_url: Option<String>,
    /// Prompt text from the push provider.
    pub customer_message: Option<String>,
}

/// Handler for starting push and card payments.
pub struct InitiatePaymentHandler {
    attempts: Arc<dyn PaymentAttemptRepository>,
    push_provider: Arc<dyn PushPaymentProvider>,
    card_provider: Arc<dyn CardPaymentProvider>,
    catalog: Arc<PlanCatalog>,
}

impl InitiatePaymentHandler {
    pub fn new(
        attempts: Arc<dyn PaymentAttemptRepository>,
        push_provider: Arc<dyn PushPaymentProvider>,
        card_provider: Arc<dyn CardPaymentProvider>,
        catalog: Arc<PlanCatalog>,
    ) -> Self {
        Self {
            attempts,
            push_provider,
            card_provider,
            catalog,
        }
    }

    pub async fn handle(
        &self,
        cmd: InitiatePaymentCommand,
    ) -> Result<InitiatePaymentResult, BillingError> {
        let plan = self.catalog.require(&cmd.plan_id)?.clone();

        match cmd.method {
            PaymentMethod::Push { phone_number } => {
                let phone = PhoneNumber::parse(&phone_number)?;
                self.initiate_push(cmd.user, plan, phone).await
            }
            PaymentMethod::Card => self.initiate_card(cmd.user, plan).await,
        }
    }

    async fn initiate_push(
        &self,
        user: AuthenticatedUser,
        plan: Plan,
        phone: PhoneNumber,
    ) -> Result<InitiatePaymentResult, BillingError> {
        let request = PushPaymentRequest {
            user_id: user.id.clone(),
            plan_id: plan.id.clone(),
            phone_number: phone.clone(),
            amount: plan.push_amount,
            description: format!("Payment for Humanizer {} plan", plan.tier),
        };

        let accepted = self
            .push_provider
            .initiate_push(request)
            .await
            .map_err(|e| provider_failure(&user, PaymentChannel::Mpesa, e))?;

        let attempt = PaymentAttempt::pending(
            NewPaymentAttempt {
                transaction_id: accepted.transaction_id.clone(),
                user_id: user.id.clone(),
                plan_id: plan.id.clone(),
                channel: PaymentChannel::Mpesa,
                amount: plan.push_amount,
                grant_tier: plan.tier,
                credit_grant: plan.credit_grant,
                phone_number: Some(phone.into_string()),
            },
            Timestamp::now(),
        );
        self.record(&attempt).await?;

        Ok(InitiatePaymentResult {
            transaction_id: attempt.transaction_id,
            channel: PaymentChannel::Mpesa,
            status: PaymentStatus::Pending,
            checkout_url: None,
            customer_message: accepted.customer_message,
        })
    }

    async fn initiate_card(
        &self,
        user: AuthenticatedUser,
        plan: Plan,
    ) -> Result<InitiatePaymentResult, BillingError> {
        let price_id = plan.card_price_id.clone().ok_or_else(|| {
            BillingError::invalid_request("plan_id", "plan is not offered on the card channel")
        })?;

        let session = self
            .card_provider
            .create_checkout_session(CheckoutRequest {
                user_id: user.id.clone(),
                plan_id: plan.id.clone(),
                price_id,
                customer_email: user.email.clone(),
            })
            .await
            .map_err(|e| provider_failure(&user, PaymentChannel::Card, e))?;

        let attempt = PaymentAttempt::pending(
            NewPaymentAttempt {
                transaction_id: session.id.clone(),
                user_id: user.id.clone(),
                plan_id: plan.id.clone(),
                channel: PaymentChannel::Card,
                // Card prices live with the provider.
                amount: 0,
                grant_tier: plan.tier,
                credit_grant: plan.credit_grant,
                phone_number: None,
            },
            Timestamp::now(),
        );
        self.record(&attempt).await?;

        Ok(InitiatePaymentResult {
            transaction_id: attempt.transaction_id,
            channel: PaymentChannel::Card,
            status: PaymentStatus::Pending,
            checkout_url: session.url,
            customer_message: None,
        })
    }

    async fn record(&self, attempt: &PaymentAttempt) -> Result<(), BillingError> {
        self.attempts.insert_pending(attempt).await.map_err(|e| {
            let anomaly = if e.code == ErrorCode::DuplicateTransaction {
                "duplicate_transaction_id"
            } else {
                "unrecorded_provider_transaction"
            };
            tracing::error!(
                anomaly = anomaly,
                transaction_id = %attempt.transaction_id,
                user_id = %attempt.user_id,
                channel = %attempt.channel,
                error = %e,
                "Provider accepted a payment that could not be recorded"
            );
            BillingError::infrastructure(e.to_string())
        })?;

        tracing::info!(
            transaction_id = %attempt.transaction_id,
            user_id = %attempt.user_id,
            channel = %attempt.channel,
            plan_id = %attempt.plan_id,
            "Payment initiated"
        );
        Ok(())
    }
}

fn provider_failure(
    user: &AuthenticatedUser,
    channel: PaymentChannel,
    error: PaymentError,
) -> BillingError {
    tracing::warn!(
        user_id = %user.id,
        channel = %channel,
        code = %error.code,
        provider_code = ?error.provider_code,
        "Payment provider call failed"
    );
    BillingError::provider_unavailable(error.message)
}
