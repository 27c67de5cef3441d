//! Billing domain - credit ledger and payment settlement.
//!
//! Holds the entitlement (plan tier + credit balance), payment attempts with
//! their monotonic status machine, the credit pricing rule, and the parsing
//! and authentication of provider callbacks.

mod credit;
mod entitlement;
mod errors;
mod mpesa_callback;
mod payment;
mod phone;
mod plan;
mod settlement;
mod stripe_event;
mod webhook_errors;
mod webhook_verifier;

pub use credit::{cost_for_words, credit_cost, word_count, DebitOutcome, WORDS_PER_CREDIT};
pub use entitlement::{Entitlement, STARTING_CREDITS};
pub use errors::BillingError;
pub use mpesa_callback::{PushCallback, StkCallback};
pub use payment::{NewPaymentAttempt, PaymentAttempt, PaymentChannel, PaymentStatus};
pub use phone::PhoneNumber;
pub use plan::{Plan, PlanCatalog, PlanTier};
pub use settlement::{SettlementOutcome, SettlementRequest, SettlementResult};
pub use stripe_event::{
    CardEventAction, CheckoutSessionObject, StripeEvent, StripeEventType, VerifiedEvent,
};
pub use webhook_errors::WebhookError;
pub use webhook_verifier::{verify_callback_token, SignatureHeader, StripeWebhookVerifier};

#[cfg(test)]
pub(crate) use mpesa_callback::{cancelled_callback, success_callback};
#[cfg(test)]
pub(crate) use payment::sample_attempt;
#[cfg(test)]
pub use stripe_event::StripeEventBuilder;
#[cfg(test)]
pub use webhook_verifier::compute_test_signature;
