//! Billing handlers.
//!
//! Command and query handlers for the credit ledger and payment settlement:
//!
//! ## Commands
//! - Starting a push or card payment
//! - Settling push callbacks and card webhooks
//! - Debiting credits for a rewrite
//! - Provisioning an account
//! - Expiring stale pending payments
//!
//! ## Queries
//! - Payment status (scoped to the requester)
//! - Payment history
//! - Account plan and balance

mod expire_stale_payments;
mod get_account;
mod get_payment_status;
mod handle_card_webhook;
mod handle_push_callback;
mod humanize_text;
mod initiate_payment;
mod list_payments;
mod provision_account;
mod reconcile;

// Commands
pub use expire_stale_payments::{ExpireStalePaymentsHandler, ExpireStalePaymentsResult};
pub use handle_card_webhook::{HandleCardWebhookCommand, HandleCardWebhookHandler};
pub use handle_push_callback::{HandlePushCallbackCommand, HandlePushCallbackHandler};
pub use humanize_text::{HumanizeTextCommand, HumanizeTextHandler, HumanizeTextResult};
pub use initiate_payment::{
    InitiatePaymentCommand, InitiatePaymentHandler, InitiatePaymentResult, PaymentMethod,
};
pub use provision_account::{
    ProvisionAccountCommand, ProvisionAccountHandler, ProvisionAccountResult,
};
pub use reconcile::CallbackOutcome;

// Queries
pub use get_account::{GetAccountHandler, GetAccountQuery};
pub use get_payment_status::{GetPaymentStatusHandler, GetPaymentStatusQuery};
pub use list_payments::{ListPaymentsHandler, ListPaymentsQuery};
