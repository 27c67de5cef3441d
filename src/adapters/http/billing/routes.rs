//! Axum router configuration for billing endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    card_webhook, create_payment_intent, get_account, get_payment_status, health, humanize,
    list_payments, provision_account, push_callback, BillingAppState,
};

/// Routes that act on behalf of a signed-in user.
///
/// # Routes
/// - `POST /payment-intents` - Start an M-Pesa push or Stripe checkout
/// - `GET /payment-status/:transaction_id` - Status of one of the caller's payments
/// - `GET /payments` - Caller's payment history
/// - `POST /accounts` - Provision the caller's free account
/// - `GET /account` - Caller's plan and credits
/// - `POST /humanize` - Debit credits and rewrite text
pub fn account_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/payment-intents", post(create_payment_intent))
        .route("/payment-status/:transaction_id", get(get_payment_status))
        .route("/payments", get(list_payments))
        .route("/accounts", post(provision_account))
        .route("/account", get(get_account))
        .route("/humanize", post(humanize))
}

/// Provider callbacks and the liveness check.
///
/// Callbacks carry no bearer token. The push callback is checked against
/// the shared token in its query string, the webhook against its signature.
///
/// # Routes
/// - `POST /payment-callbacks/push` - M-Pesa STK result
/// - `POST /payment-callbacks/webhook` - Stripe events
/// - `GET /health`
pub fn public_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/payment-callbacks/push", post(push_callback))
        .route("/payment-callbacks/webhook", post(card_webhook))
        .route("/health", get(health))
}
