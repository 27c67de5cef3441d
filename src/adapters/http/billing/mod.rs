//! HTTP adapter for billing endpoints.
//!
//! Exposes the ledger via REST API:
//! - `POST /payment-intents` - Start a plan purchase
//! - `POST /payment-callbacks/push` - M-Pesa STK callback
//! - `POST /payment-callbacks/webhook` - Stripe webhook
//! - `GET /payment-status/:transaction_id` - Status of one payment
//! - `GET /payments` - Payment history
//! - `POST /accounts` - Provision a free account
//! - `GET /account` - Plan and credit balance
//! - `POST /humanize` - Rewrite text for credits
//! - `GET /health` - Liveness

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::*;
pub use handlers::{BillingApiError, BillingAppState};
pub use routes::{account_routes, public_routes};
