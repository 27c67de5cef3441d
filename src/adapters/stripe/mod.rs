//! Stripe card checkout adapter.
//!
//! Implements the `CardPaymentProvider` port for Stripe, including:
//! - Hosted checkout sessions
//! - Webhook signature verification
//!
//! # Security
//!
//! - Webhook signatures use HMAC-SHA256 with constant-time comparison
//! - Timestamps are validated to prevent replay attacks (5-minute window)
//! - All secrets are handled via `secrecy::SecretString`

mod mock_payment_provider;
mod stripe_adapter;

pub use mock_payment_provider::MockCardProvider;
pub use stripe_adapter::{StripeCheckoutAdapter, StripeConfig};
