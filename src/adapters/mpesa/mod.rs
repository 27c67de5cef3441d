//! M-Pesa (Daraja) push payment adapter.
//!
//! Implements the `PushPaymentProvider` port with Lipa na M-Pesa Online
//! (STK push). Credentials and the passkey are held as
//! `secrecy::SecretString`.

mod daraja_adapter;
mod mock_push_provider;

pub use daraja_adapter::{DarajaConfig, DarajaPushAdapter};
pub use mock_push_provider::MockPushProvider;
