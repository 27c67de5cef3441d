//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Ledger Ports
//!
//! - `EntitlementRepository` - Plan tier and credit balance per user
//! - `PaymentAttemptRepository` - Pending/settled attempts and the settlement CAS
//!
//! ## Provider Ports
//!
//! - `PushPaymentProvider` - Mobile-money STK push
//! - `CardPaymentProvider` - Hosted card checkout and webhook verification
//! - `TextRewriter` - Language model behind the humanize endpoint
//! - `SessionValidator` - Bearer token verification

mod entitlement_repository;
mod payment_attempt_repository;
mod payment_provider;
mod session_validator;
mod text_rewriter;

pub use entitlement_repository::EntitlementRepository;
pub use payment_attempt_repository::PaymentAttemptRepository;
pub use payment_provider::{
    CardPaymentProvider, CheckoutRequest, CheckoutSession, PaymentError, PaymentErrorCode,
    PushPaymentAccepted, PushPaymentProvider, PushPaymentRequest,
};
pub use session_validator::SessionValidator;
pub use text_rewriter::{RewriteError, RewriteRequest, TextRewriter};
