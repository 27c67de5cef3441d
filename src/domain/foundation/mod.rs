//! Foundation module - Shared domain primitives.
//!
//! Identifiers, timestamps, the status state machine trait, and the
//! authentication types used across the billing domain.

mod auth;
mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use auth::{AuthError, AuthenticatedUser};
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{PaymentAttemptId, TransactionId, UserId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
