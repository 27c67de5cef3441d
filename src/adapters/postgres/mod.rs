//! PostgreSQL adapters - Database implementations for the ledger ports.
//!
//! - `PostgresEntitlementRepository` - Plan tier and credit balance
//! - `PostgresPaymentAttemptRepository` - Attempts and transactional settlement

mod entitlement_repository;
mod payment_attempt_repository;

pub use entitlement_repository::PostgresEntitlementRepository;
pub use payment_attempt_repository::PostgresPaymentAttemptRepository;
