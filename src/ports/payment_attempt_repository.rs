//! Payment attempt repository port.
//!
//! Attempts are keyed by the provider transaction id (unique). Settlement is
//! a compare-and-swap on the attempt still being `pending`, performed in the
//! same transaction as the entitlement grant, so each attempt pays out at
//! most once however many callbacks arrive.

use async_trait::async_trait;

use crate::domain::billing::{PaymentAttempt, PaymentChannel, SettlementRequest, SettlementResult};
use crate::domain::foundation::{DomainError, Timestamp, TransactionId, UserId};

#[async_trait]
pub trait PaymentAttemptRepository: Send + Sync {
    /// Records a new pending attempt.
    ///
    /// # Errors
    ///
    /// - `DuplicateTransaction` if the transaction id already exists
    /// - `DatabaseError` on persistence failure
    async fn insert_pending(&self, attempt: &PaymentAttempt) -> Result<(), DomainError>;

    /// Unscoped lookup, used by the reconciler.
    async fn find_by_transaction_id(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<Option<PaymentAttempt>, DomainError>;

    /// Lookup restricted to attempts owned by `user_id`.
    ///
    /// Another user's attempt is reported as `None`, same as a missing one.
    async fn find_for_user(
        &self,
        transaction_id: &TransactionId,
        user_id: &UserId,
    ) -> Result<Option<PaymentAttempt>, DomainError>;

    /// A user's attempts, newest first.
    async fn list_for_user(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<PaymentAttempt>, DomainError>;

    /// Applies a settlement.
    ///
    /// If the attempt is pending: store the raw payload, set the terminal
    /// status, and on success move the owner to the attempt's plan tier and
    /// add its credit grant, all in one transaction. Terminal or unknown
    /// attempts are left untouched and reported as such.
    async fn settle(&self, request: &SettlementRequest) -> Result<SettlementResult, DomainError>;

    /// Pending attempts on `channel` created before `cutoff`, oldest first.
    async fn list_stale_pending(
        &self,
        channel: PaymentChannel,
        cutoff: Timestamp,
        limit: u32,
    ) -> Result<Vec<PaymentAttempt>, DomainError>;
}
