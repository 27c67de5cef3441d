//! Entitlement repository port.
//!
//! Owns the per-user plan tier and credit balance. Every balance change goes
//! through a single conditional statement at the store so concurrent requests
//! for the same user cannot interleave a read and a write.

use async_trait::async_trait;

use crate::domain::billing::{DebitOutcome, Entitlement};
use crate::domain::foundation::{DomainError, UserId};

#[async_trait]
pub trait EntitlementRepository: Send + Sync {
    /// Inserts `entitlement` unless the user already has one.
    ///
    /// Returns the stored record and whether this call created it.
    async fn provision(&self, entitlement: &Entitlement) -> Result<(Entitlement, bool), DomainError>;

    /// Find the entitlement for a user.
    async fn find_by_user_id(&self, user_id: &UserId) -> Result<Option<Entitlement>, DomainError>;

    /// Atomically decrements the balance by `cost` if it covers it.
    ///
    /// Two concurrent calls whose combined cost exceeds the balance never
    /// both return `Debited`.
    async fn try_debit(&self, user_id: &UserId, cost: i64) -> Result<DebitOutcome, DomainError>;

    /// Adds back credits taken by a debit whose action failed.
    ///
    /// Returns the new balance, or `None` if the user has no entitlement.
    async fn refund(&self, user_id: &UserId, credits: i64) -> Result<Option<i64>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entitlement_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn EntitlementRepository) {}
    }
}
