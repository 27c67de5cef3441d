//! In-memory ledger implementation.
//!
//! Implements both `EntitlementRepository` and `PaymentAttemptRepository` on
//! a single state guarded by one `tokio::sync::Mutex`, so a settlement and its
//! grant are applied under the same lock the same way the database applies
//! them in one transaction.
//!
//! Does not persist data across restarts.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::domain::billing::{
    DebitOutcome, Entitlement, PaymentAttempt, PaymentChannel, PaymentStatus, SettlementRequest,
    SettlementResult,
};
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp, TransactionId, UserId};
use crate::ports::{EntitlementRepository, PaymentAttemptRepository};

#[derive(Default)]
struct LedgerState {
    entitlements: HashMap<UserId, Entitlement>,
    attempts: HashMap<TransactionId, PaymentAttempt>,
}

/// Entitlements and payment attempts held in process memory.
#[derive(Default)]
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current balance for a user, if provisioned.
    pub async fn balance_of(&self, user_id: &UserId) -> Option<i64> {
        self.state
            .lock()
            .await
            .entitlements
            .get(user_id)
            .map(|e| e.credits)
    }

    /// Replaces a user's entitlement outright.
    ///
    /// Useful for tests that need a specific starting balance.
    pub async fn put_entitlement(&self, entitlement: Entitlement) {
        self.state
            .lock()
            .await
            .entitlements
            .insert(entitlement.user_id.clone(), entitlement);
    }

    /// Number of recorded attempts across all users.
    pub async fn attempt_count(&self) -> usize {
        self.state.lock().await.attempts.len()
    }
}

#[async_trait]
impl EntitlementRepository for InMemoryLedger {
    async fn provision(
        &self,
        entitlement: &Entitlement,
    ) -> Result<(Entitlement, bool), DomainError> {
        let mut state = self.state.lock().await;
        if let Some(existing) = state.entitlements.get(&entitlement.user_id) {
            return Ok((existing.clone(), false));
        }
        state
            .entitlements
            .insert(entitlement.user_id.clone(), entitlement.clone());
        Ok((entitlement.clone(), true))
    }

    async fn find_by_user_id(&self, user_id: &UserId) -> Result<Option<Entitlement>, DomainError> {
        Ok(self.state.lock().await.entitlements.get(user_id).cloned())
    }

    async fn try_debit(&self, user_id: &UserId, cost: i64) -> Result<DebitOutcome, DomainError> {
        let mut state = self.state.lock().await;
        let Some(entitlement) = state.entitlements.get_mut(user_id) else {
            return Ok(DebitOutcome::AccountNotFound);
        };

        Ok(match entitlement.try_debit(cost, Timestamp::now()) {
            Some(remaining) => DebitOutcome::Debited {
                charged: cost,
                remaining,
            },
            None => DebitOutcome::Insufficient {
                required: cost,
                available: entitlement.credits,
            },
        })
    }

    async fn refund(&self, user_id: &UserId, credits: i64) -> Result<Option<i64>, DomainError> {
        let mut state = self.state.lock().await;
        Ok(state.entitlements.get_mut(user_id).map(|entitlement| {
            entitlement.refund(credits, Timestamp::now());
            entitlement.credits
        }))
    }
}

#[async_trait]
impl PaymentAttemptRepository for InMemoryLedger {
    async fn insert_pending(&self, attempt: &PaymentAttempt) -> Result<(), DomainError> {
        let mut state = self.state.lock().await;
        if state.attempts.contains_key(&attempt.transaction_id) {
            return Err(DomainError::new(
                ErrorCode::DuplicateTransaction,
                "Transaction id already recorded",
            )
            .with_detail("transaction_id", attempt.transaction_id.as_str()));
        }
        state
            .attempts
            .insert(attempt.transaction_id.clone(), attempt.clone());
        Ok(())
    }

    async fn find_by_transaction_id(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<Option<PaymentAttempt>, DomainError> {
        Ok(self.state.lock().await.attempts.get(transaction_id).cloned())
    }

    async fn find_for_user(
        &self,
        transaction_id: &TransactionId,
        user_id: &UserId,
    ) -> Result<Option<PaymentAttempt>, DomainError> {
        Ok(self
            .state
            .lock()
            .await
            .attempts
            .get(transaction_id)
            .filter(|attempt| attempt.is_owned_by(user_id))
            .cloned())
    }

    async fn list_for_user(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<PaymentAttempt>, DomainError> {
        let state = self.state.lock().await;
        let mut attempts: Vec<PaymentAttempt> = state
            .attempts
            .values()
            .filter(|attempt| attempt.is_owned_by(user_id))
            .cloned()
            .collect();
        attempts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        attempts.truncate(limit as usize);
        Ok(attempts)
    }

    async fn settle(&self, request: &SettlementRequest) -> Result<SettlementResult, DomainError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let now = Timestamp::now();

        let Some(attempt) = state.attempts.get_mut(&request.transaction_id) else {
            return Ok(SettlementResult::UnknownTransaction);
        };
        if attempt.status != PaymentStatus::Pending {
            return Ok(SettlementResult::AlreadySettled {
                status: attempt.status,
            });
        }

        attempt.settle(
            request.outcome.target_status(),
            request.raw_payload.clone(),
            now,
        )?;
        let attempt = attempt.clone();

        if attempt.status != PaymentStatus::Success {
            return Ok(SettlementResult::Settled {
                attempt,
                entitlement: None,
            });
        }

        Ok(match state.entitlements.get_mut(&attempt.user_id) {
            Some(entitlement) => {
                entitlement.apply_grant(attempt.grant_tier, attempt.credit_grant, now);
                SettlementResult::Settled {
                    entitlement: Some(entitlement.clone()),
                    attempt,
                }
            }
            None => SettlementResult::EntitlementMissing { attempt },
        })
    }

    async fn list_stale_pending(
        &self,
        channel: PaymentChannel,
        cutoff: Timestamp,
        limit: u32,
    ) -> Result<Vec<PaymentAttempt>, DomainError> {
        let state = self.state.lock().await;
        let mut stale: Vec<PaymentAttempt> = state
            .attempts
            .values()
            .filter(|attempt| attempt.channel == channel && attempt.is_stale(&cutoff))
            .cloned()
            .collect();
        stale.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        stale.truncate(limit as usize);
        Ok(stale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::{sample_attempt, PlanTier, SettlementOutcome};
    use serde_json::json;
    use std::sync::Arc;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    fn tx(id: &str) -> TransactionId {
        TransactionId::new(id).unwrap()
    }

    async fn ledger_with_user(id: &str) -> InMemoryLedger {
        let ledger = InMemoryLedger::new();
        ledger
            .provision(&Entitlement::new_free(user(id), Timestamp::now()))
            .await
            .unwrap();
        ledger
    }

    fn settlement(id: &str, outcome: SettlementOutcome) -> SettlementRequest {
        SettlementRequest {
            transaction_id: tx(id),
            outcome,
            raw_payload: json!({"id": id}),
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Entitlements
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn provision_is_idempotent() {
        let ledger = ledger_with_user("user-1").await;
        ledger.try_debit(&user("user-1"), 4).await.unwrap();

        let (stored, created) = ledger
            .provision(&Entitlement::new_free(user("user-1"), Timestamp::now()))
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(stored.credits, 6);
    }

    #[tokio::test]
    async fn debit_reports_shortfall_without_touching_balance() {
        let ledger = ledger_with_user("user-1").await;
        let outcome = ledger.try_debit(&user("user-1"), 11).await.unwrap();
        assert_eq!(
            outcome,
            DebitOutcome::Insufficient {
                required: 11,
                available: 10
            }
        );
        assert_eq!(ledger.balance_of(&user("user-1")).await, Some(10));
    }

    #[tokio::test]
    async fn debit_for_missing_account() {
        let ledger = InMemoryLedger::new();
        let outcome = ledger.try_debit(&user("ghost"), 1).await.unwrap();
        assert_eq!(outcome, DebitOutcome::AccountNotFound);
    }

    #[tokio::test]
    async fn concurrent_debits_never_overdraw() {
        let ledger = Arc::new(ledger_with_user("user-1").await);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = ledger.clone();
                tokio::spawn(async move { ledger.try_debit(&user("user-1"), 3).await.unwrap() })
            })
            .collect();

        let mut debited = 0;
        for handle in handles {
            if matches!(handle.await.unwrap(), DebitOutcome::Debited { .. }) {
                debited += 1;
            }
        }
        assert_eq!(debited, 3);
        assert_eq!(ledger.balance_of(&user("user-1")).await, Some(1));
    }

    // ══════════════════════════════════════════════════════════════
    // Attempts
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn duplicate_transaction_id_is_rejected() {
        let ledger = InMemoryLedger::new();
        let attempt = PaymentAttempt::pending(sample_attempt("ws_1", "user-1"), Timestamp::now());
        ledger.insert_pending(&attempt).await.unwrap();

        let err = ledger.insert_pending(&attempt).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::DuplicateTransaction);
        assert_eq!(ledger.attempt_count().await, 1);
    }

    #[tokio::test]
    async fn scoped_lookup_hides_other_users_attempts() {
        let ledger = InMemoryLedger::new();
        let attempt = PaymentAttempt::pending(sample_attempt("ws_1", "user-a"), Timestamp::now());
        ledger.insert_pending(&attempt).await.unwrap();

        assert!(ledger
            .find_for_user(&tx("ws_1"), &user("user-a"))
            .await
            .unwrap()
            .is_some());
        assert!(ledger
            .find_for_user(&tx("ws_1"), &user("user-b"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn listing_is_newest_first_and_limited() {
        let ledger = InMemoryLedger::new();
        for (id, age) in [("ws_old", 300), ("ws_mid", 200), ("ws_new", 100)] {
            let attempt = PaymentAttempt::pending(
                sample_attempt(id, "user-1"),
                Timestamp::now().minus_secs(age),
            );
            ledger.insert_pending(&attempt).await.unwrap();
        }

        let listed = ledger.list_for_user(&user("user-1"), 2).await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|a| a.transaction_id.as_str()).collect();
        assert_eq!(ids, vec!["ws_new", "ws_mid"]);
    }

    // ══════════════════════════════════════════════════════════════
    // Settlement
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn success_grants_tier_and_credits_once() {
        let ledger = ledger_with_user("user-1").await;
        let attempt = PaymentAttempt::pending(sample_attempt("ws_1", "user-1"), Timestamp::now());
        ledger.insert_pending(&attempt).await.unwrap();

        let first = ledger
            .settle(&settlement("ws_1", SettlementOutcome::Succeeded))
            .await
            .unwrap();
        assert_eq!(first.credited(), Some(1000));
        match &first {
            SettlementResult::Settled {
                entitlement: Some(e),
                ..
            } => {
                assert_eq!(e.plan, PlanTier::Premium);
                assert_eq!(e.credits, 1010);
            }
            other => panic!("expected settled with grant, got {:?}", other),
        }

        let second = ledger
            .settle(&settlement("ws_1", SettlementOutcome::Succeeded))
            .await
            .unwrap();
        assert_eq!(
            second,
            SettlementResult::AlreadySettled {
                status: PaymentStatus::Success
            }
        );
        assert_eq!(ledger.balance_of(&user("user-1")).await, Some(1010));
    }

    #[tokio::test]
    async fn failure_settles_without_grant() {
        let ledger = ledger_with_user("user-1").await;
        let attempt = PaymentAttempt::pending(sample_attempt("ws_1", "user-1"), Timestamp::now());
        ledger.insert_pending(&attempt).await.unwrap();

        let result = ledger
            .settle(&settlement("ws_1", SettlementOutcome::Failed))
            .await
            .unwrap();
        assert!(result.mutated());
        assert_eq!(result.credited(), None);
        assert_eq!(ledger.balance_of(&user("user-1")).await, Some(10));

        let late_success = ledger
            .settle(&settlement("ws_1", SettlementOutcome::Succeeded))
            .await
            .unwrap();
        assert!(!late_success.mutated());
        assert_eq!(ledger.balance_of(&user("user-1")).await, Some(10));
    }

    #[tokio::test]
    async fn unknown_transaction_changes_nothing() {
        let ledger = ledger_with_user("user-1").await;
        let result = ledger
            .settle(&settlement("ws_missing", SettlementOutcome::Succeeded))
            .await
            .unwrap();
        assert_eq!(result, SettlementResult::UnknownTransaction);
        assert_eq!(ledger.balance_of(&user("user-1")).await, Some(10));
    }

    #[tokio::test]
    async fn missing_entitlement_still_settles_attempt() {
        let ledger = InMemoryLedger::new();
        let attempt = PaymentAttempt::pending(sample_attempt("ws_1", "ghost"), Timestamp::now());
        ledger.insert_pending(&attempt).await.unwrap();

        let result = ledger
            .settle(&settlement("ws_1", SettlementOutcome::Succeeded))
            .await
            .unwrap();
        assert!(matches!(result, SettlementResult::EntitlementMissing { .. }));

        let stored = ledger.find_by_transaction_id(&tx("ws_1")).await.unwrap().unwrap();
        assert_eq!(stored.status, PaymentStatus::Success);
    }

    #[tokio::test]
    async fn concurrent_success_callbacks_grant_once() {
        let ledger = Arc::new(ledger_with_user("user-1").await);
        let attempt = PaymentAttempt::pending(sample_attempt("ws_1", "user-1"), Timestamp::now());
        ledger.insert_pending(&attempt).await.unwrap();

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let ledger = ledger.clone();
                tokio::spawn(async move {
                    ledger
                        .settle(&settlement("ws_1", SettlementOutcome::Succeeded))
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut mutated = 0;
        for handle in handles {
            if handle.await.unwrap().mutated() {
                mutated += 1;
            }
        }
        assert_eq!(mutated, 1);
        assert_eq!(ledger.balance_of(&user("user-1")).await, Some(1010));
    }

    #[tokio::test]
    async fn stale_listing_ignores_fresh_and_settled() {
        let ledger = InMemoryLedger::new();
        let old = Timestamp::now().minus_secs(3600);
        ledger
            .insert_pending(&PaymentAttempt::pending(sample_attempt("ws_stale", "u"), old))
            .await
            .unwrap();
        ledger
            .insert_pending(&PaymentAttempt::pending(sample_attempt("ws_done", "u"), old))
            .await
            .unwrap();
        ledger
            .insert_pending(&PaymentAttempt::pending(
                sample_attempt("ws_fresh", "u"),
                Timestamp::now(),
            ))
            .await
            .unwrap();
        ledger
            .settle(&settlement("ws_done", SettlementOutcome::Failed))
            .await
            .unwrap();

        let cutoff = Timestamp::now().minus_secs(900);
        let stale = ledger
            .list_stale_pending(PaymentChannel::Mpesa, cutoff, 10)
            .await
            .unwrap();
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].transaction_id.as_str(), "ws_stale");
    }
}
