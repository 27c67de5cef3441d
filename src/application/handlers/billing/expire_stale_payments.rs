//! ExpireStalePaymentsHandler - Sweep for push attempts whose callback never came.
//!
//! A push prompt the payer ignores may never produce a callback. M-Pesa
//! attempts left `pending` past the configured lifetime are failed through
//! the same compare-and-swap as a provider callback, so a late success
//! callback that wins the race still applies and one that loses is treated
//! as a duplicate.
//!
//! Card attempts are never swept. A checkout session stays payable for up to
//! a day and delayed methods settle later still; Stripe reports the end of
//! the session with `checkout.session.expired`, which fails the attempt.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::billing::{
    BillingError, PaymentChannel, SettlementOutcome, SettlementRequest, SettlementResult,
};
use crate::domain::foundation::Timestamp;
use crate::ports::PaymentAttemptRepository;

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpireStalePaymentsResult {
    /// Attempts this sweep moved to `failed`.
    pub expired: usize,
    /// Attempts that settled through another path while the sweep ran.
    pub skipped: usize,
}

pub struct ExpireStalePaymentsHandler {
    attempts: Arc<dyn PaymentAttemptRepository>,
    pending_ttl: Duration,
    batch_size: u32,
}

impl ExpireStalePaymentsHandler {
    pub fn new(
        attempts: Arc<dyn PaymentAttemptRepository>,
        pending_ttl: Duration,
        batch_size: u32,
    ) -> Self {
        Self {
            attempts,
            pending_ttl,
            batch_size,
        }
    }

    pub async fn handle(&self, now: Timestamp) -> Result<ExpireStalePaymentsResult, BillingError> {
        let cutoff = now.minus_secs(self.pending_ttl.as_secs());
        let stale = self
            .attempts
            .list_stale_pending(PaymentChannel::Mpesa, cutoff, self.batch_size)
            .await?;

        let mut result = ExpireStalePaymentsResult::default();
        for attempt in stale {
            let request = SettlementRequest {
                transaction_id: attempt.transaction_id.clone(),
                outcome: SettlementOutcome::Failed,
                raw_payload: serde_json::json!({
                    "reason": "expired",
                    "pending_since": attempt.created_at.as_datetime().to_rfc3339(),
                    "expired_at": now.as_datetime().to_rfc3339(),
                }),
            };

            match self.attempts.settle(&request).await? {
                SettlementResult::Settled { .. } => {
                    tracing::info!(
                        transaction_id = %attempt.transaction_id,
                        user_id = %attempt.user_id,
                        channel = %attempt.channel,
                        "Stale pending payment expired"
                    );
                    result.expired += 1;
                }
                _ => result.skipped += 1,
            }
        }

        if result.expired > 0 {
            tracing::info!(
                expired = result.expired,
                skipped = result.skipped,
                "Stale payment sweep finished"
            );
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryLedger;
    use crate::config::PaymentConfig;
    use crate::domain::billing::{
        sample_attempt, Entitlement, PaymentAttempt, PaymentStatus, SettlementResult,
    };
    use crate::domain::foundation::{TransactionId, UserId};
    use crate::ports::EntitlementRepository;

    async fn seeded() -> (Arc<InMemoryLedger>, Timestamp) {
        let ledger = Arc::new(InMemoryLedger::new());
        let now = Timestamp::now();
        ledger
            .provision(&Entitlement::new_free(UserId::new("user-1").unwrap(), now))
            .await
            .unwrap();
        for (tx, age) in [("old", 7200), ("fresh", 60)] {
            ledger
                .insert_pending(&PaymentAttempt::pending(
                    sample_attempt(tx, "user-1"),
                    now.minus_secs(age),
                ))
                .await
                .unwrap();
        }
        (ledger, now)
    }

    async fn status_of(ledger: &InMemoryLedger, tx: &str) -> PaymentStatus {
        ledger
            .find_by_transaction_id(&TransactionId::new(tx).unwrap())
            .await
            .unwrap()
            .unwrap()
            .status
    }

    #[tokio::test]
    async fn expires_only_attempts_past_ttl() {
        let (ledger, now) = seeded().await;
        let handler = ExpireStalePaymentsHandler::new(ledger.clone(), Duration::from_secs(3600), 50);

        let result = handler.handle(now).await.unwrap();

        assert_eq!(result.expired, 1);
        assert_eq!(status_of(&ledger, "old").await, PaymentStatus::Failed);
        assert_eq!(status_of(&ledger, "fresh").await, PaymentStatus::Pending);
        assert_eq!(ledger.balance_of(&UserId::new("user-1").unwrap()).await, Some(10));
    }

    #[tokio::test]
    async fn expired_attempt_records_reason() {
        let (ledger, now) = seeded().await;
        ExpireStalePaymentsHandler::new(ledger.clone(), Duration::from_secs(3600), 50)
            .handle(now)
            .await
            .unwrap();

        let attempt = ledger
            .find_by_transaction_id(&TransactionId::new("old").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(attempt.raw_response.unwrap()["reason"], "expired");
    }

    #[tokio::test]
    async fn second_sweep_finds_nothing() {
        let (ledger, now) = seeded().await;
        let handler = ExpireStalePaymentsHandler::new(ledger, Duration::from_secs(3600), 50);

        handler.handle(now).await.unwrap();
        let again = handler.handle(now).await.unwrap();
        assert_eq!(again, ExpireStalePaymentsResult::default());
    }

    #[tokio::test]
    async fn card_attempt_survives_sweep_and_settles_late() {
        let (ledger, now) = seeded().await;
        let mut card = sample_attempt("cs_test_late", "user-1");
        card.channel = PaymentChannel::Card;
        card.phone_number = None;
        ledger
            .insert_pending(&PaymentAttempt::pending(card, now.minus_secs(20 * 60)))
            .await
            .unwrap();

        let config = PaymentConfig::default();
        let swept = ExpireStalePaymentsHandler::new(ledger.clone(), config.pending_ttl(), 50)
            .handle(now)
            .await
            .unwrap();
        assert_eq!(swept.expired, 1);
        assert_eq!(status_of(&ledger, "cs_test_late").await, PaymentStatus::Pending);

        let result = ledger
            .settle(&SettlementRequest {
                transaction_id: TransactionId::new("cs_test_late").unwrap(),
                outcome: SettlementOutcome::Succeeded,
                raw_payload: serde_json::json!({"type": "checkout.session.completed"}),
            })
            .await
            .unwrap();
        assert!(matches!(result, SettlementResult::Settled { .. }));
        assert_eq!(ledger.balance_of(&UserId::new("user-1").unwrap()).await, Some(1010));
    }
}
