//! Settlement step shared by the push callback and the card webhook.

use crate::domain::billing::{
    BillingError, PaymentChannel, PaymentStatus, SettlementRequest, SettlementResult,
};
use crate::domain::foundation::TransactionId;
use crate::ports::PaymentAttemptRepository;

/// What a callback did to the ledger.
///
/// Every variant is acknowledged to the provider; only a returned error asks
/// it to redeliver.
#[derive(Debug, Clone, PartialEq)]
pub enum CallbackOutcome {
    /// This delivery moved the attempt out of `pending`.
    Applied {
        transaction_id: TransactionId,
        status: PaymentStatus,
        /// Credits granted, when the payment succeeded and the owner exists.
        credited: Option<i64>,
    },

    /// Payment recorded as success but the owner has no entitlement.
    EntitlementMissing { transaction_id: TransactionId },

    /// Duplicate delivery for a terminal attempt.
    AlreadySettled {
        transaction_id: TransactionId,
        status: PaymentStatus,
    },

    /// No attempt carries this transaction id.
    UnknownTransaction { transaction_id: TransactionId },

    /// Verified but not actionable (unhandled event type, unpaid session).
    Ignored { reason: &'static str },
}

impl CallbackOutcome {
    pub fn mutated(&self) -> bool {
        matches!(
            self,
            CallbackOutcome::Applied { .. } | CallbackOutcome::EntitlementMissing { .. }
        )
    }
}

/// Applies `request` through the repository's compare-and-swap and logs the
/// result.
pub(crate) async fn apply_settlement(
    attempts: &dyn PaymentAttemptRepository,
    request: SettlementRequest,
    channel: PaymentChannel,
) -> Result<CallbackOutcome, BillingError> {
    let transaction_id = request.transaction_id.clone();

    let result = attempts.settle(&request).await.map_err(|e| {
        tracing::error!(
            transaction_id = %transaction_id,
            channel = %channel,
            error = %e,
            "Settlement failed; provider will retry"
        );
        BillingError::from(e)
    })?;

    Ok(match result {
        SettlementResult::Settled {
            attempt,
            entitlement,
        } => {
            let credited = entitlement.as_ref().map(|_| attempt.credit_grant);
            tracing::info!(
                transaction_id = %transaction_id,
                channel = %channel,
                user_id = %attempt.user_id,
                status = %attempt.status,
                credited = credited.unwrap_or(0),
                balance = ?entitlement.as_ref().map(|e| e.credits),
                "Payment settled"
            );
            CallbackOutcome::Applied {
                transaction_id,
                status: attempt.status,
                credited,
            }
        }
        SettlementResult::EntitlementMissing { attempt } => {
            tracing::error!(
                anomaly = "entitlement_missing",
                transaction_id = %transaction_id,
                channel = %channel,
                user_id = %attempt.user_id,
                credit_grant = attempt.credit_grant,
                "Payment succeeded for a user without an entitlement; grant skipped"
            );
            CallbackOutcome::EntitlementMissing { transaction_id }
        }
        SettlementResult::AlreadySettled { status } => {
            tracing::info!(
                transaction_id = %transaction_id,
                channel = %channel,
                status = %status,
                "Duplicate callback for settled payment"
            );
            CallbackOutcome::AlreadySettled {
                transaction_id,
                status,
            }
        }
        SettlementResult::UnknownTransaction => {
            tracing::warn!(
                anomaly = "unknown_transaction",
                transaction_id = %transaction_id,
                channel = %channel,
                "Callback for a transaction with no recorded attempt"
            );
            CallbackOutcome::UnknownTransaction { transaction_id }
        }
    })
}
