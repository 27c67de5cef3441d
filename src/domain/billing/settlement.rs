//! Settlement requests and results.

use super::entitlement::Entitlement;
use super::payment::{PaymentAttempt, PaymentStatus};
use crate::domain::foundation::TransactionId;

/// What the provider reported for a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementOutcome {
    Succeeded,
    Failed,
}

impl SettlementOutcome {
    /// Push callbacks report `0` for a completed payment; any other code
    /// (cancelled, timed out, insufficient balance) is a failure.
    pub fn from_result_code(code: i64) -> Self {
        if code == 0 {
            SettlementOutcome::Succeeded
        } else {
            SettlementOutcome::Failed
        }
    }

    pub fn target_status(&self) -> PaymentStatus {
        match self {
            SettlementOutcome::Succeeded => PaymentStatus::Success,
            SettlementOutcome::Failed => PaymentStatus::Failed,
        }
    }
}

/// Instruction to move a pending attempt into a terminal status.
#[derive(Debug, Clone)]
pub struct SettlementRequest {
    pub transaction_id: TransactionId,
    pub outcome: SettlementOutcome,
    /// Provider payload stored verbatim on the attempt.
    pub raw_payload: serde_json::Value,
}

/// Result of applying a [`SettlementRequest`].
#[derive(Debug, Clone, PartialEq)]
pub enum SettlementResult {
    /// This call performed the pending-to-terminal transition. `entitlement`
    /// carries the post-grant balance when the outcome was a success.
    Settled {
        attempt: PaymentAttempt,
        entitlement: Option<Entitlement>,
    },

    /// The attempt settled as success but its owner has no entitlement row.
    /// The grant was skipped.
    EntitlementMissing { attempt: PaymentAttempt },

    /// The attempt was already terminal; nothing changed.
    AlreadySettled { status: PaymentStatus },

    /// No attempt with this transaction id exists.
    UnknownTransaction,
}

impl SettlementResult {
    /// True if this call changed stored state.
    pub fn mutated(&self) -> bool {
        matches!(
            self,
            SettlementResult::Settled { .. } | SettlementResult::EntitlementMissing { .. }
        )
    }

    /// Credits added by this call, if any.
    pub fn credited(&self) -> Option<i64> {
        match self {
            SettlementResult::Settled {
                attempt,
                entitlement: Some(_),
            } => Some(attempt.credit_grant),
            _ => None,
        }
    }
}
