//! Per-user entitlement: plan tier and credit balance.

use serde::Serialize;

use super::plan::PlanTier;
use crate::domain::foundation::{Timestamp, UserId};

/// Credits every new account starts with.
pub const STARTING_CREDITS: i64 = 10;

/// A user's plan tier and credit balance.
///
/// The balance never goes below zero. It only decreases through a debit and
/// only increases through a successful settlement (or the refund of a debit).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entitlement {
    pub user_id: UserId,
    pub plan: PlanTier,
    pub credits: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Entitlement {
    /// A freshly provisioned free account.
    pub fn new_free(user_id: UserId, now: Timestamp) -> Self {
        Self {
            user_id,
            plan: PlanTier::Free,
            credits: STARTING_CREDITS,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn can_afford(&self, cost: i64) -> bool {
        self.credits >= cost
    }

    /// Applies a settled purchase.
    pub fn apply_grant(&mut self, tier: PlanTier, credits: i64, now: Timestamp) {
        self.plan = tier;
        self.credits = self.credits.saturating_add(credits);
        self.updated_at = now;
    }

    /// Conditional decrement. Returns the new balance, or `None` (with the
    /// balance untouched) when `cost` exceeds it.
    pub fn try_debit(&mut self, cost: i64, now: Timestamp) -> Option<i64> {
        if !self.can_afford(cost) {
            return None;
        }
        self.credits -= cost;
        self.updated_at = now;
        Some(self.credits)
    }

    /// Restores credits from a debit whose action failed.
    pub fn refund(&mut self, credits: i64, now: Timestamp) {
        self.credits = self.credits.saturating_add(credits);
        self.updated_at = now;
    }
}
