//! Payment attempts and their status lifecycle.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::plan::PlanTier;
use crate::domain::foundation::{
    PaymentAttemptId, StateMachine, Timestamp, TransactionId, UserId, ValidationError,
};

/// Status of a payment attempt.
///
/// `Pending` settles exactly once into `Success` or `Failed`; both are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Success => "success",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "success" => Ok(PaymentStatus::Success),
            "failed" => Ok(PaymentStatus::Failed),
            other => Err(ValidationError::invalid_format(
                "status",
                format!("unknown payment status '{}'", other),
            )),
        }
    }
}

impl StateMachine for PaymentStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use PaymentStatus::*;
        matches!((self, target), (Pending, Success) | (Pending, Failed))
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use PaymentStatus::*;
        match self {
            Pending => vec![Success, Failed],
            Success | Failed => vec![],
        }
    }
}

/// Channel a payment was initiated through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentChannel {
    /// M-Pesa STK push to the payer's handset.
    Mpesa,

    /// Stripe hosted checkout.
    Card,
}

impl PaymentChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentChannel::Mpesa => "mpesa",
            PaymentChannel::Card => "card",
        }
    }
}

impl std::fmt::Display for PaymentChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PaymentChannel {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mpesa" => Ok(PaymentChannel::Mpesa),
            "card" => Ok(PaymentChannel::Card),
            other => Err(ValidationError::invalid_format(
                "channel",
                format!("unknown payment channel '{}'", other),
            )),
        }
    }
}

/// One attempt to purchase a plan.
///
/// Keyed by the provider-issued [`TransactionId`]. The tier and credit grant
/// are captured at initiation so later catalog changes do not alter what an
/// in-flight purchase pays out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentAttempt {
    pub id: PaymentAttemptId,
    pub transaction_id: TransactionId,
    pub user_id: UserId,
    pub plan_id: String,
    pub channel: PaymentChannel,
    pub amount: i64,
    pub grant_tier: PlanTier,
    pub credit_grant: i64,
    pub phone_number: Option<String>,
    pub status: PaymentStatus,
    /// Provider payload exactly as received at settlement.
    pub raw_response: Option<serde_json::Value>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Everything needed to record a new pending attempt.
#[derive(Debug, Clone)]
pub struct NewPaymentAttempt {
    pub transaction_id: TransactionId,
    pub user_id: UserId,
    pub plan_id: String,
    pub channel: PaymentChannel,
    pub amount: i64,
    pub grant_tier: PlanTier,
    pub credit_grant: i64,
    pub phone_number: Option<String>,
}

impl PaymentAttempt {
    /// Creates the pending record for a provider-accepted request.
    pub fn pending(new: NewPaymentAttempt, now: Timestamp) -> Self {
        Self {
            id: PaymentAttemptId::new(),
            transaction_id: new.transaction_id,
            user_id: new.user_id,
            plan_id: new.plan_id,
            channel: new.channel,
            amount: new.amount,
            grant_tier: new.grant_tier,
            credit_grant: new.credit_grant,
            phone_number: new.phone_number,
            status: PaymentStatus::Pending,
            raw_response: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.user_id == user_id
    }

    /// Moves the attempt into a terminal status, storing the provider payload.
    pub fn settle(
        &mut self,
        status: PaymentStatus,
        raw_response: serde_json::Value,
        now: Timestamp,
    ) -> Result<(), ValidationError> {
        self.status = self.status.transition_to(status)?;
        self.raw_response = Some(raw_response);
        self.updated_at = now;
        Ok(())
    }

    /// True when still pending and created before `cutoff`.
    pub fn is_stale(&self, cutoff: &Timestamp) -> bool {
        self.status == PaymentStatus::Pending && self.created_at.is_before(cutoff)
    }
}

#[cfg(test)]
pub(crate) fn sample_attempt(transaction_id: &str, user_id: &str) -> NewPaymentAttempt {
    NewPaymentAttempt {
        transaction_id: TransactionId::new(transaction_id).unwrap(),
        user_id: UserId::new(user_id).unwrap(),
        plan_id: "premium".to_string(),
        channel: PaymentChannel::Mpesa,
        amount: 25,
        grant_tier: PlanTier::Premium,
        credit_grant: 1000,
        phone_number: Some("254712345678".to_string()),
    }
}
