//! Plan tiers and the purchasable plan catalog.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Plan tier recorded on an entitlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    /// Default tier for newly provisioned accounts.
    Free,

    /// Granted by any settled purchase.
    Premium,
}

impl PlanTier {
    /// Returns true if this tier is a paid tier.
    pub fn is_paid(&self) -> bool {
        !matches!(self, PlanTier::Free)
    }

    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Free => "free",
            PlanTier::Premium => "premium",
        }
    }
}

impl std::fmt::Display for PlanTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PlanTier {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(PlanTier::Free),
            "premium" => Ok(PlanTier::Premium),
            other => Err(ValidationError::invalid_format(
                "plan",
                format!("unknown plan tier '{}'", other),
            )),
        }
    }
}

/// A purchasable plan.
///
/// Settlement of a purchase moves the buyer to `tier` and adds
/// `credit_grant` credits to the balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    /// Identifier clients send when starting a payment.
    pub id: String,
    pub tier: PlanTier,
    pub credit_grant: i64,
    /// Price on the push channel, in whole KES.
    pub push_amount: i64,
    /// Stripe price charged on the card channel.
    pub card_price_id: Option<String>,
}

impl Plan {
    /// The premium plan.
    pub fn premium(credit_grant: i64, push_amount: i64, card_price_id: Option<String>) -> Self {
        Self {
            id: "premium".to_string(),
            tier: PlanTier::Premium,
            credit_grant,
            push_amount,
            card_price_id,
        }
    }
}

/// Set of plans offered for purchase.
#[derive(Debug, Clone, Default)]
pub struct PlanCatalog {
    plans: Vec<Plan>,
}

impl PlanCatalog {
    pub fn new(plans: Vec<Plan>) -> Self {
        Self { plans }
    }

    /// Looks up a plan by the id clients send.
    pub fn find(&self, plan_id: &str) -> Option<&Plan> {
        self.plans.iter().find(|plan| plan.id == plan_id)
    }

    /// Like [`find`](Self::find) but reports unknown ids as a validation error.
    pub fn require(&self, plan_id: &str) -> Result<&Plan, ValidationError> {
        if plan_id.trim().is_empty() {
            return Err(ValidationError::empty_field("plan_id"));
        }
        self.find(plan_id).ok_or_else(|| {
            ValidationError::invalid_format("plan_id", format!("unknown plan '{}'", plan_id))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> PlanCatalog {
        PlanCatalog::new(vec![Plan::premium(1000, 25, Some("price_123".to_string()))])
    }

    #[test]
    fn free_tier_is_not_paid() {
        assert!(!PlanTier::Free.is_paid());
        assert!(PlanTier::Premium.is_paid());
    }

    #[test]
    fn tier_round_trips_through_storage_string() {
        for tier in [PlanTier::Free, PlanTier::Premium] {
            assert_eq!(tier.as_str().parse::<PlanTier>().unwrap(), tier);
        }
    }

    #[test]
    fn unknown_tier_string_is_rejected() {
        assert!("gold".parse::<PlanTier>().is_err());
    }

    #[test]
    fn tier_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&PlanTier::Premium).unwrap(), "\"premium\"");
    }

    #[test]
    fn catalog_finds_premium() {
        let catalog = catalog();
        let plan = catalog.find("premium").unwrap();
        assert_eq!(plan.credit_grant, 1000);
        assert_eq!(plan.push_amount, 25);
        assert_eq!(plan.tier, PlanTier::Premium);
    }

    #[test]
    fn require_rejects_empty_and_unknown_ids() {
        let catalog = catalog();
        assert!(matches!(
            catalog.require(""),
            Err(ValidationError::EmptyField { .. })
        ));
        assert!(matches!(
            catalog.require("enterprise"),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }
}
