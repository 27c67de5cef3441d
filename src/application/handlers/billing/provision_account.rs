//! ProvisionAccountHandler - Command handler creating a user's entitlement.
//!
//! Called once a user registers. Repeat calls return the existing record
//! unchanged.

use std::sync::Arc;

use crate::domain::billing::{BillingError, Entitlement};
use crate::domain::foundation::{Timestamp, UserId};
use crate::ports::EntitlementRepository;

/// Command to provision the free starting entitlement.
#[derive(Debug, Clone)]
pub struct ProvisionAccountCommand {
    pub user_id: UserId,
}

/// The stored entitlement and whether this call created it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionAccountResult {
    pub entitlement: Entitlement,
    pub created: bool,
}

pub struct ProvisionAccountHandler {
    entitlements: Arc<dyn EntitlementRepository>,
}

impl ProvisionAccountHandler {
    pub fn new(entitlements: Arc<dyn EntitlementRepository>) -> Self {
        Self { entitlements }
    }

    pub async fn handle(
        &self,
        cmd: ProvisionAccountCommand,
    ) -> Result<ProvisionAccountResult, BillingError> {
        let fresh = Entitlement::new_free(cmd.user_id, Timestamp::now());
        let (entitlement, created) = self.entitlements.provision(&fresh).await?;

        if created {
            tracing::info!(
                user_id = %entitlement.user_id,
                credits = entitlement.credits,
                "Account provisioned"
            );
        }

        Ok(ProvisionAccountResult {
            entitlement,
            created,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryLedger;
    use crate::domain::billing::PlanTier;

    #[tokio::test]
    async fn first_call_creates_free_account() {
        let handler = ProvisionAccountHandler::new(Arc::new(InMemoryLedger::new()));
        let result = handler
            .handle(ProvisionAccountCommand {
                user_id: UserId::new("user-1").unwrap(),
            })
            .await
            .unwrap();

        assert!(result.created);
        assert_eq!(result.entitlement.plan, PlanTier::Free);
        assert_eq!(result.entitlement.credits, 10);
    }

    #[tokio::test]
    async fn repeat_call_keeps_existing_balance() {
        let ledger = Arc::new(InMemoryLedger::new());
        let handler = ProvisionAccountHandler::new(ledger.clone());
        let user_id = UserId::new("user-1").unwrap();

        handler
            .handle(ProvisionAccountCommand {
                user_id: user_id.clone(),
            })
            .await
            .unwrap();
        ledger.try_debit(&user_id, 4).await.unwrap();

        let again = handler
            .handle(ProvisionAccountCommand { user_id })
            .await
            .unwrap();
        assert!(!again.created);
        assert_eq!(again.entitlement.credits, 6);
    }
}
