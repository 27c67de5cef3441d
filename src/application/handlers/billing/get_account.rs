//! GetAccountHandler - Query handler for the caller's plan and balance.

use std::sync::Arc;

use crate::domain::billing::{BillingError, Entitlement};
use crate::domain::foundation::UserId;
use crate::ports::EntitlementRepository;

#[derive(Debug, Clone)]
pub struct GetAccountQuery {
    pub user_id: UserId,
}

pub struct GetAccountHandler {
    entitlements: Arc<dyn EntitlementRepository>,
}

impl GetAccountHandler {
    pub fn new(entitlements: Arc<dyn EntitlementRepository>) -> Self {
        Self { entitlements }
    }

    pub async fn handle(&self, query: GetAccountQuery) -> Result<Entitlement, BillingError> {
        self.entitlements
            .find_by_user_id(&query.user_id)
            .await?
            .ok_or(BillingError::AccountNotFound(query.user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryLedger;
    use crate::domain::foundation::Timestamp;

    #[tokio::test]
    async fn returns_stored_entitlement() {
        let ledger = Arc::new(InMemoryLedger::new());
        let user_id = UserId::new("user-1").unwrap();
        ledger
            .provision(&Entitlement::new_free(user_id.clone(), Timestamp::now()))
            .await
            .unwrap();

        let account = GetAccountHandler::new(ledger)
            .handle(GetAccountQuery { user_id })
            .await
            .unwrap();
        assert_eq!(account.credits, 10);
    }

    #[tokio::test]
    async fn missing_account_is_reported() {
        let err = GetAccountHandler::new(Arc::new(InMemoryLedger::new()))
            .handle(GetAccountQuery {
                user_id: UserId::new("ghost").unwrap(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::AccountNotFound(_)));
    }
}
