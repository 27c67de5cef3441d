//! ListPaymentsHandler - Query handler for a user's payment history.

use std::sync::Arc;

use crate::domain::billing::{BillingError, PaymentAttempt};
use crate::domain::foundation::UserId;
use crate::ports::PaymentAttemptRepository;

const DEFAULT_LIMIT: u32 = 20;
const MAX_LIMIT: u32 = 100;

/// Query for the caller's recent payments.
#[derive(Debug, Clone)]
pub struct ListPaymentsQuery {
    pub user_id: UserId,
    pub limit: Option<u32>,
}

impl ListPaymentsQuery {
    fn effective_limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

/// Handler listing attempts newest first.
pub struct ListPaymentsHandler {
    attempts: Arc<dyn PaymentAttemptRepository>,
}

impl ListPaymentsHandler {
    pub fn new(attempts: Arc<dyn PaymentAttemptRepository>) -> Self {
        Self { attempts }
    }

    pub async fn handle(&self, query: ListPaymentsQuery) -> Result<Vec<PaymentAttempt>, BillingError> {
        let limit = query.effective_limit();
        Ok(self.attempts.list_for_user(&query.user_id, limit).await?)
    }
}
