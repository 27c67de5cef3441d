//! GetPaymentStatusHandler - Query handler for polling a payment.
//!
//! The lookup is scoped to the requester. Another user's transaction is
//! indistinguishable from one that does not exist.

use std::sync::Arc;

use crate::domain::billing::{BillingError, PaymentAttempt};
use crate::domain::foundation::{TransactionId, UserId};
use crate::ports::PaymentAttemptRepository;

/// Query for one payment's status.
#[derive(Debug, Clone)]
pub struct GetPaymentStatusQuery {
    pub user_id: UserId,
    pub transaction_id: String,
}

/// Handler for payment status polling.
pub struct GetPaymentStatusHandler {
    attempts: Arc<dyn PaymentAttemptRepository>,
}

impl GetPaymentStatusHandler {
    pub fn new(attempts: Arc<dyn PaymentAttemptRepository>) -> Self {
        Self { attempts }
    }

    pub async fn handle(&self, query: GetPaymentStatusQuery) -> Result<PaymentAttempt, BillingError> {
        let transaction_id = TransactionId::new(query.transaction_id)?;

        self.attempts
            .find_for_user(&transaction_id, &query.user_id)
            .await?
            .ok_or_else(|| BillingError::payment_not_found(&transaction_id))
    }
}
