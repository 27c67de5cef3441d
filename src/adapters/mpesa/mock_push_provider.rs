//! Mock push provider for testing.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::foundation::TransactionId;
use crate::ports::{PaymentError, PushPaymentAccepted, PushPaymentProvider, PushPaymentRequest};

/// Mock push provider.
///
/// Accepts every request with a sequential `ws_CO_<n>` transaction id unless
/// an error has been queued with [`fail_next`](Self::fail_next).
#[derive(Clone, Default)]
pub struct MockPushProvider {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    next_id: u32,
    next_error: Option<PaymentError>,
    requests: Vec<PushPaymentRequest>,
}

impl MockPushProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next push fail with `error`.
    pub fn fail_next(&self, error: PaymentError) {
        self.state().next_error = Some(error);
    }

    /// Push requests received so far.
    pub fn requests(&self) -> Vec<PushPaymentRequest> {
        self.state().requests.clone()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl PushPaymentProvider for MockPushProvider {
    async fn initiate_push(
        &self,
        request: PushPaymentRequest,
    ) -> Result<PushPaymentAccepted, PaymentError> {
        let mut state = self.state();
        state.requests.push(request);
        if let Some(error) = state.next_error.take() {
            return Err(error);
        }

        state.next_id += 1;
        let id = format!("ws_CO_{:08}", state.next_id);
        Ok(PushPaymentAccepted {
            transaction_id: TransactionId::new(id)
                .map_err(|e| PaymentError::provider(e.to_string()))?,
            merchant_request_id: Some(format!("mr_{}", state.next_id)),
            customer_message: Some("Success. Request accepted for processing".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::PhoneNumber;
    use crate::domain::foundation::UserId;

    fn request() -> PushPaymentRequest {
        PushPaymentRequest {
            user_id: UserId::new("user-1").unwrap(),
            plan_id: "premium".to_string(),
            phone_number: PhoneNumber::parse("0712345678").unwrap(),
            amount: 25,
            description: "test".to_string(),
        }
    }

    #[tokio::test]
    async fn records_requests_and_issues_ids() {
        let mock = MockPushProvider::new();
        let accepted = mock.initiate_push(request()).await.unwrap();
        assert_eq!(accepted.transaction_id.as_str(), "ws_CO_00000001");
        assert_eq!(mock.requests()[0].amount, 25);
    }

    #[tokio::test]
    async fn queued_error_is_returned() {
        let mock = MockPushProvider::new();
        mock.fail_next(PaymentError::authentication("bad key"));
        let err = mock.initiate_push(request()).await.unwrap_err();
        assert!(!err.retryable);
    }
}
