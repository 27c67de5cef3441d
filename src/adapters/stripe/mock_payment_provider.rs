//! Mock card provider for testing.
//!
//! Issues sequential checkout session ids, records every checkout request,
//! and supports error injection. Webhooks are verified with a real
//! `StripeWebhookVerifier` so tests exercise the same signature path.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::billing::{StripeWebhookVerifier, VerifiedEvent, WebhookError};
use crate::domain::foundation::TransactionId;
use crate::ports::{CardPaymentProvider, CheckoutRequest, CheckoutSession, PaymentError};

/// Mock card provider.
///
/// # Example
///
/// ```ignore
/// let mock = MockCardProvider::new("whsec_test");
/// mock.fail_next(PaymentError::network("down"));
/// let result = mock.create_checkout_session(request).await;
/// ```
#[derive(Clone)]
pub struct MockCardProvider {
    inner: Arc<Mutex<MockState>>,
    verifier: Arc<StripeWebhookVerifier>,
}

#[derive(Default)]
struct MockState {
    next_session: u32,
    next_error: Option<PaymentError>,
    requests: Vec<CheckoutRequest>,
}

impl MockCardProvider {
    /// Creates a mock that verifies webhooks against `webhook_secret`.
    pub fn new(webhook_secret: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockState::default())),
            verifier: Arc::new(StripeWebhookVerifier::new(webhook_secret)),
        }
    }

    /// Makes the next checkout call fail with `error`.
    pub fn fail_next(&self, error: PaymentError) {
        self.state().next_error = Some(error);
    }

    /// Checkout requests received so far.
    pub fn requests(&self) -> Vec<CheckoutRequest> {
        self.state().requests.clone()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl CardPaymentProvider for MockCardProvider {
    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let mut state = self.state();
        state.requests.push(request);
        if let Some(error) = state.next_error.take() {
            return Err(error);
        }

        state.next_session += 1;
        let id = format!("cs_test_{}", state.next_session);
        Ok(CheckoutSession {
            url: Some(format!("https://checkout.stripe.test/pay/{}", id)),
            id: TransactionId::new(id).map_err(|e| PaymentError::provider(e.to_string()))?,
        })
    }

    fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<VerifiedEvent, WebhookError> {
        self.verifier.verify_and_parse(payload, signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::UserId;

    fn request() -> CheckoutRequest {
        CheckoutRequest {
            user_id: UserId::new("user-1").unwrap(),
            plan_id: "premium".to_string(),
            price_id: "price_1".to_string(),
            customer_email: None,
        }
    }

    #[tokio::test]
    async fn issues_distinct_session_ids() {
        let mock = MockCardProvider::new("whsec_test");
        let a = mock.create_checkout_session(request()).await.unwrap();
        let b = mock.create_checkout_session(request()).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(mock.requests().len(), 2);
    }

    #[tokio::test]
    async fn injected_error_applies_once() {
        let mock = MockCardProvider::new("whsec_test");
        mock.fail_next(PaymentError::network("down"));
        assert!(mock.create_checkout_session(request()).await.is_err());
        assert!(mock.create_checkout_session(request()).await.is_ok());
    }
}
