//! Stripe card checkout adapter.
//!
//! Implements `CardPaymentProvider` against the Stripe REST API: checkout
//! session creation and webhook verification.
//!
//! # Security
//!
//! - Webhook signatures are checked over the raw body before parsing
//! - Test-mode events are refused when `require_livemode` is set
//! - The API key is held as a `secrecy::SecretString`
//!
//! # Configuration
//!
//! ```ignore
//! let config = StripeConfig::new(api_key, webhook_secret)
//!     .with_redirects(success_url, cancel_url)
//!     .with_timeout(Duration::from_secs(15));
//! let adapter = StripeCheckoutAdapter::new(config)?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::config::StripeSettings;
use crate::domain::billing::{StripeWebhookVerifier, VerifiedEvent, WebhookError};
use crate::domain::foundation::TransactionId;
use crate::ports::{
    CardPaymentProvider, CheckoutRequest, CheckoutSession, PaymentError, PaymentErrorCode,
};

const DEFAULT_API_BASE_URL: &str = "https://api.stripe.com";

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Webhook signing secret (whsec_...).
    webhook_secret: SecretString,

    api_base_url: String,

    /// `payment` or `subscription`.
    checkout_mode: String,

    success_url: String,
    cancel_url: String,

    /// Whether to refuse test-mode webhook events.
    require_livemode: bool,

    timeout: Duration,
}

impl StripeConfig {
    pub fn new(api_key: impl Into<String>, webhook_secret: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            webhook_secret: SecretString::new(webhook_secret.into()),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            checkout_mode: "subscription".to_string(),
            success_url: String::new(),
            cancel_url: String::new(),
            require_livemode: false,
            timeout: Duration::from_secs(15),
        }
    }

    /// Builds the adapter configuration from application settings.
    pub fn from_settings(settings: &StripeSettings, timeout: Duration) -> Self {
        let mut config = Self::new(settings.api_key.clone(), settings.webhook_secret.clone())
            .with_checkout_mode(settings.checkout_mode.clone())
            .with_redirects(settings.success_url(), settings.cancel_url())
            .with_require_livemode(settings.require_livemode)
            .with_timeout(timeout);
        if let Some(url) = &settings.api_base_url {
            config = config.with_base_url(url.clone());
        }
        config
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn with_checkout_mode(mut self, mode: impl Into<String>) -> Self {
        self.checkout_mode = mode.into();
        self
    }

    pub fn with_redirects(
        mut self,
        success_url: impl Into<String>,
        cancel_url: impl Into<String>,
    ) -> Self {
        self.success_url = success_url.into();
        self.cancel_url = cancel_url.into();
        self
    }

    /// Require livemode events in production.
    pub fn with_require_livemode(mut self, require: bool) -> Self {
        self.require_livemode = require;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Checkout session fields we read from the API response.
#[derive(Debug, Deserialize)]
struct StripeCheckoutSessionResponse {
    id: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    message: Option<String>,
    code: Option<String>,
}

/// Stripe card checkout adapter.
pub struct StripeCheckoutAdapter {
    config: StripeConfig,
    verifier: StripeWebhookVerifier,
    http_client: reqwest::Client,
}

impl StripeCheckoutAdapter {
    pub fn new(config: StripeConfig) -> Result<Self, PaymentError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PaymentError::provider(format!("Failed to build HTTP client: {}", e)))?;
        let verifier = StripeWebhookVerifier::new(config.webhook_secret.expose_secret().clone());

        Ok(Self {
            config,
            verifier,
            http_client,
        })
    }

    fn checkout_params(&self, request: &CheckoutRequest) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("mode", self.config.checkout_mode.clone()),
            ("line_items[0][price]", request.price_id.clone()),
            ("line_items[0][quantity]", "1".to_string()),
            ("success_url", self.config.success_url.clone()),
            ("cancel_url", self.config.cancel_url.clone()),
            ("client_reference_id", request.user_id.to_string()),
            ("metadata[plan_id]", request.plan_id.clone()),
        ];
        if let Some(email) = &request.customer_email {
            params.push(("customer_email", email.clone()));
        }
        params
    }
}

/// Maps a non-success Stripe response onto a payment error.
fn error_from_response(status: reqwest::StatusCode, body: &str) -> PaymentError {
    let parsed = serde_json::from_str::<StripeErrorEnvelope>(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|e| e.error.message.clone())
        .unwrap_or_else(|| format!("Stripe API error ({})", status));

    let code = match status.as_u16() {
        401 | 403 => PaymentErrorCode::AuthenticationError,
        400 | 402 | 404 => PaymentErrorCode::RequestRejected,
        429 => PaymentErrorCode::RateLimitExceeded,
        _ => PaymentErrorCode::ProviderError,
    };

    let error = PaymentError::new(code, message);
    match parsed.and_then(|e| e.error.code) {
        Some(provider_code) => error.with_provider_code(provider_code),
        None => error,
    }
}

fn error_from_transport(e: reqwest::Error) -> PaymentError {
    if e.is_timeout() {
        PaymentError::timeout(format!("Stripe did not respond: {}", e))
    } else {
        PaymentError::network(e.to_string())
    }
}

#[async_trait]
impl CardPaymentProvider for StripeCheckoutAdapter {
    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let url = format!("{}/v1/checkout/sessions", self.config.api_base_url);
        let params = self.checkout_params(&request);

        let response = self
            .http_client
            .post(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .form(&params)
            .send()
            .await
            .map_err(error_from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, "Stripe create_checkout_session failed");
            return Err(error_from_response(status, &error_text));
        }

        let session: StripeCheckoutSessionResponse = response.json().await.map_err(|e| {
            PaymentError::provider(format!("Failed to parse Stripe response: {}", e))
        })?;

        let id = TransactionId::new(session.id)
            .map_err(|_| PaymentError::provider("Stripe returned an empty session id"))?;

        Ok(CheckoutSession {
            id,
            url: session.url,
        })
    }

    fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<VerifiedEvent, WebhookError> {
        let verified = self.verifier.verify_and_parse(payload, signature)?;

        if self.config.require_livemode && !verified.event.is_live() {
            tracing::warn!(event_id = %verified.event.id, "Rejected test mode event");
            return Err(WebhookError::LivemodeMismatch);
        }

        Ok(verified)
    }
}
