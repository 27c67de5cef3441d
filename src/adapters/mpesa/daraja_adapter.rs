//! Daraja STK push adapter.
//!
//! Two calls per payment: an OAuth client-credentials token (cached until
//! shortly before it expires) and the `processrequest` push. The push is
//! signed with `base64(shortcode + passkey + timestamp)`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::config::MpesaConfig;
use crate::domain::foundation::{Timestamp, TransactionId};
use crate::ports::{
    PaymentError, PaymentErrorCode, PushPaymentAccepted, PushPaymentProvider, PushPaymentRequest,
};

/// Refresh the token this long before Daraja says it expires.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

const TRANSACTION_TYPE: &str = "CustomerPayBillOnline";

/// Daraja API configuration.
#[derive(Clone)]
pub struct DarajaConfig {
    consumer_key: SecretString,
    consumer_secret: SecretString,
    shortcode: String,
    passkey: SecretString,
    /// Callback URL including the shared token query parameter.
    callback_url: String,
    base_url: String,
    timeout: Duration,
}

impl DarajaConfig {
    pub fn from_settings(settings: &MpesaConfig, timeout: Duration) -> Self {
        Self {
            consumer_key: SecretString::new(settings.consumer_key.clone()),
            consumer_secret: SecretString::new(settings.consumer_secret.clone()),
            shortcode: settings.shortcode.clone(),
            passkey: SecretString::new(settings.passkey.clone()),
            callback_url: settings.callback_url_with_token(),
            base_url: settings.base_url().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// STK password for a given compact timestamp.
    fn password(&self, timestamp: &str) -> String {
        STANDARD.encode(format!(
            "{}{}{}",
            self.shortcode,
            self.passkey.expose_secret(),
            timestamp
        ))
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    /// Seconds, sent as a string.
    expires_in: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct StkPushBody<'a> {
    business_short_code: &'a str,
    password: String,
    timestamp: String,
    transaction_type: &'static str,
    amount: i64,
    party_a: &'a str,
    party_b: &'a str,
    phone_number: &'a str,
    #[serde(rename = "CallBackURL")]
    callback_url: &'a str,
    account_reference: String,
    transaction_desc: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StkPushResponse {
    #[serde(rename = "MerchantRequestID")]
    merchant_request_id: Option<String>,
    #[serde(rename = "CheckoutRequestID")]
    checkout_request_id: Option<String>,
    response_code: Option<String>,
    response_description: Option<String>,
    customer_message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DarajaErrorBody {
    error_code: Option<String>,
    error_message: Option<String>,
}

struct CachedToken {
    token: SecretString,
    fetched_at: Instant,
    lifetime: Duration,
}

impl CachedToken {
    fn is_expired(&self) -> bool {
        self.fetched_at.elapsed() + TOKEN_EXPIRY_MARGIN > self.lifetime
    }
}

/// Push payment adapter backed by the Daraja API.
pub struct DarajaPushAdapter {
    config: DarajaConfig,
    http_client: reqwest::Client,
    token_cache: Arc<RwLock<Option<CachedToken>>>,
}

impl DarajaPushAdapter {
    pub fn new(config: DarajaConfig) -> Result<Self, PaymentError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PaymentError::provider(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
            token_cache: Arc::new(RwLock::new(None)),
        })
    }

    async fn fetch_token(&self) -> Result<CachedToken, PaymentError> {
        let url = format!(
            "{}/oauth/v1/generate?grant_type=client_credentials",
            self.config.base_url
        );

        let response = self
            .http_client
            .get(&url)
            .basic_auth(
                self.config.consumer_key.expose_secret(),
                Some(self.config.consumer_secret.expose_secret()),
            )
            .send()
            .await
            .map_err(error_from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, "Daraja token request failed");
            let (message, code) = parse_error_body(&body, "token request refused");
            let error = PaymentError::authentication(message);
            return Err(match code {
                Some(code) => error.with_provider_code(code),
                None => error,
            });
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            PaymentError::provider(format!("Failed to parse Daraja token response: {}", e))
        })?;

        let lifetime = token
            .expires_in
            .as_deref()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(3599));

        Ok(CachedToken {
            token: SecretString::new(token.access_token),
            fetched_at: Instant::now(),
            lifetime,
        })
    }

    /// Access token, from cache when still fresh.
    async fn access_token(&self) -> Result<SecretString, PaymentError> {
        {
            let cache = self.token_cache.read().await;
            if let Some(ref cached) = *cache {
                if !cached.is_expired() {
                    return Ok(cached.token.clone());
                }
            }
        }

        let fresh = self.fetch_token().await?;
        let token = fresh.token.clone();
        *self.token_cache.write().await = Some(fresh);
        Ok(token)
    }

    fn push_body<'a>(&'a self, request: &'a PushPaymentRequest, timestamp: String) -> StkPushBody<'a> {
        StkPushBody {
            business_short_code: &self.config.shortcode,
            password: self.config.password(&timestamp),
            timestamp,
            transaction_type: TRANSACTION_TYPE,
            amount: request.amount,
            party_a: request.phone_number.as_str(),
            party_b: &self.config.shortcode,
            phone_number: request.phone_number.as_str(),
            callback_url: &self.config.callback_url,
            account_reference: request.account_reference(),
            transaction_desc: &request.description,
        }
    }
}

fn error_from_transport(e: reqwest::Error) -> PaymentError {
    if e.is_timeout() {
        PaymentError::timeout(format!("Daraja did not respond: {}", e))
    } else {
        PaymentError::network(e.to_string())
    }
}

fn parse_error_body(body: &str, fallback: &str) -> (String, Option<String>) {
    match serde_json::from_str::<DarajaErrorBody>(body) {
        Ok(parsed) => (
            parsed.error_message.unwrap_or_else(|| fallback.to_string()),
            parsed.error_code,
        ),
        Err(_) => (fallback.to_string(), None),
    }
}

#[async_trait]
impl PushPaymentProvider for DarajaPushAdapter {
    async fn initiate_push(
        &self,
        request: PushPaymentRequest,
    ) -> Result<PushPaymentAccepted, PaymentError> {
        let token = self.access_token().await?;
        let url = format!("{}/mpesa/stkpush/v1/processrequest", self.config.base_url);
        let body = self.push_body(&request, Timestamp::now().to_compact());

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(error_from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, user_id = %request.user_id, "Daraja STK push failed");
            if status == reqwest::StatusCode::UNAUTHORIZED {
                // Token revoked early; next call fetches a new one.
                *self.token_cache.write().await = None;
            }
            let (message, code) = parse_error_body(&text, "STK push refused");
            let error = match status.as_u16() {
                401 | 403 => PaymentError::authentication(message),
                429 => PaymentError::new(PaymentErrorCode::RateLimitExceeded, message),
                400..=499 => PaymentError::rejected(message),
                _ => PaymentError::provider(message),
            };
            return Err(match code {
                Some(code) => error.with_provider_code(code),
                None => error,
            });
        }

        let accepted: StkPushResponse = response.json().await.map_err(|e| {
            PaymentError::provider(format!("Failed to parse STK push response: {}", e))
        })?;

        if accepted.response_code.as_deref() != Some("0") {
            let message = accepted
                .response_description
                .unwrap_or_else(|| "STK push not accepted".to_string());
            let error = PaymentError::rejected(message);
            return Err(match accepted.response_code {
                Some(code) => error.with_provider_code(code),
                None => error,
            });
        }

        let transaction_id = accepted
            .checkout_request_id
            .and_then(|id| TransactionId::new(id).ok())
            .ok_or_else(|| PaymentError::provider("STK push response missing CheckoutRequestID"))?;

        Ok(PushPaymentAccepted {
            transaction_id,
            merchant_request_id: accepted.merchant_request_id,
            customer_message: accepted.customer_message,
        })
    }
}
