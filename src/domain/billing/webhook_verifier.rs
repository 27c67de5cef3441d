//! Callback authentication.
//!
//! Stripe webhooks carry an HMAC-SHA256 signature over `"{t}.{body}"` in the
//! `Stripe-Signature` header. Push callbacks carry a shared token in the
//! callback URL's query string.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::stripe_event::{StripeEvent, VerifiedEvent};
use super::webhook_errors::WebhookError;

/// Maximum allowed age for webhook events (5 minutes).
const MAX_EVENT_AGE_SECS: i64 = 300;

/// Maximum allowed clock skew for future events (1 minute).
const MAX_CLOCK_SKEW_SECS: i64 = 60;

/// Parsed components from the Stripe-Signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    /// Unix timestamp when the signature was generated.
    pub timestamp: i64,
    /// All v1 signatures. Stripe sends more than one while a secret is
    /// being rolled.
    pub v1_signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    /// Parses a Stripe-Signature header string.
    ///
    /// Format: `t=<timestamp>,v1=<signature>[,v1=<signature>][,v0=<legacy>]`
    pub fn parse(header: &str) -> Result<Self, WebhookError> {
        let mut timestamp: Option<i64> = None;
        let mut v1_signatures = Vec::new();

        for part in header.split(',') {
            let (key, value) = part
                .trim()
                .split_once('=')
                .ok_or_else(|| WebhookError::ParseError("invalid header format".to_string()))?;

            match key {
                "t" => {
                    timestamp = Some(value.parse().map_err(|_| {
                        WebhookError::ParseError("invalid timestamp".to_string())
                    })?);
                }
                "v1" => {
                    v1_signatures.push(hex::decode(value).map_err(|_| {
                        WebhookError::ParseError("invalid v1 signature hex".to_string())
                    })?);
                }
                // v0 and future schemes are not checked
                _ => {}
            }
        }

        let timestamp =
            timestamp.ok_or_else(|| WebhookError::ParseError("missing timestamp".to_string()))?;
        if v1_signatures.is_empty() {
            return Err(WebhookError::ParseError("missing v1 signature".to_string()));
        }

        Ok(SignatureHeader {
            timestamp,
            v1_signatures,
        })
    }
}

/// Verifier for Stripe webhook signatures.
pub struct StripeWebhookVerifier {
    secret: String,
}

impl StripeWebhookVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Verifies the webhook signature and parses the event.
    ///
    /// Header parsing, timestamp window, and HMAC comparison happen before
    /// the body is interpreted as JSON. The body is parsed once; the typed
    /// event is read out of the resulting value.
    pub fn verify_and_parse(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<VerifiedEvent, WebhookError> {
        let header = SignatureHeader::parse(signature_header)?;
        self.validate_timestamp(header.timestamp, chrono::Utc::now().timestamp())?;

        let expected = self.compute_signature(header.timestamp, payload)?;
        if !header
            .v1_signatures
            .iter()
            .any(|candidate| constant_time_compare(&expected, candidate))
        {
            return Err(WebhookError::InvalidSignature);
        }

        let raw: serde_json::Value =
            serde_json::from_slice(payload).map_err(|e| WebhookError::ParseError(e.to_string()))?;
        let event =
            StripeEvent::deserialize(&raw).map_err(|e| WebhookError::ParseError(e.to_string()))?;
        Ok(VerifiedEvent { event, raw })
    }

    fn validate_timestamp(&self, timestamp: i64, now: i64) -> Result<(), WebhookError> {
        let age = now - timestamp;

        if age > MAX_EVENT_AGE_SECS {
            return Err(WebhookError::TimestampOutOfRange);
        }
        if age < -MAX_CLOCK_SKEW_SECS {
            return Err(WebhookError::InvalidTimestamp);
        }

        Ok(())
    }

    fn compute_signature(&self, timestamp: i64, payload: &[u8]) -> Result<Vec<u8>, WebhookError> {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret.as_bytes())
            .map_err(|_| WebhookError::InvalidSignature)?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

/// Checks a push callback's shared token.
pub fn verify_callback_token(expected: &str, presented: Option<&str>) -> Result<(), WebhookError> {
    let presented = presented.ok_or(WebhookError::InvalidCallbackToken)?;
    if expected.is_empty() || !constant_time_compare(expected.as_bytes(), presented.as_bytes()) {
        return Err(WebhookError::InvalidCallbackToken);
    }
    Ok(())
}

/// Performs constant-time comparison of two byte slices.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Computes a `Stripe-Signature` header value for test fixtures.
#[cfg(test)]
pub fn compute_test_signature(secret: &str, timestamp: i64, payload: &str) -> String {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key");
    mac.update(format!("{}.{}", timestamp, payload).as_bytes());
    hex::encode(mac.finalize().into_bytes())
}
