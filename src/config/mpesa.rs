//! M-Pesa (Daraja STK push) configuration

use serde::Deserialize;

use super::error::ValidationError;

const SANDBOX_BASE_URL: &str = "https://sandbox.safaricom.co.ke";

/// Daraja API credentials and callback settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MpesaConfig {
    #[serde(default)]
    pub consumer_key: String,

    #[serde(default)]
    pub consumer_secret: String,

    /// Paybill / till number receiving the payment
    #[serde(default)]
    pub shortcode: String,

    /// Lipa na M-Pesa online passkey
    #[serde(default)]
    pub passkey: String,

    /// Public URL Safaricom posts the STK result to (without token)
    #[serde(default)]
    pub callback_url: String,

    /// Shared secret appended to the callback URL and checked on receipt
    #[serde(default)]
    pub callback_token: String,

    /// Price of the premium plan in whole KES
    #[serde(default = "default_premium_amount")]
    pub premium_amount: i64,

    /// Daraja API base URL, sandbox when unset
    pub api_base_url: Option<String>,
}

impl MpesaConfig {
    pub fn base_url(&self) -> &str {
        self.api_base_url.as_deref().unwrap_or(SANDBOX_BASE_URL)
    }

    /// Callback address handed to Daraja, carrying the shared token.
    pub fn callback_url_with_token(&self) -> String {
        let separator = if self.callback_url.contains('?') { '&' } else { '?' };
        format!("{}{}token={}", self.callback_url, separator, self.callback_token)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.consumer_key.is_empty() {
            return Err(ValidationError::MissingRequired("MPESA_CONSUMER_KEY"));
        }
        if self.consumer_secret.is_empty() {
            return Err(ValidationError::MissingRequired("MPESA_CONSUMER_SECRET"));
        }
        if self.shortcode.is_empty() {
            return Err(ValidationError::MissingRequired("MPESA_SHORTCODE"));
        }
        if self.passkey.is_empty() {
            return Err(ValidationError::MissingRequired("MPESA_PASSKEY"));
        }
        if self.callback_url.is_empty() {
            return Err(ValidationError::MissingRequired("MPESA_CALLBACK_URL"));
        }
        if !self.callback_url.starts_with("https://") {
            return Err(ValidationError::CallbackUrlMustBeHttps);
        }
        if self.callback_token.len() < 16 {
            return Err(ValidationError::CallbackTokenTooShort);
        }
        if self.premium_amount <= 0 {
            return Err(ValidationError::InvalidPlanAmount);
        }
        Ok(())
    }
}

fn default_premium_amount() -> i64 {
    25
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn valid_mpesa() -> MpesaConfig {
        MpesaConfig {
            consumer_key: "consumer".to_string(),
            consumer_secret: "secret".to_string(),
            shortcode: "174379".to_string(),
            passkey: "passkey".to_string(),
            callback_url: "https://api.humanizer.app/payment-callbacks/push".to_string(),
            callback_token: "0123456789abcdef0123".to_string(),
            premium_amount: 25,
            api_base_url: None,
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(valid_mpesa().validate().is_ok());
    }

    #[test]
    fn defaults_to_sandbox() {
        assert_eq!(valid_mpesa().base_url(), "https://sandbox.safaricom.co.ke");
    }

    #[test]
    fn callback_url_carries_token() {
        let config = valid_mpesa();
        assert_eq!(
            config.callback_url_with_token(),
            "https://api.humanizer.app/payment-callbacks/push?token=0123456789abcdef0123"
        );
    }

    #[test]
    fn http_callback_rejected() {
        let config = MpesaConfig {
            callback_url: "http://api.humanizer.app/cb".to_string(),
            ..valid_mpesa()
        };
        assert_eq!(config.validate(), Err(ValidationError::CallbackUrlMustBeHttps));
    }

    #[test]
    fn short_token_rejected() {
        let config = MpesaConfig {
            callback_token: "short".to_string(),
            ..valid_mpesa()
        };
        assert_eq!(config.validate(), Err(ValidationError::CallbackTokenTooShort));
    }

    #[test]
    fn missing_passkey_rejected() {
        let config = MpesaConfig {
            passkey: String::new(),
            ..valid_mpesa()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingRequired("MPESA_PASSKEY"))
        );
    }
}
