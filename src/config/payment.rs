//! Payment configuration (shared settings and the Stripe card channel)

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use super::mpesa::MpesaConfig;

/// Payment configuration covering both channels.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Card checkout channel
    #[serde(default)]
    pub stripe: StripeSettings,

    /// Mobile-money push channel
    #[serde(default)]
    pub mpesa: MpesaConfig,

    /// Credits granted by a settled premium purchase
    #[serde(default = "default_premium_credit_grant")]
    pub premium_credit_grant: i64,

    /// Upper bound for any outbound provider call, in seconds
    #[serde(default = "default_provider_timeout")]
    pub provider_timeout_secs: u64,

    /// How long an attempt may stay pending before the sweep fails it
    #[serde(default = "default_pending_ttl")]
    pub pending_ttl_secs: u64,

    /// Interval between stale-pending sweeps
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

/// Stripe checkout settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StripeSettings {
    /// Stripe secret API key
    #[serde(default)]
    pub api_key: String,

    /// Stripe webhook signing secret
    #[serde(default)]
    pub webhook_secret: String,

    /// Price ID charged for the premium plan
    pub premium_price_id: Option<String>,

    /// Checkout mode: "subscription" or "payment"
    #[serde(default = "default_checkout_mode")]
    pub checkout_mode: String,

    /// Front-end base URL used for success/cancel redirects
    #[serde(default)]
    pub frontend_url: String,

    /// Stripe API base URL (overridable for tests)
    pub api_base_url: Option<String>,

    /// Reject test-mode events
    #[serde(default)]
    pub require_livemode: bool,
}

impl StripeSettings {
    /// Check if using Stripe test mode
    pub fn is_test_mode(&self) -> bool {
        self.api_key.starts_with("sk_test_")
    }

    /// Redirect target after a completed checkout.
    pub fn success_url(&self) -> String {
        format!(
            "{}/success?session_id={{CHECKOUT_SESSION_ID}}",
            self.frontend_url.trim_end_matches('/')
        )
    }

    /// Redirect target after an abandoned checkout.
    pub fn cancel_url(&self) -> String {
        format!("{}/cancel", self.frontend_url.trim_end_matches('/'))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.api_key.is_empty() {
            return Err(ValidationError::MissingRequired("STRIPE_API_KEY"));
        }
        if self.webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired("STRIPE_WEBHOOK_SECRET"));
        }
        if !self.api_key.starts_with("sk_") {
            return Err(ValidationError::InvalidStripeKey);
        }
        if !self.webhook_secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidStripeWebhookSecret);
        }
        if self.frontend_url.is_empty() {
            return Err(ValidationError::MissingRequired("FRONTEND_URL"));
        }
        match self.checkout_mode.as_str() {
            "subscription" | "payment" => Ok(()),
            other => Err(ValidationError::InvalidCheckoutMode(other.to_string())),
        }
    }
}

impl PaymentConfig {
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    pub fn pending_ttl(&self) -> Duration {
        Duration::from_secs(self.pending_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.stripe.validate()?;
        self.mpesa.validate()?;

        if self.premium_credit_grant <= 0 {
            return Err(ValidationError::InvalidPlanAmount);
        }
        if self.provider_timeout_secs == 0 || self.provider_timeout_secs > 120 {
            return Err(ValidationError::InvalidTimeout);
        }
        if self.pending_ttl_secs <= self.provider_timeout_secs {
            return Err(ValidationError::InvalidPendingTtl);
        }
        Ok(())
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            stripe: StripeSettings::default(),
            mpesa: MpesaConfig::default(),
            premium_credit_grant: default_premium_credit_grant(),
            provider_timeout_secs: default_provider_timeout(),
            pending_ttl_secs: default_pending_ttl(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

fn default_checkout_mode() -> String {
    "subscription".to_string()
}

fn default_premium_credit_grant() -> i64 {
    1000
}

fn default_provider_timeout() -> u64 {
    15
}

fn default_pending_ttl() -> u64 {
    // STK prompts expire on the handset well within this window
    15 * 60
}

fn default_sweep_interval() -> u64 {
    60
}
