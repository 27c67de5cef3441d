//! Application configuration module
//!
//! Configuration is read from environment variables with the `HUMANIZER`
//! prefix. Nested values are separated by a double underscore.
//!
//! # Example
//!
//! ```no_run
//! use humanizer_ledger::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod ai;
mod auth;
mod database;
mod error;
mod mpesa;
mod payment;
mod server;

pub use ai::AiConfig;
pub use auth::AuthConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use mpesa::MpesaConfig;
pub use payment::{PaymentConfig, StripeSettings};
pub use server::{Environment, ServerConfig};

#[cfg(test)]
pub(crate) use mpesa::tests::valid_mpesa;

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Ledger database (PostgreSQL)
    pub database: DatabaseConfig,

    /// Bearer token verification
    pub auth: AuthConfig,

    /// Rewriter model
    #[serde(default)]
    pub ai: AiConfig,

    /// Payment channels and settlement timing
    pub payments: PaymentConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// A `.env` file is honoured when present.
    ///
    /// - `HUMANIZER__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `HUMANIZER__PAYMENTS__MPESA__SHORTCODE=174379` -> `payments.mpesa.shortcode`
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("HUMANIZER")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.auth.validate(&self.server.environment)?;
        self.ai.validate()?;
        self.payments.validate()?;

        // The rewrite deadline has to fire before the request layer gives up.
        if self.ai.timeout_secs >= self.server.request_timeout_secs {
            return Err(ValidationError::RewriteTimeoutExceedsRequestTimeout {
                ai: self.ai.timeout_secs,
                request: self.server.request_timeout_secs,
            });
        }
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // env vars are process-global
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const MINIMAL_ENV: &[(&str, &str)] = &[
        ("HUMANIZER__DATABASE__URL", "postgresql://test@localhost/test"),
        ("HUMANIZER__AUTH__JWT_SECRET", "dev-secret"),
        ("HUMANIZER__AI__OPENAI_API_KEY", "sk-xxx"),
        ("HUMANIZER__PAYMENTS__STRIPE__API_KEY", "sk_test_xxx"),
        ("HUMANIZER__PAYMENTS__STRIPE__WEBHOOK_SECRET", "whsec_xxx"),
        ("HUMANIZER__PAYMENTS__STRIPE__FRONTEND_URL", "http://localhost:5173"),
        ("HUMANIZER__PAYMENTS__MPESA__CONSUMER_KEY", "ck"),
        ("HUMANIZER__PAYMENTS__MPESA__CONSUMER_SECRET", "cs"),
        ("HUMANIZER__PAYMENTS__MPESA__SHORTCODE", "174379"),
        ("HUMANIZER__PAYMENTS__MPESA__PASSKEY", "pk"),
        (
            "HUMANIZER__PAYMENTS__MPESA__CALLBACK_URL",
            "https://api.example.com/payment-callbacks/push",
        ),
        ("HUMANIZER__PAYMENTS__MPESA__CALLBACK_TOKEN", "0123456789abcdef"),
    ];

    const OPTIONAL_ENV: &[&str] = &["HUMANIZER__SERVER__PORT", "HUMANIZER__SERVER__ENVIRONMENT"];

    fn set_minimal_env() {
        for (key, value) in MINIMAL_ENV {
            env::set_var(key, value);
        }
    }

    fn clear_env() {
        for (key, _) in MINIMAL_ENV {
            env::remove_var(key);
        }
        for key in OPTIONAL_ENV {
            env::remove_var(key);
        }
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.database.url, "postgresql://test@localhost/test");
        assert_eq!(config.payments.mpesa.shortcode, "174379");
        assert_eq!(config.payments.mpesa.premium_amount, 25);
    }

    #[test]
    fn test_validate_full_config() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_server_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 5001);
        assert_eq!(config.server.environment, Environment::Development);
    }

    #[test]
    fn test_production_requires_long_jwt_secret() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("HUMANIZER__SERVER__ENVIRONMENT", "production");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.is_production());
        assert_eq!(config.validate(), Err(ValidationError::JwtSecretTooShort));
    }

    #[test]
    fn test_rewrite_timeout_must_fit_inside_request_timeout() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let mut config = result.unwrap();
        config.ai.timeout_secs = config.server.request_timeout_secs;
        assert_eq!(
            config.validate(),
            Err(ValidationError::RewriteTimeoutExceedsRequestTimeout {
                ai: 60,
                request: 60,
            })
        );

        config.ai.timeout_secs = config.server.request_timeout_secs - 1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_custom_server_port() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("HUMANIZER__SERVER__PORT", "3000");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 3000);
    }
}
