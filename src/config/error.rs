//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid socket address: {0}")]
    InvalidSocketAddr(String),

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Pool min_connections exceeds max_connections")]
    InvalidPoolSize,

    #[error("Pool size exceeds maximum allowed (100)")]
    PoolSizeTooLarge,

    #[error("JWT secret must be at least 32 bytes")]
    JwtSecretTooShort,

    #[error("Invalid Stripe API key format")]
    InvalidStripeKey,

    #[error("Invalid Stripe webhook secret format")]
    InvalidStripeWebhookSecret,

    #[error("Invalid Stripe checkout mode: {0}")]
    InvalidCheckoutMode(String),

    #[error("M-Pesa callback URL must use HTTPS")]
    CallbackUrlMustBeHttps,

    #[error("M-Pesa callback token must be at least 16 characters")]
    CallbackTokenTooShort,

    #[error("Plan amount must be positive")]
    InvalidPlanAmount,

    #[error("Pending payment lifetime must exceed provider timeout")]
    InvalidPendingTtl,

    #[error("Language model timeout ({ai}s) must be shorter than the request timeout ({request}s)")]
    RewriteTimeoutExceedsRequestTimeout { ai: u64, request: u64 },
}
