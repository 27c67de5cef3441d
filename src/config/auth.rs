//! Authentication configuration

use serde::Deserialize;

use super::error::ValidationError;
use super::server::Environment;

/// Bearer token verification settings.
///
/// Tokens are issued by the account service (out of this crate) and signed
/// with a shared HS256 secret.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret used to verify bearer tokens
    pub jwt_secret: String,

    /// Allowed clock skew when checking `exp`, in seconds
    #[serde(default = "default_leeway")]
    pub leeway_secs: u64,
}

impl AuthConfig {
    /// Validate authentication configuration
    ///
    /// Outside development the secret must be at least 32 bytes.
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.jwt_secret.is_empty() {
            return Err(ValidationError::MissingRequired("JWT_SECRET"));
        }
        if *environment != Environment::Development && self.jwt_secret.len() < 32 {
            return Err(ValidationError::JwtSecretTooShort);
        }
        Ok(())
    }
}

fn default_leeway() -> u64 {
    30
}
