//! HS256 JWT session validator.
//!
//! Tokens are signed by the account service with a shared secret and carry
//! `{ id, email, exp }`. The `id` claim becomes the caller's `UserId`.

use async_trait::async_trait;
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::config::AuthConfig;
use crate::domain::foundation::{AuthError, AuthenticatedUser, UserId};
use crate::ports::SessionValidator;

/// Claims issued by the account service.
#[derive(Debug, Deserialize)]
struct SessionClaims {
    id: ClaimId,
    #[serde(default)]
    email: Option<String>,
    #[allow(dead_code)]
    exp: u64,
}

/// Account ids arrive as strings or numbers depending on the issuer.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ClaimId {
    Text(String),
    Number(i64),
}

impl ClaimId {
    fn into_string(self) -> String {
        match self {
            ClaimId::Text(s) => s,
            ClaimId::Number(n) => n.to_string(),
        }
    }
}

/// Validates bearer tokens signed with HS256.
pub struct JwtSessionValidator {
    secret: SecretString,
    leeway_secs: u64,
}

impl JwtSessionValidator {
    pub fn new(secret: impl Into<String>, leeway_secs: u64) -> Self {
        Self {
            secret: SecretString::new(secret.into()),
            leeway_secs,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.jwt_secret.clone(), config.leeway_secs)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = self.leeway_secs;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp"]);
        validation
    }
}

#[async_trait]
impl SessionValidator for JwtSessionValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let key = DecodingKey::from_secret(self.secret.expose_secret().as_bytes());

        let data = decode::<SessionClaims>(token, &key, &self.validation()).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => {
                    tracing::debug!("Token expired");
                    AuthError::TokenExpired
                }
                _ => {
                    tracing::warn!("Token validation failed: {}", e);
                    AuthError::InvalidToken
                }
            }
        })?;

        let claims = data.claims;
        let user_id = UserId::new(claims.id.into_string()).map_err(|_| {
            tracing::warn!("Token carries an empty id claim");
            AuthError::InvalidToken
        })?;

        Ok(AuthenticatedUser::new(user_id, claims.email))
    }
}

impl std::fmt::Debug for JwtSessionValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSessionValidator")
            .field("leeway_secs", &self.leeway_secs)
            .finish_non_exhaustive()
    }
}
