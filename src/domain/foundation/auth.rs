//! Authentication types for the domain layer.
//!
//! An `AuthenticatedUser` is produced by a `SessionValidator` adapter from a
//! bearer token and injected into request extensions by the HTTP middleware.

use super::UserId;
use thiserror::Error;

/// Authenticated caller extracted from a validated bearer token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// Account identifier carried in the token.
    pub id: UserId,

    /// Email claim, when the issuer includes one.
    pub email: Option<String>,
}

impl AuthenticatedUser {
    pub fn new(id: UserId, email: Option<String>) -> Self {
        Self { id, email }
    }
}

/// Authentication errors that can occur during token validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The token is missing, malformed, or has an invalid signature.
    #[error("Invalid or expired token")]
    InvalidToken,

    /// The token has expired.
    #[error("Token expired")]
    TokenExpired,

    /// The authentication service is unavailable (network, config, etc.).
    #[error("Auth service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AuthError {
    /// Creates a service unavailable error with a message.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }

    /// Returns true if this error indicates the user should re-authenticate.
    pub fn requires_reauthentication(&self) -> bool {
        matches!(self, AuthError::InvalidToken | AuthError::TokenExpired)
    }
}
