//! Session validation port.
//!
//! Bearer tokens are issued by the account service. Adapters verify them and
//! map their claims onto an [`AuthenticatedUser`].

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedUser};

/// Validates access tokens and extracts user identity.
///
/// Implementations must:
/// - Validate the token signature
/// - Return `AuthError::InvalidToken` for malformed/bad signature tokens
/// - Return `AuthError::TokenExpired` for expired tokens
#[async_trait]
pub trait SessionValidator: Send + Sync {
    /// Validate a raw token (without the "Bearer " prefix).
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::auth::MockSessionValidator;
    use std::sync::Arc;

    #[tokio::test]
    async fn expired_token_surfaces_through_trait_object() {
        let validator: Arc<dyn SessionValidator> =
            Arc::new(MockSessionValidator::new().with_error(AuthError::TokenExpired));

        let err = validator.validate("any").await.unwrap_err();
        assert!(err.requires_reauthentication());
    }

    #[test]
    fn session_validator_trait_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn SessionValidator>();
    }
}
