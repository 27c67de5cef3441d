//! Authentication adapters.
//!
//! Implementations of the `SessionValidator` port:
//!
//! - `JwtSessionValidator` - HS256 tokens signed with the shared secret
//! - `MockSessionValidator` - Token map for tests

mod jwt;
mod mock;

pub use jwt::JwtSessionValidator;
pub use mock::MockSessionValidator;
