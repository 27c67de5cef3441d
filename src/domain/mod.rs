//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors, auth)
//! - `billing` - Entitlements, payment attempts, credit pricing, callbacks

pub mod billing;
pub mod foundation;
