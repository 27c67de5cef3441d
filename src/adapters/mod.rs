//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `postgres` - Ledger storage (sqlx)
//! - `memory` - In-memory ledger for tests and local runs
//! - `mpesa` - Daraja STK push
//! - `stripe` - Hosted card checkout and webhook verification
//! - `ai` - Language model rewriter
//! - `auth` - Bearer token validation
//! - `http` - axum routes, handlers, and middleware

pub mod ai;
pub mod auth;
pub mod http;
pub mod memory;
pub mod mpesa;
pub mod postgres;
pub mod stripe;
