//! In-memory adapters.
//!
//! - `InMemoryLedger` - Entitlements and payment attempts behind one lock,
//!   used by tests and by local runs without a database.

mod ledger;

pub use ledger::InMemoryLedger;
