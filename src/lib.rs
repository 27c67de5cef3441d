//! Humanizer Ledger - Credit ledger and payment reconciliation backend.
//!
//! Tracks each user's plan tier and credit balance, debits credits for text
//! rewrites, and settles plan purchases made over M-Pesa STK push or Stripe
//! hosted checkout. Provider callbacks settle each payment attempt at most
//! once.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
