//! Core types and trait definitions for the Mealbook registration ledger.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement [`store::IdentityStore`] and
//! [`store::RegistrationLedger`]; the server consumes them through those
//! traits only.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod bootstrap;
pub mod error;
pub mod identity;
pub mod lifecycle;
pub mod memory;
pub mod registration;
pub mod store;
pub mod tally;

pub use error::{Error, Result};
