//! SQLite backend for the Mealbook ledger.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Uniqueness is enforced by partial
//! unique indexes, so concurrent writers (including other processes sharing
//! the file) cannot break it.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
