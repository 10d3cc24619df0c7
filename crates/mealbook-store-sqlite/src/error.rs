//! Error type for `mealbook-store-sqlite`.
//!
//! These are infrastructure failures. At the trait boundary they collapse
//! into [`mealbook_core::Error::StorageUnavailable`]; domain failures are
//! produced directly as core errors and never pass through here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown meal type in row: {0:?}")]
  MealType(String),
}

impl From<Error> for mealbook_core::Error {
  fn from(e: Error) -> Self { mealbook_core::Error::storage(e) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
