//! Error taxonomy shared by every Mealbook store backend.

use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  /// Another active identity already holds this username.
  #[error("username already taken: {0:?}")]
  DuplicateUsername(String),

  #[error("username must not be empty")]
  InvalidUsername,

  /// The referenced identity does not exist or has been deleted.
  #[error("unknown identity: {0}")]
  UnknownIdentity(Uuid),

  /// Dates are limited to four-digit years.
  #[error("date out of range: {0}")]
  DateOutOfRange(NaiveDate),

  #[error("invalid guest count: {0}")]
  InvalidGuestCount(i64),

  #[error("guest company is required when guest count is positive")]
  MissingGuestCompany,

  /// The backing store could not complete the operation. The only kind a
  /// caller may reasonably retry.
  #[error("storage unavailable: {0}")]
  StorageUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn storage(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::StorageUnavailable(Box::new(e))
  }

  pub fn is_retryable(&self) -> bool {
    matches!(self, Self::StorageUnavailable(_))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
