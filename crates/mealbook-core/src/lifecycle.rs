//! Explicit lifecycle state carried by every persisted record.
//!
//! Nothing is filtered implicitly: uniqueness checks and queries match on
//! [`Lifecycle::Active`] themselves.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Lifecycle {
  #[default]
  Active,
  /// Terminal. A deleted record never becomes active again.
  Deleted { at: DateTime<Utc> },
}

impl Lifecycle {
  pub fn is_active(&self) -> bool { matches!(self, Self::Active) }

  /// Map the nullable `deleted_at` column used by storage backends.
  pub fn from_deleted_at(deleted_at: Option<DateTime<Utc>>) -> Self {
    match deleted_at {
      Some(at) => Self::Deleted { at },
      None => Self::Active,
    }
  }

  pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
    match self {
      Self::Active => None,
      Self::Deleted { at } => Some(*at),
    }
  }
}
