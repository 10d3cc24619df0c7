//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, calendar dates are `YYYY-MM-DD`, UUIDs
//! are hyphenated lowercase. All three sort lexicographically in their
//! natural order, which the keyset pagination relies on.

use std::str::FromStr as _;

use chrono::{DateTime, NaiveDate, Utc};
use mealbook_core::{
  identity::{Credential, Identity},
  lifecycle::Lifecycle,
  registration::{MealType, Registration},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn encode_date(d: NaiveDate) -> String { d.format(DATE_FORMAT).to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_meal_type(m: MealType) -> &'static str {
  match m {
    MealType::Breakfast => "breakfast",
    MealType::Lunch => "lunch",
  }
}

pub fn decode_meal_type(s: &str) -> Result<MealType> {
  MealType::from_str(s).map_err(|_| Error::MealType(s.to_owned()))
}

fn decode_lifecycle(deleted_at: Option<String>) -> Result<Lifecycle> {
  Ok(Lifecycle::from_deleted_at(
    deleted_at.as_deref().map(decode_dt).transpose()?,
  ))
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const IDENTITY_COLUMNS: &str =
  "identity_id, username, credential, is_admin, created_at, updated_at, deleted_at";

/// Raw values read directly from an `identities` row.
pub struct RawIdentity {
  pub identity_id: String,
  pub username:    String,
  pub credential:  String,
  pub is_admin:    bool,
  pub created_at:  String,
  pub updated_at:  String,
  pub deleted_at:  Option<String>,
}

impl RawIdentity {
  /// Column order must match [`IDENTITY_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      identity_id: row.get(0)?,
      username:    row.get(1)?,
      credential:  row.get(2)?,
      is_admin:    row.get(3)?,
      created_at:  row.get(4)?,
      updated_at:  row.get(5)?,
      deleted_at:  row.get(6)?,
    })
  }

  pub fn into_identity(self) -> Result<Identity> {
    Ok(Identity {
      identity_id: decode_uuid(&self.identity_id)?,
      username:    self.username,
      credential:  Credential::new(self.credential),
      is_admin:    self.is_admin,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
      lifecycle:   decode_lifecycle(self.deleted_at)?,
    })
  }
}

pub const REGISTRATION_COLUMNS: &str = "registration_id, identity_id, meal_date, meal_type, \
   participating, guest_count, guest_company, created_at, updated_at, deleted_at";

/// Raw values read directly from a `registrations` row.
pub struct RawRegistration {
  pub registration_id: String,
  pub identity_id:     String,
  pub meal_date:       String,
  pub meal_type:       String,
  pub participating:   bool,
  pub guest_count:     u32,
  pub guest_company:   Option<String>,
  pub created_at:      String,
  pub updated_at:      String,
  pub deleted_at:      Option<String>,
}

impl RawRegistration {
  /// Column order must match [`REGISTRATION_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      registration_id: row.get(0)?,
      identity_id:     row.get(1)?,
      meal_date:       row.get(2)?,
      meal_type:       row.get(3)?,
      participating:   row.get(4)?,
      guest_count:     row.get(5)?,
      guest_company:   row.get(6)?,
      created_at:      row.get(7)?,
      updated_at:      row.get(8)?,
      deleted_at:      row.get(9)?,
    })
  }

  pub fn into_registration(self) -> Result<Registration> {
    Ok(Registration {
      registration_id: decode_uuid(&self.registration_id)?,
      identity_id:     decode_uuid(&self.identity_id)?,
      date:            decode_date(&self.meal_date)?,
      meal_type:       decode_meal_type(&self.meal_type)?,
      participating:   self.participating,
      guest_count:     self.guest_count,
      guest_company:   self.guest_company,
      created_at:      decode_dt(&self.created_at)?,
      updated_at:      decode_dt(&self.updated_at)?,
      lifecycle:       decode_lifecycle(self.deleted_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn dates_sort_lexicographically() {
    let a = encode_date(NaiveDate::from_ymd_opt(2024, 1, 9).unwrap());
    let b = encode_date(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
    assert!(a < b);
    assert_eq!(decode_date(&b).unwrap(), NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
  }

  #[test]
  fn meal_type_text_matches_core_order() {
    assert!(encode_meal_type(MealType::Breakfast) < encode_meal_type(MealType::Lunch));
    assert_eq!(decode_meal_type("lunch").unwrap(), MealType::Lunch);
    assert!(matches!(decode_meal_type("supper"), Err(Error::MealType(_))));
  }
}
