//! Registration: one meal decision for one identity on one calendar date.
//!
//! A registration references its owner by identifier only. Resolving the
//! owner is an explicit call to
//! [`IdentityStore::get_identity`](crate::store::IdentityStore::get_identity).

use chrono::{DateTime, Datelike as _, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use uuid::Uuid;

use crate::{Error, Result, lifecycle::Lifecycle};

/// Whether `date` has a four-digit year, the span the ledger accepts.
pub fn date_in_range(date: NaiveDate) -> bool { (0..=9999).contains(&date.year()) }

// ─── MealType ────────────────────────────────────────────────────────────────

/// The meals a registration can cover. Declaration order is the query order:
/// breakfast sorts before lunch.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
  EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MealType {
  Breakfast,
  Lunch,
}

// ─── Registration ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
  pub registration_id: Uuid,
  pub identity_id:     Uuid,
  pub date:            NaiveDate,
  pub meal_type:       MealType,
  /// `true` = attending, `false` = abstaining.
  pub participating:   bool,
  pub guest_count:     u32,
  /// Present iff `guest_count > 0`.
  pub guest_company:   Option<String>,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
  pub lifecycle:       Lifecycle,
}

impl Registration {
  pub fn key(&self) -> RegistrationKey {
    RegistrationKey {
      identity_id: self.identity_id,
      date:        self.date,
      meal_type:   self.meal_type,
    }
  }
}

/// The (identity, date, meal type) triple that at most one active
/// registration may occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistrationKey {
  pub identity_id: Uuid,
  pub date:        NaiveDate,
  pub meal_type:   MealType,
}

// ─── NewRegistration ─────────────────────────────────────────────────────────

/// Input to [`crate::store::RegistrationLedger::upsert`], as supplied by a
/// caller. Nothing here has been validated yet.
#[derive(Debug, Clone, Deserialize)]
pub struct NewRegistration {
  pub identity_id:   Uuid,
  pub date:          NaiveDate,
  pub meal_type:     MealType,
  pub participating: bool,
  #[serde(default)]
  pub guest_count:   i64,
  #[serde(default)]
  pub guest_company: String,
}

impl NewRegistration {
  /// A plain attend/abstain decision with no guests.
  pub fn new(
    identity_id: Uuid,
    date: NaiveDate,
    meal_type: MealType,
    participating: bool,
  ) -> Self {
    Self {
      identity_id,
      date,
      meal_type,
      participating,
      guest_count: 0,
      guest_company: String::new(),
    }
  }

  pub fn with_guests(mut self, count: i64, company: impl Into<String>) -> Self {
    self.guest_count = count;
    self.guest_company = company.into();
    self
  }

  /// Check the guest fields and normalise them into storable form.
  ///
  /// Runs before any storage access, so a rejected input never touches the
  /// ledger. Identity resolution is left to the store because it must share
  /// the atomic unit with the write.
  pub fn validate(self) -> Result<ValidRegistration> {
    if !date_in_range(self.date) {
      return Err(Error::DateOutOfRange(self.date));
    }
    if self.guest_count < 0 {
      return Err(Error::InvalidGuestCount(self.guest_count));
    }
    let company = self.guest_company.trim();
    if self.guest_count > 0 && company.is_empty() {
      return Err(Error::MissingGuestCompany);
    }
    let guest_count = u32::try_from(self.guest_count)
      .map_err(|_| Error::InvalidGuestCount(self.guest_count))?;
    let guest_company = (guest_count > 0).then(|| company.to_owned());

    Ok(ValidRegistration {
      key: RegistrationKey {
        identity_id: self.identity_id,
        date:        self.date,
        meal_type:   self.meal_type,
      },
      participating: self.participating,
      guest_count,
      guest_company,
    })
  }
}

/// A [`NewRegistration`] whose guest fields satisfy the consistency rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidRegistration {
  pub key:           RegistrationKey,
  pub participating: bool,
  pub guest_count:   u32,
  pub guest_company: Option<String>,
}

impl ValidRegistration {
  /// Build a fresh record for a key that has no active registration.
  pub fn into_registration(self, now: DateTime<Utc>) -> Registration {
    Registration {
      registration_id: Uuid::new_v4(),
      identity_id:     self.key.identity_id,
      date:            self.key.date,
      meal_type:       self.key.meal_type,
      participating:   self.participating,
      guest_count:     self.guest_count,
      guest_company:   self.guest_company,
      created_at:      now,
      updated_at:      now,
      lifecycle:       Lifecycle::Active,
    }
  }

  /// Replace the mutable fields of an existing record in place. The
  /// identifier and creation time are preserved.
  pub fn apply_to(self, existing: &mut Registration, now: DateTime<Utc>) {
    existing.participating = self.participating;
    existing.guest_count = self.guest_count;
    existing.guest_company = self.guest_company;
    existing.updated_at = now;
  }
}
