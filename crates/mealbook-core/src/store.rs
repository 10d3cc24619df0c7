//! The `IdentityStore` and `RegistrationLedger` traits and supporting query
//! types.
//!
//! The traits are implemented by storage backends (`mealbook-store-sqlite`,
//! and [`crate::memory::MemoryStore`] for tests). The server depends on this
//! abstraction, not on any concrete backend.
//!
//! Every mutation that has a uniqueness rule (`create`, `upsert`) must be a
//! single atomic check-and-write inside the backend. A read followed by a
//! separate write is not an acceptable implementation.

use std::{collections::VecDeque, future::Future};

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
  Result,
  identity::{Credential, Identity, NewIdentity},
  registration::{MealType, NewRegistration, Registration},
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// An inclusive calendar date range. A `None` bound leaves that side open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
  pub from: Option<NaiveDate>,
  pub to:   Option<NaiveDate>,
}

impl DateRange {
  pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
    Self { from: Some(from), to: Some(to) }
  }

  pub fn day(date: NaiveDate) -> Self { Self::new(date, date) }

  /// Every date on or after `from`.
  pub fn starting(from: NaiveDate) -> Self {
    Self { from: Some(from), to: None }
  }

  /// Every date on or before `to`.
  pub fn until(to: NaiveDate) -> Self { Self { from: None, to: Some(to) } }

  pub fn contains(&self, date: NaiveDate) -> bool {
    self.from.is_none_or(|from| from <= date)
      && self.to.is_none_or(|to| date <= to)
  }
}

/// Parameters for [`RegistrationLedger::query`]. Every field narrows the
/// result; an empty filter matches every active registration.
#[derive(Debug, Clone, Default)]
pub struct RegistrationFilter {
  pub identity_id: Option<Uuid>,
  pub date_range:  Option<DateRange>,
  pub meal_type:   Option<MealType>,
}

impl RegistrationFilter {
  pub fn matches(&self, r: &Registration) -> bool {
    r.lifecycle.is_active()
      && self.identity_id.is_none_or(|id| id == r.identity_id)
      && self.date_range.is_none_or(|range| range.contains(r.date))
      && self.meal_type.is_none_or(|m| m == r.meal_type)
  }
}

/// Keyset position within the query order `(date, meal_type,
/// registration_id)`. A page starts strictly after the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RegistrationCursor {
  pub date:            NaiveDate,
  pub meal_type:       MealType,
  pub registration_id: Uuid,
}

impl From<&Registration> for RegistrationCursor {
  fn from(r: &Registration) -> Self {
    Self {
      date:            r.date,
      meal_type:       r.meal_type,
      registration_id: r.registration_id,
    }
  }
}

// ─── Traits ──────────────────────────────────────────────────────────────────

/// Account records. Only active identities are ever returned.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait IdentityStore: Send + Sync {
  /// Exact, case-sensitive lookup among active identities.
  fn find_by_username<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<Option<Identity>>> + Send + 'a;

  /// Persist a new identity with a freshly allocated identifier.
  ///
  /// Fails with [`Error::DuplicateUsername`](crate::Error::DuplicateUsername)
  /// if an active identity already holds the username.
  fn create(
    &self,
    input: NewIdentity,
  ) -> impl Future<Output = Result<Identity>> + Send + '_;

  /// Resolve an identity by id. Returns `None` if absent or deleted.
  fn get_identity(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Identity>>> + Send + '_;

  /// All active identities, ordered by username.
  fn list_identities(
    &self,
  ) -> impl Future<Output = Result<Vec<Identity>>> + Send + '_;

  /// Replace the credential of an active identity.
  fn set_credential(
    &self,
    id: Uuid,
    credential: Credential,
  ) -> impl Future<Output = Result<Identity>> + Send + '_;

  /// Soft-delete an identity, freeing its username. Idempotent.
  fn remove_identity(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<()>> + Send + '_;
}

/// Meal registrations keyed by (identity, date, meal type).
pub trait RegistrationLedger: Send + Sync {
  /// Create or replace the active registration for the input's key.
  ///
  /// Validation errors are reported before any storage access. An unknown
  /// or deleted identity yields
  /// [`Error::UnknownIdentity`](crate::Error::UnknownIdentity). An existing
  /// active registration keeps its identifier and has its fields replaced.
  fn upsert(
    &self,
    input: NewRegistration,
  ) -> impl Future<Output = Result<Registration>> + Send + '_;

  /// Mark a registration deleted. Removing an unknown or already-deleted id
  /// succeeds without effect.
  fn remove(
    &self,
    registration_id: Uuid,
  ) -> impl Future<Output = Result<()>> + Send + '_;

  /// Fetch one active registration.
  fn get_registration(
    &self,
    registration_id: Uuid,
  ) -> impl Future<Output = Result<Option<Registration>>> + Send + '_;

  /// Return at most `limit` active registrations matching `filter`, in query
  /// order, starting strictly after `after`.
  fn query_page<'a>(
    &'a self,
    filter: &'a RegistrationFilter,
    after: Option<RegistrationCursor>,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Registration>>> + Send + 'a;

  /// Lazily iterate every match of `filter` in query order. Each call
  /// returns an independent pager.
  fn query(&self, filter: RegistrationFilter) -> RegistrationPager<'_, Self>
  where
    Self: Sized,
  {
    RegistrationPager::new(self, filter)
  }
}

// ─── Pager ───────────────────────────────────────────────────────────────────

/// Lazy, finite cursor over a [`RegistrationLedger`] query.
///
/// Pages are fetched on demand; nothing is read until the first call to
/// [`next`](Self::next) or [`next_page`](Self::next_page).
pub struct RegistrationPager<'a, L> {
  ledger:    &'a L,
  filter:    RegistrationFilter,
  page_size: usize,
  after:     Option<RegistrationCursor>,
  buffer:    VecDeque<Registration>,
  exhausted: bool,
}

impl<'a, L: RegistrationLedger> RegistrationPager<'a, L> {
  pub const DEFAULT_PAGE_SIZE: usize = 100;

  pub fn new(ledger: &'a L, filter: RegistrationFilter) -> Self {
    Self {
      ledger,
      filter,
      page_size: Self::DEFAULT_PAGE_SIZE,
      after: None,
      buffer: VecDeque::new(),
      exhausted: false,
    }
  }

  /// Override the number of rows fetched per round trip (minimum 1).
  pub fn page_size(mut self, size: usize) -> Self {
    self.page_size = size.max(1);
    self
  }

  /// Start after a cursor taken from a previous traversal.
  pub fn starting_after(mut self, cursor: RegistrationCursor) -> Self {
    self.after = Some(cursor);
    self
  }

  /// The next registration, or `None` once the query is exhausted.
  pub async fn next(&mut self) -> Result<Option<Registration>> {
    if self.buffer.is_empty() {
      match self.next_page().await? {
        Some(page) => self.buffer.extend(page),
        None => return Ok(None),
      }
    }
    Ok(self.buffer.pop_front())
  }

  /// The next raw page, or `None` once the query is exhausted. Does not mix
  /// with buffered rows left over from [`next`](Self::next).
  pub async fn next_page(&mut self) -> Result<Option<Vec<Registration>>> {
    if self.exhausted {
      return Ok(None);
    }
    let page = self
      .ledger
      .query_page(&self.filter, self.after, self.page_size)
      .await?;

    if page.len() < self.page_size {
      self.exhausted = true;
    }
    match page.last() {
      Some(last) => {
        self.after = Some(last.into());
        Ok(Some(page))
      }
      None => {
        self.exhausted = true;
        Ok(None)
      }
    }
  }

  /// Drain the remaining registrations into a `Vec`.
  pub async fn collect_all(mut self) -> Result<Vec<Registration>> {
    let mut out: Vec<Registration> = self.buffer.drain(..).collect();
    while let Some(page) = self.next_page().await? {
      out.extend(page);
    }
    Ok(out)
  }
}
