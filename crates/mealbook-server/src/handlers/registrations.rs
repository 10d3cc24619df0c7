//! Handlers for registration endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `PUT`    | `/registrations` | Upsert; body: [`UpsertBody`] |
//! | `GET`    | `/registrations` | Optional `identity_id`, `from`, `to`, `meal_type`, `limit` |
//! | `DELETE` | `/registrations/{id}` | Idempotent |
//! | `GET`    | `/tally?date=` | Admin only |
//!
//! Ordinary identities only see and change their own registrations.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
};
use chrono::NaiveDate;
use mealbook_core::{
  registration::{MealType, NewRegistration, Registration},
  store::{DateRange, RegistrationFilter},
  tally::{DailyTally, daily_tally},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  AppState, Backend,
  auth::CurrentIdentity,
  error::Result,
};

const DEFAULT_LIST_LIMIT: usize = 500;

// ─── Upsert ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UpsertBody {
  /// Defaults to the caller.
  pub identity_id:   Option<Uuid>,
  pub date:          NaiveDate,
  pub meal_type:     MealType,
  pub participating: bool,
  #[serde(default)]
  pub guest_count:   i64,
  #[serde(default)]
  pub guest_company: String,
}

/// `PUT /registrations`
pub async fn upsert<S: Backend>(
  State(state): State<AppState<S>>,
  caller: CurrentIdentity,
  Json(body): Json<UpsertBody>,
) -> Result<Json<Registration>> {
  let identity_id = body.identity_id.unwrap_or(caller.id());
  caller.require_self_or_admin(identity_id)?;

  let input = NewRegistration {
    identity_id,
    date: body.date,
    meal_type: body.meal_type,
    participating: body.participating,
    guest_count: body.guest_count,
    guest_company: body.guest_company,
  };
  Ok(Json(state.store.upsert(input).await?))
}

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub identity_id: Option<Uuid>,
  /// Inclusive lower bound.
  pub from:        Option<NaiveDate>,
  /// Inclusive upper bound.
  pub to:          Option<NaiveDate>,
  pub meal_type:   Option<MealType>,
  pub limit:       Option<usize>,
}

impl ListParams {
  fn date_range(&self) -> Option<DateRange> {
    match (self.from, self.to) {
      (None, None) => None,
      (from, to) => Some(DateRange { from, to }),
    }
  }
}

/// `GET /registrations`
pub async fn list<S: Backend>(
  State(state): State<AppState<S>>,
  caller: CurrentIdentity,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Registration>>> {
  let identity_id = match params.identity_id {
    Some(id) => {
      caller.require_self_or_admin(id)?;
      Some(id)
    }
    None if caller.0.is_admin => None,
    None => Some(caller.id()),
  };

  let filter = RegistrationFilter {
    identity_id,
    date_range: params.date_range(),
    meal_type: params.meal_type,
  };
  let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT);

  let mut pager = state.store.query(filter).page_size(limit.min(100));
  let mut out = Vec::new();
  while out.len() < limit {
    match pager.next().await? {
      Some(r) => out.push(r),
      None => break,
    }
  }
  Ok(Json(out))
}

// ─── Remove ──────────────────────────────────────────────────────────────────

/// `DELETE /registrations/{id}`
pub async fn remove<S: Backend>(
  State(state): State<AppState<S>>,
  caller: CurrentIdentity,
  Path(id): Path<Uuid>,
) -> Result<StatusCode> {
  // Absent or already removed: nothing to do.
  let Some(existing) = state.store.get_registration(id).await? else {
    return Ok(StatusCode::NO_CONTENT);
  };
  caller.require_self_or_admin(existing.identity_id)?;
  state.store.remove(id).await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Tally ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TallyParams {
  pub date: NaiveDate,
}

/// `GET /tally?date=YYYY-MM-DD`
pub async fn tally<S: Backend>(
  State(state): State<AppState<S>>,
  caller: CurrentIdentity,
  Query(params): Query<TallyParams>,
) -> Result<Json<DailyTally>> {
  caller.require_admin()?;
  Ok(Json(daily_tally(state.store.as_ref(), params.date).await?))
}
