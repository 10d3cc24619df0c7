//! Handlers for identity endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/me` | The authenticated caller |
//! | `GET`    | `/identities` | Admin only |
//! | `POST`   | `/identities` | Admin only; body: [`CreateBody`] |
//! | `PUT`    | `/identities/{id}/password` | Self or admin; body: [`PasswordBody`] |
//! | `DELETE` | `/identities/{id}` | Admin only; soft delete |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use mealbook_core::identity::{Identity, NewIdentity};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::{
  AppState, Backend,
  auth::{CurrentIdentity, hash_password},
  error::{Error, Result},
};

/// `GET /me`
pub async fn me(CurrentIdentity(identity): CurrentIdentity) -> Json<Identity> {
  Json(identity)
}

/// `GET /identities`
pub async fn list<S: Backend>(
  State(state): State<AppState<S>>,
  caller: CurrentIdentity,
) -> Result<Json<Vec<Identity>>> {
  caller.require_admin()?;
  Ok(Json(state.store.list_identities().await?))
}

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub username: String,
  pub password: String,
  #[serde(default)]
  pub is_admin: bool,
}

/// `POST /identities`
pub async fn create<S: Backend>(
  State(state): State<AppState<S>>,
  caller: CurrentIdentity,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse> {
  caller.require_admin()?;
  if body.password.is_empty() {
    return Err(Error::Unprocessable("password must not be empty".into()));
  }
  let input = NewIdentity {
    username:   body.username,
    credential: hash_password(&body.password)?,
    is_admin:   body.is_admin,
  };
  let identity = state.store.create(input).await?;
  info!(by = %caller.0.username, username = %identity.username, "identity created");
  Ok((StatusCode::CREATED, Json(identity)))
}

#[derive(Debug, Deserialize)]
pub struct PasswordBody {
  pub password: String,
}

/// `PUT /identities/{id}/password`
pub async fn set_password<S: Backend>(
  State(state): State<AppState<S>>,
  caller: CurrentIdentity,
  Path(id): Path<Uuid>,
  Json(body): Json<PasswordBody>,
) -> Result<StatusCode> {
  caller.require_self_or_admin(id)?;
  if body.password.is_empty() {
    return Err(Error::Unprocessable("password must not be empty".into()));
  }
  state
    .store
    .set_credential(id, hash_password(&body.password)?)
    .await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /identities/{id}`
pub async fn remove<S: Backend>(
  State(state): State<AppState<S>>,
  caller: CurrentIdentity,
  Path(id): Path<Uuid>,
) -> Result<StatusCode> {
  caller.require_admin()?;
  if id == caller.id() {
    return Err(Error::BadRequest("cannot delete the calling identity".into()));
  }
  state.store.remove_identity(id).await?;
  info!(by = %caller.0.username, %id, "identity removed");
  Ok(StatusCode::NO_CONTENT)
}
