//! HTTP layer for Mealbook.
//!
//! Exposes an axum [`Router`] serving JSON over any store that implements
//! both [`IdentityStore`] and [`RegistrationLedger`]. The router can only be
//! built from an [`AppState`], and an `AppState` can only be built once the
//! administrative bootstrap has completed.

pub mod auth;
pub mod error;
pub mod handlers;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{delete, get, put},
};
use mealbook_core::{
  bootstrap::{DEFAULT_ADMIN_PASSWORD, DEFAULT_ADMIN_USERNAME, Ensured},
  store::{IdentityStore, RegistrationLedger},
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use handlers::{health, identities, registrations};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `MEALBOOK_*` environment variables.
///
/// Deliberately not `Debug`: it carries the initial admin password.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                   String,
  #[serde(default = "default_port")]
  pub port:                   u16,
  #[serde(default = "default_store_path")]
  pub store_path:             PathBuf,
  /// Reserved username of the administrative identity.
  #[serde(default = "default_admin_username")]
  pub admin_username:         String,
  /// Password given to the administrative identity on first boot only.
  #[serde(default = "default_admin_password")]
  pub admin_initial_password: String,
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_store_path() -> PathBuf { PathBuf::from("mealbook.db") }
fn default_admin_username() -> String { DEFAULT_ADMIN_USERNAME.to_string() }
fn default_admin_password() -> String { DEFAULT_ADMIN_PASSWORD.to_string() }

// ─── Application state ────────────────────────────────────────────────────────

/// Everything a handler needs from the store.
pub trait Backend: IdentityStore + RegistrationLedger + Clone + 'static {}

impl<T: IdentityStore + RegistrationLedger + Clone + 'static> Backend for T {}

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: Backend> {
  pub store:  Arc<S>,
  pub config: Arc<ServerConfig>,
}

impl<S: Backend> AppState<S> {
  /// Requires proof that the administrative bootstrap ran against `store`.
  pub fn new(store: S, config: ServerConfig, ensured: &Ensured) -> Self {
    tracing::debug!(admin = %ensured.admin().username, "application state ready");
    Self { store: Arc::new(store), config: Arc::new(config) }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the axum [`Router`] with every route nested under `/api`.
pub fn router<S: Backend>(state: AppState<S>) -> Router {
  let api = Router::new()
    .route("/health", get(health::handler))
    .route("/me", get(identities::me))
    .route("/identities", get(identities::list::<S>).post(identities::create::<S>))
    .route("/identities/{id}", delete(identities::remove::<S>))
    .route("/identities/{id}/password", put(identities::set_password::<S>))
    .route(
      "/registrations",
      get(registrations::list::<S>).put(registrations::upsert::<S>),
    )
    .route("/registrations/{id}", delete(registrations::remove::<S>))
    .route("/tally", get(registrations::tally::<S>));

  Router::new()
    .nest("/api", api)
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
