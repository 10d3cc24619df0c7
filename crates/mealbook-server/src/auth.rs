//! HTTP Basic authentication against the identity store.
//!
//! Each identity's credential is an argon2 PHC string. The server hashes
//! passwords before they reach the core, so the core only ever sees opaque
//! credentials.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, request::Parts},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use mealbook_core::{
  identity::{Credential, Identity},
  store::IdentityStore,
};
use rand_core::OsRng;
use uuid::Uuid;

use crate::{AppState, Backend, error::Error};

/// Hash a plaintext password into a storable credential.
pub fn hash_password(password: &str) -> Result<Credential, Error> {
  let salt = SaltString::generate(&mut OsRng);
  let hash = Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map_err(|e| Error::Internal(format!("argon2 error: {e}")))?
    .to_string();
  Ok(Credential::new(hash))
}

/// Check a plaintext password against a stored credential.
pub fn verify_password(password: &str, credential: &Credential) -> Result<(), Error> {
  let parsed_hash =
    PasswordHash::new(credential.expose()).map_err(|_| Error::Unauthorized)?;
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| Error::Unauthorized)
}

/// Split an `Authorization: Basic …` header into username and password.
fn basic_credentials(headers: &HeaderMap) -> Result<(String, String), Error> {
  let header_val = headers
    .get(axum::http::header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(Error::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(Error::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| Error::Unauthorized)?;
  let creds   = String::from_utf8(decoded).map_err(|_| Error::Unauthorized)?;

  let (username, password) = creds.split_once(':').ok_or(Error::Unauthorized)?;
  Ok((username.to_owned(), password.to_owned()))
}

/// Resolve the identity making the request.
pub async fn authenticate<S: IdentityStore>(
  headers: &HeaderMap,
  store:   &S,
) -> Result<Identity, Error> {
  let (username, password) = basic_credentials(headers)?;
  let identity = store
    .find_by_username(&username)
    .await?
    .ok_or(Error::Unauthorized)?;
  verify_password(&password, &identity.credential)?;
  Ok(identity)
}

/// The authenticated caller. Present in a handler means the request carried
/// valid credentials for an active identity.
pub struct CurrentIdentity(pub Identity);

impl CurrentIdentity {
  pub fn id(&self) -> Uuid { self.0.identity_id }

  pub fn require_admin(&self) -> Result<(), Error> {
    if self.0.is_admin { Ok(()) } else { Err(Error::Forbidden) }
  }

  /// Ordinary identities may only act on themselves.
  pub fn require_self_or_admin(&self, target: Uuid) -> Result<(), Error> {
    if self.0.is_admin || self.0.identity_id == target {
      Ok(())
    } else {
      Err(Error::Forbidden)
    }
  }
}

impl<S: Backend> FromRequestParts<AppState<S>> for CurrentIdentity {
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    authenticate(&parts.headers, state.store.as_ref())
      .await
      .map(CurrentIdentity)
  }
}
