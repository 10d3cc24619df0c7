//! Identity: an account able to hold registrations.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{Error, Result, lifecycle::Lifecycle};

// ─── Credential ──────────────────────────────────────────────────────────────

/// An opaque credential secret. The core never inspects it; the server stores
/// an argon2 PHC string here.
///
/// `Debug` is redacted and there is no `Serialize` impl, so a credential
/// cannot leak through logs or JSON.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
  pub fn new(secret: impl Into<String>) -> Self { Self(secret.into()) }

  pub fn expose(&self) -> &str { &self.0 }
}

impl fmt::Debug for Credential {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("Credential(<redacted>)")
  }
}

// ─── Identity ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
  pub identity_id: Uuid,
  /// Unique among active identities; compared case-sensitively.
  pub username:    String,
  #[serde(skip)]
  pub credential:  Credential,
  pub is_admin:    bool,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
  pub lifecycle:   Lifecycle,
}

/// Input to [`crate::store::IdentityStore::create`].
#[derive(Debug, Clone)]
pub struct NewIdentity {
  pub username:   String,
  pub credential: Credential,
  pub is_admin:   bool,
}

impl NewIdentity {
  pub fn new(username: impl Into<String>, credential: Credential) -> Self {
    Self { username: username.into(), credential, is_admin: false }
  }

  pub fn admin(username: impl Into<String>, credential: Credential) -> Self {
    Self { username: username.into(), credential, is_admin: true }
  }

  /// Reject blank usernames. The username is otherwise kept byte-for-byte.
  pub fn validate(&self) -> Result<()> {
    if self.username.trim().is_empty() {
      return Err(Error::InvalidUsername);
    }
    Ok(())
  }

  /// Build the persisted record with a fresh identifier.
  pub fn into_identity(self, now: DateTime<Utc>) -> Identity {
    Identity {
      identity_id: Uuid::new_v4(),
      username:    self.username,
      credential:  self.credential,
      is_admin:    self.is_admin,
      created_at:  now,
      updated_at:  now,
      lifecycle:   Lifecycle::Active,
    }
  }
}
