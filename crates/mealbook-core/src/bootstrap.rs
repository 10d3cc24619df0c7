//! Idempotent administrative account bootstrap.
//!
//! Run once per process start, after the store reports ready and before any
//! ledger operation. The procedure takes the store as an argument rather than
//! relying on global initialisation order, so it runs the same against the
//! SQLite backend and [`crate::memory::MemoryStore`].

use tracing::{info, warn};

use crate::{
  Error, Result,
  identity::{Credential, Identity, NewIdentity},
  store::IdentityStore,
};

/// Username reserved for the administrative identity.
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
/// Password given to the administrative identity when it is first created.
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin1234";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapState {
  Unchecked,
  Ensured,
}

/// What [`AdminBootstrap::ensure`] found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
  /// This call created the administrative identity.
  Created,
  /// The identity already existed, possibly created by a concurrent starter.
  /// It was left untouched.
  AlreadyPresent,
}

/// Proof that the bootstrap completed. Application state that exposes the
/// ledger is built from this.
///
/// Only [`AdminBootstrap::ensure`] can build one.
#[derive(Debug, Clone)]
pub struct Ensured {
  admin:   Identity,
  outcome: BootstrapOutcome,
}

impl Ensured {
  /// The identity holding the reserved administrative username.
  pub fn admin(&self) -> &Identity { &self.admin }

  pub fn outcome(&self) -> BootstrapOutcome { self.outcome }
}

#[derive(Debug)]
pub struct AdminBootstrap {
  username:           String,
  initial_credential: Credential,
  state:              BootstrapState,
}

impl AdminBootstrap {
  pub fn new(username: impl Into<String>, initial_credential: Credential) -> Self {
    Self {
      username: username.into(),
      initial_credential,
      state: BootstrapState::Unchecked,
    }
  }

  pub fn state(&self) -> BootstrapState { self.state }

  /// Make sure the administrative identity exists.
  ///
  /// Never overwrites an existing identity: a credential changed after first
  /// boot survives every later restart. Safe to call repeatedly; later calls
  /// observe the identity and do nothing.
  pub async fn ensure<S: IdentityStore>(&mut self, store: &S) -> Result<Ensured> {
    let ensured = match store.find_by_username(&self.username).await? {
      Some(existing) => self.already_present(existing),
      None => {
        let input =
          NewIdentity::admin(self.username.clone(), self.initial_credential.clone());
        match store.create(input).await {
          Ok(admin) => {
            info!(username = %admin.username, id = %admin.identity_id, "created administrative identity");
            Ensured { admin, outcome: BootstrapOutcome::Created }
          }
          // Lost a race with another starter; its record is the one we keep.
          Err(Error::DuplicateUsername(_)) => {
            let existing = store
              .find_by_username(&self.username)
              .await?
              .ok_or_else(|| Error::DuplicateUsername(self.username.clone()))?;
            self.already_present(existing)
          }
          Err(e) => return Err(e),
        }
      }
    };

    self.state = BootstrapState::Ensured;
    Ok(ensured)
  }

  fn already_present(&self, existing: Identity) -> Ensured {
    if !existing.is_admin {
      warn!(username = %existing.username, "reserved administrative username belongs to a non-admin identity");
    } else {
      info!(username = %existing.username, "administrative identity already present");
    }
    Ensured { admin: existing, outcome: BootstrapOutcome::AlreadyPresent }
  }
}

impl Default for AdminBootstrap {
  fn default() -> Self {
    Self::new(DEFAULT_ADMIN_USERNAME, Credential::new(DEFAULT_ADMIN_PASSWORD))
  }
}
