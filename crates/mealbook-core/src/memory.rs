//! In-memory store implementation for testing.
//!
//! Both record sets live behind one lock, so a check-and-write (identity
//! resolution plus registration upsert, or username check plus insert) runs
//! under a single write guard.

use std::{collections::HashMap, sync::Arc};

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
  Error, Result,
  identity::{Credential, Identity, NewIdentity},
  lifecycle::Lifecycle,
  registration::{NewRegistration, Registration},
  store::{IdentityStore, RegistrationCursor, RegistrationFilter, RegistrationLedger},
};

#[derive(Debug, Default)]
struct State {
  identities:    HashMap<Uuid, Identity>,
  registrations: HashMap<Uuid, Registration>,
}

impl State {
  fn active_identity(&self, id: Uuid) -> Option<&Identity> {
    self.identities.get(&id).filter(|i| i.lifecycle.is_active())
  }
}

/// In-memory Mealbook store. Cloning shares the underlying state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
  state: Arc<RwLock<State>>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }
}

impl IdentityStore for MemoryStore {
  async fn find_by_username(&self, username: &str) -> Result<Option<Identity>> {
    let state = self.state.read().await;
    Ok(
      state
        .identities
        .values()
        .find(|i| i.lifecycle.is_active() && i.username == username)
        .cloned(),
    )
  }

  async fn create(&self, input: NewIdentity) -> Result<Identity> {
    input.validate()?;
    let mut state = self.state.write().await;
    let taken = state
      .identities
      .values()
      .any(|i| i.lifecycle.is_active() && i.username == input.username);
    if taken {
      return Err(Error::DuplicateUsername(input.username));
    }
    let identity = input.into_identity(Utc::now());
    state.identities.insert(identity.identity_id, identity.clone());
    Ok(identity)
  }

  async fn get_identity(&self, id: Uuid) -> Result<Option<Identity>> {
    let state = self.state.read().await;
    Ok(state.active_identity(id).cloned())
  }

  async fn list_identities(&self) -> Result<Vec<Identity>> {
    let state = self.state.read().await;
    let mut all: Vec<Identity> = state
      .identities
      .values()
      .filter(|i| i.lifecycle.is_active())
      .cloned()
      .collect();
    all.sort_by(|a, b| a.username.cmp(&b.username));
    Ok(all)
  }

  async fn set_credential(&self, id: Uuid, credential: Credential) -> Result<Identity> {
    let mut state = self.state.write().await;
    let identity = state
      .identities
      .get_mut(&id)
      .filter(|i| i.lifecycle.is_active())
      .ok_or(Error::UnknownIdentity(id))?;
    identity.credential = credential;
    identity.updated_at = Utc::now();
    Ok(identity.clone())
  }

  async fn remove_identity(&self, id: Uuid) -> Result<()> {
    let mut state = self.state.write().await;
    if let Some(identity) = state.identities.get_mut(&id)
      && identity.lifecycle.is_active()
    {
      identity.lifecycle = Lifecycle::Deleted { at: Utc::now() };
    }
    Ok(())
  }
}

impl RegistrationLedger for MemoryStore {
  async fn upsert(&self, input: NewRegistration) -> Result<Registration> {
    let valid = input.validate()?;
    let key = valid.key;
    let now = Utc::now();

    let mut state = self.state.write().await;
    if state.active_identity(key.identity_id).is_none() {
      return Err(Error::UnknownIdentity(key.identity_id));
    }

    let existing = state
      .registrations
      .values_mut()
      .find(|r| r.lifecycle.is_active() && r.key() == key);
    if let Some(existing) = existing {
      valid.apply_to(existing, now);
      return Ok(existing.clone());
    }

    let registration = valid.into_registration(now);
    state
      .registrations
      .insert(registration.registration_id, registration.clone());
    Ok(registration)
  }

  async fn remove(&self, registration_id: Uuid) -> Result<()> {
    let mut state = self.state.write().await;
    if let Some(r) = state.registrations.get_mut(&registration_id)
      && r.lifecycle.is_active()
    {
      r.lifecycle = Lifecycle::Deleted { at: Utc::now() };
    }
    Ok(())
  }

  async fn get_registration(&self, registration_id: Uuid) -> Result<Option<Registration>> {
    let state = self.state.read().await;
    Ok(
      state
        .registrations
        .get(&registration_id)
        .filter(|r| r.lifecycle.is_active())
        .cloned(),
    )
  }

  async fn query_page(
    &self,
    filter: &RegistrationFilter,
    after: Option<RegistrationCursor>,
    limit: usize,
  ) -> Result<Vec<Registration>> {
    let state = self.state.read().await;
    let mut matching: Vec<&Registration> = state
      .registrations
      .values()
      .filter(|r| filter.matches(r))
      .filter(|r| after.is_none_or(|c| RegistrationCursor::from(*r) > c))
      .collect();
    matching.sort_by_key(|r| RegistrationCursor::from(*r));
    Ok(matching.into_iter().take(limit).cloned().collect())
  }
}
