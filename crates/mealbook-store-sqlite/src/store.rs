//! [`SqliteStore`], the SQLite implementation of [`IdentityStore`] and
//! [`RegistrationLedger`].

use std::{path::Path, time::Duration};

use chrono::{Datelike as _, Utc};
use mealbook_core::{
  Error as CoreError, Result as CoreResult,
  identity::{Credential, Identity, NewIdentity},
  registration::{NewRegistration, Registration, date_in_range},
  store::{IdentityStore, RegistrationCursor, RegistrationFilter, RegistrationLedger},
};
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use tracing::debug;
use uuid::Uuid;

use crate::{
  Result,
  encode::{
    IDENTITY_COLUMNS, REGISTRATION_COLUMNS, RawIdentity, RawRegistration, encode_date,
    encode_dt, encode_meal_type, encode_uuid,
  },
  schema::SCHEMA,
};

/// Whether a write bounced off one of the partial unique indexes.
fn is_unique_violation(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(err, _)
      if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
  )
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Mealbook store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── IdentityStore impl ──────────────────────────────────────────────────────

impl IdentityStore for SqliteStore {
  async fn find_by_username(&self, username: &str) -> CoreResult<Option<Identity>> {
    let username = username.to_owned();

    let raw: Option<RawIdentity> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {IDENTITY_COLUMNS} FROM identities
                 WHERE username = ?1 AND deleted_at IS NULL"
              ),
              rusqlite::params![username],
              RawIdentity::from_row,
            )
            .optional()?,
        )
      })
      .await
      .map_err(crate::Error::from)?;

    Ok(raw.map(RawIdentity::into_identity).transpose()?)
  }

  async fn create(&self, input: NewIdentity) -> CoreResult<Identity> {
    input.validate()?;
    let identity = input.into_identity(Utc::now());

    let id_str     = encode_uuid(identity.identity_id);
    let username   = identity.username.clone();
    let credential = identity.credential.expose().to_owned();
    let is_admin   = identity.is_admin;
    let at_str     = encode_dt(identity.created_at);

    // The partial unique index makes the username check and the insert one
    // atomic step.
    let inserted = self
      .conn
      .call(move |conn| {
        let result = conn.execute(
          "INSERT INTO identities
             (identity_id, username, credential, is_admin, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
          rusqlite::params![id_str, username, credential, is_admin, at_str],
        );
        match result {
          Ok(_) => Ok(true),
          Err(e) if is_unique_violation(&e) => Ok(false),
          Err(e) => Err(e.into()),
        }
      })
      .await
      .map_err(crate::Error::from)?;

    if !inserted {
      return Err(CoreError::DuplicateUsername(identity.username));
    }
    debug!(id = %identity.identity_id, username = %identity.username, "identity created");
    Ok(identity)
  }

  async fn get_identity(&self, id: Uuid) -> CoreResult<Option<Identity>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawIdentity> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {IDENTITY_COLUMNS} FROM identities
                 WHERE identity_id = ?1 AND deleted_at IS NULL"
              ),
              rusqlite::params![id_str],
              RawIdentity::from_row,
            )
            .optional()?,
        )
      })
      .await
      .map_err(crate::Error::from)?;

    Ok(raw.map(RawIdentity::into_identity).transpose()?)
  }

  async fn list_identities(&self) -> CoreResult<Vec<Identity>> {
    let raws: Vec<RawIdentity> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {IDENTITY_COLUMNS} FROM identities
           WHERE deleted_at IS NULL
           ORDER BY username"
        ))?;
        let rows = stmt
          .query_map([], RawIdentity::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(crate::Error::from)?;

    Ok(
      raws
        .into_iter()
        .map(RawIdentity::into_identity)
        .collect::<Result<_>>()?,
    )
  }

  async fn set_credential(&self, id: Uuid, credential: Credential) -> CoreResult<Identity> {
    let id_str = encode_uuid(id);
    let secret = credential.expose().to_owned();
    let at_str = encode_dt(Utc::now());

    let raw: Option<RawIdentity> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "UPDATE identities SET credential = ?2, updated_at = ?3
                 WHERE identity_id = ?1 AND deleted_at IS NULL
                 RETURNING {IDENTITY_COLUMNS}"
              ),
              rusqlite::params![id_str, secret, at_str],
              RawIdentity::from_row,
            )
            .optional()?,
        )
      })
      .await
      .map_err(crate::Error::from)?;

    match raw {
      Some(raw) => Ok(raw.into_identity()?),
      None => Err(CoreError::UnknownIdentity(id)),
    }
  }

  async fn remove_identity(&self, id: Uuid) -> CoreResult<()> {
    let id_str = encode_uuid(id);
    let at_str = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE identities SET deleted_at = ?2, updated_at = ?2
           WHERE identity_id = ?1 AND deleted_at IS NULL",
          rusqlite::params![id_str, at_str],
        )?;
        Ok(())
      })
      .await
      .map_err(crate::Error::from)?;
    Ok(())
  }
}

// ─── RegistrationLedger impl ─────────────────────────────────────────────────

impl RegistrationLedger for SqliteStore {
  async fn upsert(&self, input: NewRegistration) -> CoreResult<Registration> {
    let valid = input.validate()?;
    let identity_id = valid.key.identity_id;
    // Only used when the key is free; an update keeps the existing id.
    let fresh = valid.into_registration(Utc::now());

    let reg_id_str      = encode_uuid(fresh.registration_id);
    let identity_id_str = encode_uuid(identity_id);
    let date_str        = encode_date(fresh.date);
    let meal_str        = encode_meal_type(fresh.meal_type);
    let participating   = fresh.participating;
    let guest_count     = fresh.guest_count;
    let guest_company   = fresh.guest_company.clone();
    let at_str          = encode_dt(fresh.created_at);

    // Identity resolution and the replace-or-create decision run inside one
    // IMMEDIATE transaction; the partial unique index is the conflict target.
    let raw: Option<RawRegistration> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let known = tx
          .query_row(
            "SELECT 1 FROM identities WHERE identity_id = ?1 AND deleted_at IS NULL",
            rusqlite::params![identity_id_str],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if !known {
          return Ok(None);
        }

        let raw = tx.query_row(
          &format!(
            "INSERT INTO registrations (
               registration_id, identity_id, meal_date, meal_type,
               participating, guest_count, guest_company, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
             ON CONFLICT (identity_id, meal_date, meal_type) WHERE deleted_at IS NULL
             DO UPDATE SET
               participating = excluded.participating,
               guest_count   = excluded.guest_count,
               guest_company = excluded.guest_company,
               updated_at    = excluded.updated_at
             RETURNING {REGISTRATION_COLUMNS}"
          ),
          rusqlite::params![
            reg_id_str,
            identity_id_str,
            date_str,
            meal_str,
            participating,
            guest_count,
            guest_company,
            at_str,
          ],
          RawRegistration::from_row,
        )?;

        tx.commit()?;
        Ok(Some(raw))
      })
      .await
      .map_err(crate::Error::from)?;

    let registration = raw
      .ok_or(CoreError::UnknownIdentity(identity_id))?
      .into_registration()?;
    debug!(
      id = %registration.registration_id,
      identity = %identity_id,
      date = %registration.date,
      meal = %registration.meal_type,
      "registration upserted"
    );
    Ok(registration)
  }

  async fn remove(&self, registration_id: Uuid) -> CoreResult<()> {
    let id_str = encode_uuid(registration_id);
    let at_str = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE registrations SET deleted_at = ?2, updated_at = ?2
           WHERE registration_id = ?1 AND deleted_at IS NULL",
          rusqlite::params![id_str, at_str],
        )?;
        Ok(())
      })
      .await
      .map_err(crate::Error::from)?;
    Ok(())
  }

  async fn get_registration(&self, registration_id: Uuid) -> CoreResult<Option<Registration>> {
    let id_str = encode_uuid(registration_id);

    let raw: Option<RawRegistration> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {REGISTRATION_COLUMNS} FROM registrations
                 WHERE registration_id = ?1 AND deleted_at IS NULL"
              ),
              rusqlite::params![id_str],
              RawRegistration::from_row,
            )
            .optional()?,
        )
      })
      .await
      .map_err(crate::Error::from)?;

    Ok(raw.map(RawRegistration::into_registration).transpose()?)
  }

  async fn query_page(
    &self,
    filter: &RegistrationFilter,
    after:  Option<RegistrationCursor>,
    limit:  usize,
  ) -> CoreResult<Vec<Registration>> {
    // Stored dates all have four-digit years, and only those encode in an
    // order-preserving way. Bounds past that span either admit everything on
    // their side (dropped) or nothing at all (empty page).
    let range = filter.date_range.unwrap_or_default();
    let after = after.filter(|c| c.date.year() >= 0);
    if range.from.is_some_and(|d| d.year() > 9999)
      || range.to.is_some_and(|d| d.year() < 0)
      || after.is_some_and(|c| c.date.year() > 9999)
    {
      return Ok(Vec::new());
    }

    let identity_str = filter.identity_id.map(encode_uuid);
    let from_str     = range.from.filter(|d| date_in_range(*d)).map(encode_date);
    let to_str       = range.to.filter(|d| date_in_range(*d)).map(encode_date);
    let meal_str     = filter.meal_type.map(encode_meal_type);
    let after_date   = after.map(|c| encode_date(c.date));
    let after_meal   = after.map(|c| encode_meal_type(c.meal_type));
    let after_id     = after.map(|c| encode_uuid(c.registration_id));
    let limit_val    = i64::try_from(limit).unwrap_or(i64::MAX);

    let raws: Vec<RawRegistration> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {REGISTRATION_COLUMNS} FROM registrations
           WHERE deleted_at IS NULL
             AND (?1 IS NULL OR identity_id = ?1)
             AND (?2 IS NULL OR meal_date >= ?2)
             AND (?3 IS NULL OR meal_date <= ?3)
             AND (?4 IS NULL OR meal_type = ?4)
             AND (?5 IS NULL OR (meal_date, meal_type, registration_id) > (?5, ?6, ?7))
           ORDER BY meal_date, meal_type, registration_id
           LIMIT ?8"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![
              identity_str,
              from_str,
              to_str,
              meal_str,
              after_date,
              after_meal,
              after_id,
              limit_val,
            ],
            RawRegistration::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(crate::Error::from)?;

    Ok(
      raws
        .into_iter()
        .map(RawRegistration::into_registration)
        .collect::<Result<_>>()?,
    )
  }
}
