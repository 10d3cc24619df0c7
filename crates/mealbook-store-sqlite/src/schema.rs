//! SQL schema for the Mealbook SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS identities (
    identity_id TEXT PRIMARY KEY,
    username    TEXT NOT NULL,
    credential  TEXT NOT NULL,
    is_admin    INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    deleted_at  TEXT             -- NULL while active
);

-- Usernames are unique among active identities only.
CREATE UNIQUE INDEX IF NOT EXISTS identities_username_active
    ON identities(username) WHERE deleted_at IS NULL;

CREATE TABLE IF NOT EXISTS registrations (
    registration_id TEXT PRIMARY KEY,
    identity_id     TEXT NOT NULL REFERENCES identities(identity_id),
    meal_date       TEXT NOT NULL,   -- YYYY-MM-DD
    meal_type       TEXT NOT NULL,   -- 'breakfast' | 'lunch'; sorts in meal order
    participating   INTEGER NOT NULL,
    guest_count     INTEGER NOT NULL DEFAULT 0 CHECK (guest_count >= 0),
    guest_company   TEXT,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL,
    deleted_at      TEXT,
    CHECK (guest_count = 0 OR length(trim(guest_company)) > 0)
);

-- One active registration per identity, day and meal.
CREATE UNIQUE INDEX IF NOT EXISTS registrations_key_active
    ON registrations(identity_id, meal_date, meal_type) WHERE deleted_at IS NULL;

CREATE INDEX IF NOT EXISTS registrations_order_idx
    ON registrations(meal_date, meal_type, registration_id);

PRAGMA user_version = 1;
";
