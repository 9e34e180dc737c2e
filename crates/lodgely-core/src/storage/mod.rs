//! # Storage Module
//!
//! SQLite-backed persistence for users, session tokens, listings, images and
//! bookings.
//!
//! - One connection guarded by a mutex, shared by every request
//! - Foreign keys on, with cascading deletes from users and listings
//! - Schema created idempotently on open
//! - Every operation is a single parameterized statement

mod bookings;
mod images;
mod listings;
mod tokens;
mod users;

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::Result;

/// Schema, applied on every open.
const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS users (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at        TEXT    NOT NULL,
    name              TEXT    NOT NULL DEFAULT '',
    email             TEXT    NOT NULL UNIQUE COLLATE NOCASE,
    image             TEXT,
    password_hash     TEXT,
    activated         INTEGER NOT NULL DEFAULT 0,
    verification_code TEXT,
    reset_code        TEXT,
    email_change_code TEXT
);

CREATE TABLE IF NOT EXISTS tokens (
    hash    BLOB    PRIMARY KEY,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    expiry  TEXT    NOT NULL,
    scope   TEXT    NOT NULL
);
CREATE INDEX IF NOT EXISTS tokens_user_id_idx ON tokens(user_id);

CREATE TABLE IF NOT EXISTS listings (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at      TEXT    NOT NULL,
    title           TEXT    NOT NULL,
    description     TEXT    NOT NULL,
    category        TEXT    NOT NULL,
    bedrooms        INTEGER NOT NULL,
    bathrooms       INTEGER NOT NULL,
    guests          INTEGER NOT NULL,
    location_flag   TEXT    NOT NULL,
    location_label  TEXT    NOT NULL DEFAULT '',
    location_lat    REAL    NOT NULL,
    location_lng    REAL    NOT NULL,
    location_region TEXT    NOT NULL DEFAULT '',
    location_value  TEXT    NOT NULL DEFAULT '',
    price           INTEGER NOT NULL,
    owner_id        INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS listings_owner_id_idx ON listings(owner_id);

CREATE TABLE IF NOT EXISTS images (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    listing_id INTEGER NOT NULL REFERENCES listings(id) ON DELETE CASCADE,
    url        TEXT    NOT NULL
);
CREATE INDEX IF NOT EXISTS images_listing_id_idx ON images(listing_id);

CREATE TABLE IF NOT EXISTS bookings (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at TEXT    NOT NULL,
    listing_id INTEGER NOT NULL REFERENCES listings(id) ON DELETE CASCADE,
    guest_id   INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    check_in   TEXT    NOT NULL,
    check_out  TEXT    NOT NULL,
    price      INTEGER NOT NULL,
    total      INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS bookings_listing_id_idx ON bookings(listing_id);
CREATE INDEX IF NOT EXISTS bookings_guest_id_idx ON bookings(guest_id);
";

/// Handle to the marketplace database. Cheap to clone.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}

impl Database {
    /// Open (or create) the database file at `path`. `:memory:` opens a private in-memory database.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = if path.as_os_str() == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open(path)?
        };
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "busy_timeout", 3000)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Lock the connection. A panic in another holder does not corrupt SQLite state.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Names of the tables created by the schema, for diagnostics.
    pub fn table_names(&self) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_is_created() {
        let db = Database::open_in_memory().unwrap();
        let tables = db.table_names().unwrap();
        for table in ["bookings", "images", "listings", "tokens", "users"] {
            assert!(tables.iter().any(|t| t == table), "missing {table}");
        }
    }

    #[test]
    fn open_on_disk_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lodgely.db");
        {
            let db = Database::open(&path).unwrap();
            test_support::create_user(&db);
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(db.table_names().unwrap().len(), 5);
        assert!(path.exists());
    }

    #[test]
    fn memory_path_opens_in_memory() {
        let db = Database::open(":memory:").unwrap();
        assert!(!db.table_names().unwrap().is_empty());
    }
}
