//! SQLite-backed local mirror store.
//!
//! Two tables: `credentials` keyed by (user_id, service), and `events`
//! keyed by local_id with an optional remote identity of
//! (external_id, external_calendar_id). Timestamps are epoch seconds.

mod credentials;
mod events;

pub use events::{dedup_events, ReplaceStats};

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use almanac_core::SyncError;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS credentials (
    user_id TEXT NOT NULL,
    service TEXT NOT NULL,
    access_token TEXT NOT NULL,
    refresh_token TEXT NOT NULL,
    expires_at INTEGER NOT NULL,
    last_sync_at INTEGER,
    invalid INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (user_id, service)
);

CREATE TABLE IF NOT EXISTS events (
    local_id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    external_id TEXT,
    external_calendar_id TEXT,
    title TEXT NOT NULL,
    description TEXT,
    start_at INTEGER NOT NULL,
    end_at INTEGER NOT NULL,
    all_day INTEGER NOT NULL DEFAULT 0,
    location TEXT,
    attendees TEXT,
    status TEXT NOT NULL,
    origin TEXT NOT NULL,
    color_hex TEXT,
    last_modified INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_events_user_start ON events(user_id, start_at);
CREATE INDEX IF NOT EXISTS idx_events_partition ON events(user_id, external_calendar_id, origin);
";

/// Handle to the local mirror database. Cheap to clone; access is
/// serialized through a single connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self, SyncError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SyncError::Storage(e.to_string()))?;
        }
        let conn = Connection::open(path).map_err(storage_err)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, SyncError> {
        Self::from_connection(Connection::open_in_memory().map_err(storage_err)?)
    }

    fn from_connection(conn: Connection) -> Result<Self, SyncError> {
        conn.execute_batch(SCHEMA).map_err(storage_err)?;
        Ok(Database {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub(crate) fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub(crate) fn storage_err(e: rusqlite::Error) -> SyncError {
    SyncError::Storage(e.to_string())
}

pub(crate) fn to_ts(dt: DateTime<Utc>) -> i64 {
    dt.timestamp()
}

pub(crate) fn from_ts(ts: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(ts, 0).unwrap_or_default()
}
