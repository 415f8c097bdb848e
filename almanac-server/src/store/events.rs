//! Event rows: CRUD, the full-replace reconciliation primitive, and the
//! read-side merge.

use std::collections::HashSet;

use rusqlite::{params, OptionalExtension, Row};

use almanac_core::{CanonicalEvent, EventOrigin, SyncError};

use super::{from_ts, storage_err, to_ts, Database};

/// Row counts from a full-replace reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaceStats {
    pub deleted: usize,
    pub inserted: usize,
}

const EVENT_COLUMNS: &str = "local_id, user_id, external_id, external_calendar_id, title, \
     description, start_at, end_at, all_day, location, attendees, status, origin, color_hex, \
     last_modified";

const INSERT_EVENT: &str = "INSERT INTO events (local_id, user_id, external_id, \
     external_calendar_id, title, description, start_at, end_at, all_day, location, attendees, \
     status, origin, color_hex, last_modified) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)";

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<CanonicalEvent> {
    Ok(CanonicalEvent {
        local_id: row.get(0)?,
        user_id: row.get(1)?,
        external_id: row.get(2)?,
        external_calendar_id: row.get(3)?,
        title: row.get(4)?,
        description: row.get(5)?,
        start_at: from_ts(row.get(6)?),
        end_at: from_ts(row.get(7)?),
        all_day: row.get(8)?,
        location: row.get(9)?,
        attendees: row.get(10)?,
        status: row.get(11)?,
        origin: EventOrigin::parse(&row.get::<_, String>(12)?),
        color_hex: row.get(13)?,
        last_modified: from_ts(row.get(14)?),
    })
}

impl Database {
    pub fn insert_event(&self, event: &CanonicalEvent) -> Result<(), SyncError> {
        let start_at = to_ts(event.start_at);
        let end_at = to_ts(event.end_at);
        let last_modified = to_ts(event.last_modified);
        self.conn()
            .execute(
                INSERT_EVENT,
                params![
                    event.local_id,
                    event.user_id,
                    event.external_id,
                    event.external_calendar_id,
                    event.title,
                    event.description,
                    start_at,
                    end_at,
                    event.all_day,
                    event.location,
                    event.attendees,
                    event.status,
                    event.origin.as_str(),
                    event.color_hex,
                    last_modified,
                ],
            )
            .map_err(storage_err)?;
        Ok(())
    }

    pub fn get_event(
        &self,
        user_id: &str,
        local_id: &str,
    ) -> Result<Option<CanonicalEvent>, SyncError> {
        self.conn()
            .query_row(
                &format!(
                    "SELECT {} FROM events WHERE user_id = ?1 AND local_id = ?2",
                    EVENT_COLUMNS
                ),
                params![user_id, local_id],
                event_from_row,
            )
            .optional()
            .map_err(storage_err)
    }

    /// All of a user's events, remote- and local-origin, time-sorted. The
    /// caller applies [`dedup_events`] for the merged view.
    pub fn list_events(&self, user_id: &str) -> Result<Vec<CanonicalEvent>, SyncError> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM events WHERE user_id = ?1 ORDER BY start_at ASC, local_id ASC",
                EVENT_COLUMNS
            ))
            .map_err(storage_err)?;

        let rows = stmt
            .query_map(params![user_id], event_from_row)
            .map_err(storage_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(storage_err)?;

        Ok(rows)
    }

    pub fn update_event(&self, event: &CanonicalEvent) -> Result<(), SyncError> {
        let updated = self
            .conn()
            .execute(
                "UPDATE events SET title = ?3, description = ?4, start_at = ?5, end_at = ?6, \
                 all_day = ?7, location = ?8, attendees = ?9, status = ?10, color_hex = ?11, \
                 last_modified = ?12 \
                 WHERE user_id = ?1 AND local_id = ?2",
                params![
                    event.user_id,
                    event.local_id,
                    event.title,
                    event.description,
                    to_ts(event.start_at),
                    to_ts(event.end_at),
                    event.all_day,
                    event.location,
                    event.attendees,
                    event.status,
                    event.color_hex,
                    to_ts(event.last_modified),
                ],
            )
            .map_err(storage_err)?;

        if updated == 0 {
            return Err(SyncError::NotFound(event.local_id.clone()));
        }
        Ok(())
    }

    pub fn delete_event(&self, user_id: &str, local_id: &str) -> Result<(), SyncError> {
        let deleted = self
            .conn()
            .execute(
                "DELETE FROM events WHERE user_id = ?1 AND local_id = ?2",
                params![user_id, local_id],
            )
            .map_err(storage_err)?;

        if deleted == 0 {
            return Err(SyncError::NotFound(local_id.to_string()));
        }
        Ok(())
    }

    /// Attach the remote identity a successful push assigned to a local
    /// event. A no-op if the row has disappeared in the meantime.
    pub fn set_external_ids(
        &self,
        user_id: &str,
        local_id: &str,
        external_id: &str,
        external_calendar_id: &str,
    ) -> Result<(), SyncError> {
        self.conn()
            .execute(
                "UPDATE events SET external_id = ?3, external_calendar_id = ?4 \
                 WHERE user_id = ?1 AND local_id = ?2",
                params![user_id, local_id, external_id, external_calendar_id],
            )
            .map_err(storage_err)?;
        Ok(())
    }

    /// Full replace of one calendar's remote-origin partition: delete every
    /// remote-origin row for (user, calendar), then bulk-insert the fresh
    /// set. The delete fully completes before the insert begins; a crash
    /// between the two leaves the partition empty until the next
    /// successful run. Local-origin rows are untouched.
    pub fn replace_calendar_events(
        &self,
        user_id: &str,
        calendar_external_id: &str,
        events: &[CanonicalEvent],
    ) -> Result<ReplaceStats, SyncError> {
        let conn = self.conn();

        let deleted = conn
            .execute(
                "DELETE FROM events WHERE user_id = ?1 AND external_calendar_id = ?2 \
                 AND origin = 'remote'",
                params![user_id, calendar_external_id],
            )
            .map_err(storage_err)?;

        let mut stmt = conn.prepare(INSERT_EVENT).map_err(storage_err)?;
        for event in events {
            stmt.execute(params![
                event.local_id,
                event.user_id,
                event.external_id,
                event.external_calendar_id,
                event.title,
                event.description,
                to_ts(event.start_at),
                to_ts(event.end_at),
                event.all_day,
                event.location,
                event.attendees,
                event.status,
                event.origin.as_str(),
                event.color_hex,
                to_ts(event.last_modified),
            ])
            .map_err(storage_err)?;
        }

        Ok(ReplaceStats {
            deleted,
            inserted: events.len(),
        })
    }
}

/// Read-side de-duplication: when two rows share an external id (a fresh
/// remote-origin row and a stale local copy), the remote-origin row wins.
pub fn dedup_events(events: Vec<CanonicalEvent>) -> Vec<CanonicalEvent> {
    let remote_ids: HashSet<String> = events
        .iter()
        .filter(|e| e.origin == EventOrigin::Remote)
        .filter_map(|e| e.external_id.clone())
        .collect();

    events
        .into_iter()
        .filter(|e| {
            e.origin == EventOrigin::Remote
                || e.external_id
                    .as_deref()
                    .map_or(true, |id| !remote_ids.contains(id))
        })
        .collect()
}
