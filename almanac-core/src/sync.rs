//! Sync run reporting types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one calendar's fetch → normalize → reconcile pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarSyncResult {
    pub calendar_id: String,
    pub calendar_name: String,
    pub event_count: usize,
    pub success: bool,
    pub error: Option<String>,
}

impl CalendarSyncResult {
    pub fn ok(calendar_id: &str, calendar_name: &str, event_count: usize) -> Self {
        CalendarSyncResult {
            calendar_id: calendar_id.to_string(),
            calendar_name: calendar_name.to_string(),
            event_count,
            success: true,
            error: None,
        }
    }

    pub fn failed(calendar_id: &str, calendar_name: &str, error: String) -> Self {
        CalendarSyncResult {
            calendar_id: calendar_id.to_string(),
            calendar_name: calendar_name.to_string(),
            event_count: 0,
            success: false,
            error: Some(error),
        }
    }
}

/// Aggregate result of one full sync run. Ephemeral; returned to the
/// caller and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRun {
    pub user_id: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub per_calendar: Vec<CalendarSyncResult>,
    pub total_synced: usize,
}

impl SyncRun {
    pub fn calendars_count(&self) -> usize {
        self.per_calendar.len()
    }

    pub fn failed_calendars(&self) -> usize {
        self.per_calendar.iter().filter(|r| !r.success).count()
    }
}

/// Remote-side outcome of a best-effort local mutation, reported as a
/// secondary status next to the always-committed local result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum RemoteStatus {
    /// The change reached the provider; external identifiers are attached.
    Linked,
    /// The change is committed locally only.
    LocalOnly { reason: String },
}
