//! Error types for the almanac sync engine.

use thiserror::Error;

/// Errors that can occur during sync runs and mutation propagation.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Credential is missing, invalid, or revoked; the user must re-consent.
    /// Aborts the enclosing sync run.
    #[error("Calendar credential expired or revoked; re-authentication required")]
    AuthExpired,

    /// Calendar enumeration failed. Without the calendar universe no
    /// partial sync is meaningful, so this aborts the run.
    #[error("Failed to list remote calendars: {0}")]
    CalendarList(String),

    /// Fetch/normalize/reconcile failure for one calendar. Recorded in the
    /// per-calendar breakdown, never raised across the run.
    #[error("Sync failed for calendar '{calendar_id}': {message}")]
    PerCalendarSync {
        calendar_id: String,
        message: String,
    },

    /// Best-effort push failure at the mutation boundary. Logged only;
    /// never surfaced as a user-facing failure.
    #[error("Remote propagation failed: {0}")]
    RemotePropagation(String),

    #[error("Event not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Remote request failed: {0}")]
    Http(String),
}

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;
