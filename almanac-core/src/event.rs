//! Provider-neutral event types.
//!
//! Providers convert their API responses into `RawRemoteEvent`; the
//! normalizer turns those into `CanonicalEvent`, and the server's store,
//! reconciliation, and HTTP layers work exclusively with the canonical
//! shape.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where a mirrored event row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventOrigin {
    /// Created locally by the user; pushed to the remote best-effort.
    Local,
    /// Mirrored from the remote provider; destroyed and recreated
    /// wholesale on every sync cycle.
    Remote,
}

impl EventOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventOrigin::Local => "local",
            EventOrigin::Remote => "remote",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "remote" => EventOrigin::Remote,
            _ => EventOrigin::Local,
        }
    }
}

/// The canonical internal event representation, independent of origin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalEvent {
    /// Local row id. Remote-origin rows get a fresh one every sync cycle;
    /// only the external identifiers are stable across runs.
    pub local_id: String,
    pub user_id: String,
    /// Provider event id. `None` for local events not yet pushed.
    pub external_id: Option<String>,
    /// Provider calendar the event belongs to.
    pub external_calendar_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub all_day: bool,
    pub location: Option<String>,
    /// Comma-joined attendee addresses.
    pub attendees: Option<String>,
    /// "confirmed", "tentative", ...
    pub status: String,
    pub origin: EventOrigin,
    pub color_hex: Option<String>,
    pub last_modified: DateTime<Utc>,
}

impl CanonicalEvent {
    /// A locally created event, not yet linked to the remote provider.
    pub fn new_local(
        user_id: &str,
        title: String,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
    ) -> Self {
        CanonicalEvent {
            local_id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            external_id: None,
            external_calendar_id: None,
            title,
            description: None,
            start_at,
            end_at,
            all_day: false,
            location: None,
            attendees: None,
            status: "confirmed".to_string(),
            origin: EventOrigin::Local,
            color_hex: None,
            last_modified: Utc::now(),
        }
    }
}

/// A point in time as the provider reports it. Date-only starts mark
/// all-day events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RawEventTime {
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
}

/// A remote event as fetched, before normalization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRemoteEvent {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: Option<RawEventTime>,
    pub end: Option<RawEventTime>,
    pub status: Option<String>,
    /// Attendee email addresses; response status and role are discarded at
    /// the wire boundary.
    pub attendees: Vec<String>,
    pub color_hex: Option<String>,
    pub updated: Option<DateTime<Utc>>,
}

/// A calendar as listed by the provider. Re-fetched on every run, never
/// persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteCalendar {
    pub external_id: String,
    pub display_name: String,
    pub color_hex: Option<String>,
    pub access_role: Option<String>,
}
