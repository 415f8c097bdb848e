//! Event normalization: raw provider events into the canonical shape.

use chrono::Utc;
use uuid::Uuid;

use crate::event::{CanonicalEvent, EventOrigin, RawEventTime, RawRemoteEvent, RemoteCalendar};

pub const UNTITLED_EVENT: &str = "Untitled Event";
pub const DEFAULT_STATUS: &str = "confirmed";

/// Convert a fetched remote event into the canonical internal shape.
///
/// Returns `None` for events without a usable start; those cannot be
/// placed on a timeline and are dropped, matching the fetch-side skip.
///
/// An event is all-day iff the provider gives a date-only start. All-day
/// events canonicalize to an inclusive end of day: start 00:00:00, end
/// 23:59:59 on the start date. This deliberately replaces the provider's
/// exclusive end-date convention.
pub fn normalize(
    user_id: &str,
    raw: RawRemoteEvent,
    calendar: &RemoteCalendar,
) -> Option<CanonicalEvent> {
    let start = raw.start?;

    let (start_at, end_at, all_day) = match start {
        RawEventTime::Date(date) => {
            let start_at = date.and_hms_opt(0, 0, 0)?.and_utc();
            let end_at = date.and_hms_opt(23, 59, 59)?.and_utc();
            (start_at, end_at, true)
        }
        RawEventTime::DateTime(start_at) => {
            let end_at = match raw.end {
                Some(RawEventTime::DateTime(dt)) => dt,
                // Missing end (or a malformed date-only end on a timed
                // event) collapses to the zero-duration degenerate case.
                _ => start_at,
            };
            (start_at, end_at, false)
        }
    };

    let title = match raw.title {
        Some(t) if !t.trim().is_empty() => t,
        _ => UNTITLED_EVENT.to_string(),
    };

    let status = raw
        .status
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_STATUS.to_string());

    let attendees = if raw.attendees.is_empty() {
        None
    } else {
        Some(raw.attendees.join(","))
    };

    Some(CanonicalEvent {
        local_id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        external_id: Some(raw.id),
        external_calendar_id: Some(calendar.external_id.clone()),
        title,
        description: raw.description,
        start_at,
        end_at,
        all_day,
        location: raw.location,
        attendees,
        status,
        origin: EventOrigin::Remote,
        color_hex: raw.color_hex.or_else(|| calendar.color_hex.clone()),
        last_modified: raw.updated.unwrap_or_else(Utc::now),
    })
}
