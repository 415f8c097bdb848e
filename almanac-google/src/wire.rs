//! Calendar v3 wire types and conversions to/from the core shapes.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use almanac_core::{EventPayload, RawEventTime, RawRemoteEvent, RemoteCalendar};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CalendarList {
    pub items: Vec<CalendarListEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CalendarListEntry {
    pub id: String,
    pub summary: Option<String>,
    pub background_color: Option<String>,
    pub access_role: Option<String>,
}

impl From<CalendarListEntry> for RemoteCalendar {
    fn from(entry: CalendarListEntry) -> Self {
        RemoteCalendar {
            external_id: entry.id,
            display_name: entry
                .summary
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "(unnamed)".to_string()),
            color_hex: entry.background_color,
            access_role: entry.access_role,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventList {
    pub items: Vec<GoogleEvent>,
}

/// Google reports either a `date` (all-day) or a `dateTime` per boundary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GoogleEventTime {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_time: Option<DateTime<Utc>>,
}

impl GoogleEventTime {
    fn to_raw(&self) -> Option<RawEventTime> {
        if let Some(dt) = self.date_time {
            Some(RawEventTime::DateTime(dt))
        } else {
            self.date.map(RawEventTime::Date)
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GoogleAttendee {
    pub email: String,
    pub response_status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GoogleEvent {
    pub id: String,
    pub status: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: Option<GoogleEventTime>,
    pub end: Option<GoogleEventTime>,
    pub attendees: Vec<GoogleAttendee>,
    pub updated: Option<DateTime<Utc>>,
}

impl GoogleEvent {
    /// Whether the fetch loop should drop this entry before normalization.
    pub fn is_skippable(&self) -> bool {
        self.id.is_empty() || self.status.as_deref() == Some("cancelled")
    }
}

impl From<GoogleEvent> for RawRemoteEvent {
    fn from(event: GoogleEvent) -> Self {
        RawRemoteEvent {
            id: event.id,
            title: event.summary,
            description: event.description,
            location: event.location,
            start: event.start.and_then(|t| t.to_raw()),
            end: event.end.and_then(|t| t.to_raw()),
            status: event.status,
            // Response status and role are dropped here; only addresses
            // survive into the canonical shape.
            attendees: event
                .attendees
                .into_iter()
                .map(|a| a.email)
                .filter(|e| !e.is_empty())
                .collect(),
            color_hex: None,
            updated: event.updated,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleEventWrite {
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub start: GoogleEventTime,
    pub end: GoogleEventTime,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<GoogleAttendeeWrite>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GoogleAttendeeWrite {
    pub email: String,
}

impl From<&EventPayload> for GoogleEventWrite {
    fn from(payload: &EventPayload) -> Self {
        GoogleEventWrite {
            summary: payload.title.clone(),
            description: payload.description.clone(),
            location: payload.location.clone(),
            start: to_wire_time(&payload.start, false),
            end: to_wire_time(&payload.end, true),
            attendees: payload
                .attendees
                .iter()
                .map(|email| GoogleAttendeeWrite {
                    email: email.clone(),
                })
                .collect(),
        }
    }
}

/// Google's all-day end date is exclusive, so the inclusive canonical end
/// date moves forward one day on the way out.
fn to_wire_time(time: &RawEventTime, is_end: bool) -> GoogleEventTime {
    match time {
        RawEventTime::DateTime(dt) => GoogleEventTime {
            date: None,
            date_time: Some(*dt),
        },
        RawEventTime::Date(date) => GoogleEventTime {
            date: Some(if is_end {
                date.succ_opt().unwrap_or(*date)
            } else {
                *date
            }),
            date_time: None,
        },
    }
}
