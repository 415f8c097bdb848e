//! Trait seams for the remote calendar provider and OAuth collaborator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::credential::TokenSet;
use crate::error::SyncError;
use crate::event::{CanonicalEvent, RawEventTime, RawRemoteEvent, RemoteCalendar};
use crate::window::SyncWindow;

/// Outbound event shape for mutation pushes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventPayload {
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: RawEventTime,
    pub end: RawEventTime,
    pub attendees: Vec<String>,
}

impl EventPayload {
    /// Build the outbound shape from a stored row, restoring the date-only
    /// representation for all-day events.
    pub fn from_event(event: &CanonicalEvent) -> Self {
        let (start, end) = if event.all_day {
            (
                RawEventTime::Date(event.start_at.date_naive()),
                RawEventTime::Date(event.end_at.date_naive()),
            )
        } else {
            (
                RawEventTime::DateTime(event.start_at),
                RawEventTime::DateTime(event.end_at),
            )
        };

        EventPayload {
            title: event.title.clone(),
            description: event.description.clone(),
            location: event.location.clone(),
            start,
            end,
            attendees: event
                .attendees
                .as_deref()
                .map(|csv| {
                    csv.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

/// Credential-scoped remote calendar operations.
#[async_trait]
pub trait RemoteCalendarApi: Send + Sync {
    /// List the user's calendars in provider-returned order.
    async fn list_calendars(&self, access_token: &str) -> Result<Vec<RemoteCalendar>, SyncError>;

    /// Fetch events for one calendar within the window, a single page up
    /// to `max_results`.
    async fn list_events(
        &self,
        access_token: &str,
        calendar_id: &str,
        window: &SyncWindow,
        max_results: u32,
    ) -> Result<Vec<RawRemoteEvent>, SyncError>;

    /// Create an event; returns it with the provider-assigned id.
    async fn insert_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        payload: &EventPayload,
    ) -> Result<RawRemoteEvent, SyncError>;

    async fn update_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
        payload: &EventPayload,
    ) -> Result<RawRemoteEvent, SyncError>;

    async fn delete_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
    ) -> Result<(), SyncError>;
}

/// OAuth token endpoint operations.
#[async_trait]
pub trait OAuthExchange: Send + Sync {
    async fn exchange_code(&self, code: &str) -> Result<TokenSet, SyncError>;

    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, SyncError>;
}
