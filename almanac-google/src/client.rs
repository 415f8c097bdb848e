//! Calendar v3 REST client implementing the core remote trait.

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;
use url::Url;

use almanac_core::{
    EventPayload, RawRemoteEvent, RemoteCalendarApi, RemoteCalendar, SyncError, SyncWindow,
};

use crate::wire::{CalendarList, EventList, GoogleEvent, GoogleEventWrite};

const API_BASE: &str = "https://www.googleapis.com/calendar/v3";

#[derive(Debug, Clone, Default)]
pub struct GoogleCalendarClient {
    http: reqwest::Client,
}

impl GoogleCalendarClient {
    pub fn new() -> Self {
        GoogleCalendarClient {
            http: reqwest::Client::new(),
        }
    }

    /// `{base}/calendars/{id}/events[/{event_id}]`, with the calendar id
    /// percent-encoded (Google ids contain `@` and `#`).
    fn events_url(&self, calendar_id: &str, event_id: Option<&str>) -> Result<Url, SyncError> {
        let mut url =
            Url::parse(API_BASE).map_err(|e| SyncError::Http(format!("bad base URL: {}", e)))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| SyncError::Http("base URL cannot carry segments".to_string()))?;
            segments.push("calendars").push(calendar_id).push("events");
            if let Some(id) = event_id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    async fn check(&self, response: reqwest::Response) -> Result<reqwest::Response, SyncError> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(SyncError::AuthExpired);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Http(format!("{}: {}", status, body)));
        }
        Ok(response)
    }
}

#[async_trait]
impl RemoteCalendarApi for GoogleCalendarClient {
    async fn list_calendars(&self, access_token: &str) -> Result<Vec<RemoteCalendar>, SyncError> {
        let url = format!("{}/users/me/calendarList", API_BASE);

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| SyncError::Http(e.to_string()))?;

        let list: CalendarList = self
            .check(response)
            .await?
            .json()
            .await
            .map_err(|e| SyncError::Http(format!("invalid calendar list: {}", e)))?;

        debug!(count = list.items.len(), "fetched calendar list");

        // Provider order is preserved; no client-side resort.
        Ok(list
            .items
            .into_iter()
            .filter(|c| !c.id.is_empty())
            .map(RemoteCalendar::from)
            .collect())
    }

    async fn list_events(
        &self,
        access_token: &str,
        calendar_id: &str,
        window: &SyncWindow,
        max_results: u32,
    ) -> Result<Vec<RawRemoteEvent>, SyncError> {
        let mut url = self.events_url(calendar_id, None)?;
        url.query_pairs_mut()
            .append_pair("timeMin", &window.start_rfc3339())
            .append_pair("timeMax", &window.end_rfc3339())
            .append_pair("maxResults", &max_results.to_string())
            .append_pair("singleEvents", "true")
            .append_pair("orderBy", "startTime");

        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| SyncError::Http(e.to_string()))?;

        let list: EventList = self
            .check(response)
            .await?
            .json()
            .await
            .map_err(|e| SyncError::Http(format!("invalid event list: {}", e)))?;

        debug!(calendar_id, count = list.items.len(), "fetched events");

        Ok(list
            .items
            .into_iter()
            .filter(|e| !e.is_skippable())
            .map(RawRemoteEvent::from)
            .collect())
    }

    async fn insert_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        payload: &EventPayload,
    ) -> Result<RawRemoteEvent, SyncError> {
        let url = self.events_url(calendar_id, None)?;
        let body = GoogleEventWrite::from(payload);

        let response = self
            .http
            .post(url)
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| SyncError::Http(e.to_string()))?;

        let created: GoogleEvent = self
            .check(response)
            .await?
            .json()
            .await
            .map_err(|e| SyncError::Http(format!("invalid insert response: {}", e)))?;

        debug!(calendar_id, event_id = %created.id, "created remote event");

        Ok(RawRemoteEvent::from(created))
    }

    async fn update_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
        payload: &EventPayload,
    ) -> Result<RawRemoteEvent, SyncError> {
        let url = self.events_url(calendar_id, Some(event_id))?;
        let body = GoogleEventWrite::from(payload);

        let response = self
            .http
            .patch(url)
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| SyncError::Http(e.to_string()))?;

        let updated: GoogleEvent = self
            .check(response)
            .await?
            .json()
            .await
            .map_err(|e| SyncError::Http(format!("invalid update response: {}", e)))?;

        debug!(calendar_id, event_id, "updated remote event");

        Ok(RawRemoteEvent::from(updated))
    }

    async fn delete_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
    ) -> Result<(), SyncError> {
        let url = self.events_url(calendar_id, Some(event_id))?;

        let response = self
            .http
            .delete(url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| SyncError::Http(e.to_string()))?;

        // Already gone on the remote side counts as deleted.
        if response.status() == StatusCode::NOT_FOUND || response.status() == StatusCode::GONE {
            return Ok(());
        }

        self.check(response).await?;

        debug!(calendar_id, event_id, "deleted remote event");

        Ok(())
    }
}
