//! In-process fakes and fixtures shared across the server's tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

use almanac_core::{
    EventPayload, OAuthExchange, RawEventTime, RawRemoteEvent, RemoteCalendar, RemoteCalendarApi,
    SyncError, SyncWindow, TokenSet, CALENDAR_SERVICE,
};

use crate::store::Database;

/// Insert a working credential for `user_id` expiring `expires_in`
/// seconds from now, with "seed-access"/"seed-refresh" tokens.
pub fn seed_credential(db: &Database, user_id: &str, expires_in: i64) {
    let tokens = TokenSet {
        access_token: "seed-access".to_string(),
        refresh_token: Some("seed-refresh".to_string()),
        expires_at: Utc::now() + Duration::seconds(expires_in),
    };
    db.upsert_credential(user_id, CALENDAR_SERVICE, &tokens)
        .unwrap();
}

fn at_hour(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 10, hour, 0, 0).unwrap()
}

/// A timed one-hour event starting at `hour` UTC on a fixed day.
pub fn timed_raw(id: &str, title: &str, hour: u32) -> RawRemoteEvent {
    RawRemoteEvent {
        id: id.to_string(),
        title: Some(title.to_string()),
        start: Some(RawEventTime::DateTime(at_hour(hour))),
        end: Some(RawEventTime::DateTime(at_hour(hour + 1))),
        status: Some("confirmed".to_string()),
        ..Default::default()
    }
}

/// A date-only event, as providers report all-day entries.
pub fn all_day_raw(id: &str, year: i32, month: u32, day: u32) -> RawRemoteEvent {
    let date = NaiveDate::from_ymd_opt(year, month, day).unwrap();
    RawRemoteEvent {
        id: id.to_string(),
        title: Some("All day".to_string()),
        start: Some(RawEventTime::Date(date)),
        end: Some(RawEventTime::Date(date.succ_opt().unwrap())),
        ..Default::default()
    }
}

/// Scripted stand-in for the provider API. Calendars and their events are
/// fixed up front; mutations are recorded rather than applied.
pub struct FakeRemote {
    calendars: Vec<RemoteCalendar>,
    events: Mutex<HashMap<String, Vec<RawRemoteEvent>>>,
    failing: HashSet<String>,
    fail_listing: bool,
    fail_mutations: bool,
    mutations: Mutex<Vec<String>>,
    next_id: AtomicUsize,
}

impl FakeRemote {
    pub fn new() -> Self {
        FakeRemote {
            calendars: Vec::new(),
            events: Mutex::new(HashMap::new()),
            failing: HashSet::new(),
            fail_listing: false,
            fail_mutations: false,
            mutations: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(1),
        }
    }

    pub fn with_calendar(mut self, id: &str, name: &str, events: Vec<RawRemoteEvent>) -> Self {
        self.calendars.push(RemoteCalendar {
            external_id: id.to_string(),
            display_name: name.to_string(),
            color_hex: None,
            access_role: Some("owner".to_string()),
        });
        self.events.get_mut().unwrap().insert(id.to_string(), events);
        self
    }

    /// A calendar whose event fetch always errors.
    pub fn failing_calendar(mut self, id: &str, name: &str) -> Self {
        self.failing.insert(id.to_string());
        self.with_calendar(id, name, Vec::new())
    }

    pub fn fail_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    /// All insert/update/delete calls error.
    pub fn fail_mutations(mut self) -> Self {
        self.fail_mutations = true;
        self
    }

    /// Swap a calendar's scripted events between sync runs.
    pub fn replace_events(&self, calendar_id: &str, events: Vec<RawRemoteEvent>) {
        self.events
            .lock()
            .unwrap()
            .insert(calendar_id.to_string(), events);
    }

    pub fn mutation_log(&self) -> Vec<String> {
        self.mutations.lock().unwrap().clone()
    }

    fn record(&self, entry: String) {
        self.mutations.lock().unwrap().push(entry);
    }

    fn mutation_gate(&self) -> Result<(), SyncError> {
        if self.fail_mutations {
            Err(SyncError::Http("remote mutation rejected".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteCalendarApi for FakeRemote {
    async fn list_calendars(&self, _access_token: &str) -> Result<Vec<RemoteCalendar>, SyncError> {
        if self.fail_listing {
            return Err(SyncError::Http("calendar list unavailable".to_string()));
        }
        Ok(self.calendars.clone())
    }

    async fn list_events(
        &self,
        _access_token: &str,
        calendar_id: &str,
        _window: &SyncWindow,
        _max_results: u32,
    ) -> Result<Vec<RawRemoteEvent>, SyncError> {
        if self.failing.contains(calendar_id) {
            return Err(SyncError::Http(format!(
                "event fetch failed for {calendar_id}"
            )));
        }
        Ok(self
            .events
            .lock()
            .unwrap()
            .get(calendar_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn insert_event(
        &self,
        _access_token: &str,
        calendar_id: &str,
        payload: &EventPayload,
    ) -> Result<RawRemoteEvent, SyncError> {
        self.mutation_gate()?;
        let id = format!("remote-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.record(format!("insert {calendar_id} {id}"));
        Ok(RawRemoteEvent {
            id,
            title: Some(payload.title.clone()),
            start: Some(payload.start.clone()),
            end: Some(payload.end.clone()),
            ..Default::default()
        })
    }

    async fn update_event(
        &self,
        _access_token: &str,
        calendar_id: &str,
        event_id: &str,
        payload: &EventPayload,
    ) -> Result<RawRemoteEvent, SyncError> {
        self.mutation_gate()?;
        self.record(format!("update {calendar_id} {event_id}"));
        Ok(RawRemoteEvent {
            id: event_id.to_string(),
            title: Some(payload.title.clone()),
            start: Some(payload.start.clone()),
            end: Some(payload.end.clone()),
            ..Default::default()
        })
    }

    async fn delete_event(
        &self,
        _access_token: &str,
        calendar_id: &str,
        event_id: &str,
    ) -> Result<(), SyncError> {
        self.mutation_gate()?;
        self.record(format!("delete {calendar_id} {event_id}"));
        Ok(())
    }
}

/// Scripted OAuth endpoint: either every grant succeeds or every grant
/// is rejected.
pub struct FakeOAuth {
    reject: bool,
    refresh_calls: AtomicUsize,
}

impl FakeOAuth {
    pub fn accepting() -> Self {
        FakeOAuth {
            reject: false,
            refresh_calls: AtomicUsize::new(0),
        }
    }

    pub fn rejecting() -> Self {
        FakeOAuth {
            reject: true,
            refresh_calls: AtomicUsize::new(0),
        }
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OAuthExchange for FakeOAuth {
    async fn exchange_code(&self, _code: &str) -> Result<TokenSet, SyncError> {
        if self.reject {
            return Err(SyncError::AuthExpired);
        }
        Ok(TokenSet {
            access_token: "exchanged-access".to_string(),
            refresh_token: Some("exchanged-refresh".to_string()),
            expires_at: Utc::now() + Duration::hours(1),
        })
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<TokenSet, SyncError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        if self.reject {
            return Err(SyncError::AuthExpired);
        }
        // Providers typically omit the refresh token on refresh.
        Ok(TokenSet {
            access_token: "refreshed-access".to_string(),
            refresh_token: None,
            expires_at: Utc::now() + Duration::hours(1),
        })
    }
}
