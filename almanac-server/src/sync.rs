//! The sync orchestrator: one full refresh → enumerate → per-calendar
//! fetch/normalize/reconcile pass.

use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use almanac_core::{
    normalize, CalendarSyncResult, CanonicalEvent, RemoteCalendar, RemoteCalendarApi, SyncError,
    SyncRun, SyncWindow, DEFAULT_MAX_RESULTS,
};

use crate::locks::UserLocks;
use crate::store::Database;
use crate::token::TokenStore;

/// Width of the per-calendar fan-out. Calendars touch disjoint row
/// partitions, so they may reconcile in parallel.
const MAX_CONCURRENT_CALENDARS: usize = 4;

pub struct SyncEngine {
    db: Database,
    remote: Arc<dyn RemoteCalendarApi>,
    tokens: TokenStore,
    locks: UserLocks,
}

impl SyncEngine {
    pub fn new(
        db: Database,
        remote: Arc<dyn RemoteCalendarApi>,
        tokens: TokenStore,
        locks: UserLocks,
    ) -> Self {
        SyncEngine {
            db,
            remote,
            tokens,
            locks,
        }
    }

    /// Run one full sync for a user.
    ///
    /// A missing/expired credential or a failed calendar listing aborts
    /// the run; any single calendar's failure is recorded in the
    /// per-calendar breakdown and the rest continue. The per-user lock is
    /// held for the whole run so reconciliation cannot interleave with a
    /// concurrent local mutation.
    pub async fn run_sync(&self, user_id: &str) -> Result<SyncRun, SyncError> {
        let started_at = Utc::now();
        let _guard = self.locks.acquire(user_id).await;

        let credential = self.tokens.fresh_credential(user_id).await?;

        let calendars = self
            .remote
            .list_calendars(&credential.access_token)
            .await
            .map_err(|e| match e {
                SyncError::AuthExpired => SyncError::AuthExpired,
                other => SyncError::CalendarList(other.to_string()),
            })?;

        let window = SyncWindow::current();

        let per_calendar: Vec<CalendarSyncResult> = stream::iter(calendars)
            .map(|calendar| {
                let access_token = credential.access_token.clone();
                async move {
                    self.sync_calendar(user_id, &access_token, calendar, &window)
                        .await
                }
            })
            .buffered(MAX_CONCURRENT_CALENDARS)
            .collect()
            .await;

        self.tokens.touch_last_sync(user_id)?;

        let total_synced = per_calendar.iter().map(|r| r.event_count).sum();
        info!(
            user_id,
            total_synced,
            calendars = per_calendar.len(),
            failed = per_calendar.iter().filter(|r| !r.success).count(),
            "sync run complete"
        );

        Ok(SyncRun {
            user_id: user_id.to_string(),
            started_at,
            completed_at: Utc::now(),
            per_calendar,
            total_synced,
        })
    }

    async fn sync_calendar(
        &self,
        user_id: &str,
        access_token: &str,
        calendar: RemoteCalendar,
        window: &SyncWindow,
    ) -> CalendarSyncResult {
        let raw = match self
            .remote
            .list_events(
                access_token,
                &calendar.external_id,
                window,
                DEFAULT_MAX_RESULTS,
            )
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                warn!(user_id, calendar_id = %calendar.external_id, error = %e, "event fetch failed");
                let err = SyncError::PerCalendarSync {
                    calendar_id: calendar.external_id.clone(),
                    message: e.to_string(),
                };
                return CalendarSyncResult::failed(
                    &calendar.external_id,
                    &calendar.display_name,
                    err.to_string(),
                );
            }
        };

        let events: Vec<CanonicalEvent> = raw
            .into_iter()
            .filter_map(|r| normalize(user_id, r, &calendar))
            .collect();

        match self
            .db
            .replace_calendar_events(user_id, &calendar.external_id, &events)
        {
            Ok(stats) => {
                CalendarSyncResult::ok(&calendar.external_id, &calendar.display_name, stats.inserted)
            }
            Err(e) => {
                warn!(user_id, calendar_id = %calendar.external_id, error = %e, "reconcile failed");
                let err = SyncError::PerCalendarSync {
                    calendar_id: calendar.external_id.clone(),
                    message: e.to_string(),
                };
                CalendarSyncResult::failed(
                    &calendar.external_id,
                    &calendar.display_name,
                    err.to_string(),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{all_day_raw, seed_credential, timed_raw, FakeOAuth, FakeRemote};
    use almanac_core::EventOrigin;

    fn engine(db: Database, remote: Arc<FakeRemote>) -> SyncEngine {
        let tokens = TokenStore::new(db.clone(), Arc::new(FakeOAuth::accepting()));
        SyncEngine::new(db, remote, tokens, UserLocks::default())
    }

    #[tokio::test]
    async fn missing_credential_aborts_with_auth_expired() {
        let db = Database::open_in_memory().unwrap();
        let engine = engine(db, Arc::new(FakeRemote::new()));

        let err = engine.run_sync("user-1").await.unwrap_err();
        assert!(matches!(err, SyncError::AuthExpired));
    }

    #[tokio::test]
    async fn listing_failure_aborts_the_whole_run() {
        let db = Database::open_in_memory().unwrap();
        seed_credential(&db, "user-1", 3600);
        let remote = Arc::new(FakeRemote::new().fail_listing());
        let engine = engine(db, remote);

        let err = engine.run_sync("user-1").await.unwrap_err();
        assert!(matches!(err, SyncError::CalendarList(_)));
    }

    #[tokio::test]
    async fn work_calendar_scenario_two_timed_one_all_day() {
        let db = Database::open_in_memory().unwrap();
        seed_credential(&db, "user-1", 3600);
        let remote = Arc::new(FakeRemote::new().with_calendar(
            "work@example.com",
            "Work",
            vec![
                timed_raw("evt-1", "Standup", 9),
                timed_raw("evt-2", "Planning", 11),
                all_day_raw("evt-3", 2025, 1, 10),
            ],
        ));
        let engine = engine(db.clone(), remote);

        let run = engine.run_sync("user-1").await.unwrap();

        assert_eq!(run.total_synced, 3);
        assert_eq!(run.per_calendar.len(), 1);
        assert!(run.per_calendar[0].success);

        let events = db.list_events("user-1").unwrap();
        assert_eq!(events.len(), 3);
        let mut all_day_flags: Vec<bool> = events.iter().map(|e| e.all_day).collect();
        all_day_flags.sort_unstable();
        assert_eq!(all_day_flags, vec![false, false, true]);
        assert!(events.iter().all(|e| e.origin == EventOrigin::Remote));
    }

    #[tokio::test]
    async fn one_failing_calendar_does_not_abort_the_others() {
        let db = Database::open_in_memory().unwrap();
        seed_credential(&db, "user-1", 3600);
        let remote = Arc::new(
            FakeRemote::new()
                .with_calendar("cal-a", "A", vec![timed_raw("a-1", "One", 9)])
                .failing_calendar("cal-b", "B")
                .with_calendar("cal-c", "C", vec![timed_raw("c-1", "Two", 10)]),
        );
        let engine = engine(db.clone(), remote);

        let run = engine.run_sync("user-1").await.unwrap();

        assert_eq!(run.per_calendar.len(), 3);
        let by_id = |id: &str| run.per_calendar.iter().find(|r| r.calendar_id == id).unwrap();
        assert!(by_id("cal-a").success);
        assert!(!by_id("cal-b").success);
        assert!(by_id("cal-b").error.is_some());
        assert!(by_id("cal-c").success);
        assert_eq!(run.total_synced, 2);

        let events = db.list_events("user-1").unwrap();
        assert_eq!(events.len(), 2);
    }

    #[tokio::test]
    async fn rerun_with_unchanged_remote_is_idempotent_in_result() {
        let db = Database::open_in_memory().unwrap();
        seed_credential(&db, "user-1", 3600);
        let remote = Arc::new(FakeRemote::new().with_calendar(
            "cal-a",
            "A",
            vec![timed_raw("a-1", "One", 9), all_day_raw("a-2", 2025, 2, 3)],
        ));
        let engine = engine(db.clone(), remote);

        engine.run_sync("user-1").await.unwrap();
        let first = db.list_events("user-1").unwrap();

        engine.run_sync("user-1").await.unwrap();
        let second = db.list_events("user-1").unwrap();

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.external_id, b.external_id);
            assert_eq!(a.external_calendar_id, b.external_calendar_id);
            assert_eq!(a.title, b.title);
            assert_eq!(a.start_at, b.start_at);
            assert_eq!(a.end_at, b.end_at);
            assert_eq!(a.all_day, b.all_day);
            assert_eq!(a.status, b.status);
        }
        // Row identity is disposable; only the remote identity is stable.
    }

    #[tokio::test]
    async fn remote_deletions_disappear_after_the_next_run() {
        let db = Database::open_in_memory().unwrap();
        seed_credential(&db, "user-1", 3600);
        let remote = Arc::new(FakeRemote::new().with_calendar(
            "cal-a",
            "A",
            vec![timed_raw("a-1", "One", 9), timed_raw("a-2", "Two", 10)],
        ));
        let engine = engine(db.clone(), remote.clone());

        engine.run_sync("user-1").await.unwrap();
        assert_eq!(db.list_events("user-1").unwrap().len(), 2);

        remote.replace_events("cal-a", vec![timed_raw("a-2", "Two", 10)]);
        engine.run_sync("user-1").await.unwrap();

        let events = db.list_events("user-1").unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].external_id.as_deref(), Some("a-2"));
    }

    #[tokio::test]
    async fn completed_run_touches_last_sync() {
        let db = Database::open_in_memory().unwrap();
        seed_credential(&db, "user-1", 3600);
        let remote = Arc::new(FakeRemote::new().with_calendar("cal-a", "A", vec![]));
        let engine = engine(db.clone(), remote);

        engine.run_sync("user-1").await.unwrap();

        let credential = db
            .get_credential("user-1", almanac_core::CALENDAR_SERVICE)
            .unwrap()
            .unwrap();
        assert!(credential.last_sync_at.is_some());
    }

    #[tokio::test]
    async fn local_events_survive_sync_runs() {
        let db = Database::open_in_memory().unwrap();
        seed_credential(&db, "user-1", 3600);
        let remote = Arc::new(FakeRemote::new().with_calendar(
            "cal-a",
            "A",
            vec![timed_raw("a-1", "One", 9)],
        ));
        let engine = engine(db.clone(), remote);

        let local = CanonicalEvent::new_local(
            "user-1",
            "my plan".to_string(),
            Utc::now(),
            Utc::now() + chrono::Duration::hours(1),
        );
        db.insert_event(&local).unwrap();

        engine.run_sync("user-1").await.unwrap();

        let events = db.list_events("user-1").unwrap();
        assert_eq!(events.len(), 2);
        assert!(events.iter().any(|e| e.local_id == local.local_id));
    }
}
