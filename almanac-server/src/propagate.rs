//! Best-effort propagation of local mutations to the remote provider.
//!
//! The local commit has already happened by the time these run; a remote
//! failure is reported in the response's secondary status and never rolls
//! the local change back.

use std::sync::Arc;

use tracing::warn;

use almanac_core::{
    CanonicalEvent, Credential, EventPayload, RemoteCalendarApi, RemoteStatus, SyncError,
};

use crate::store::Database;
use crate::token::TokenStore;

/// Target calendar for events created locally, which have no remote
/// calendar of their own yet.
pub const DEFAULT_CALENDAR_ID: &str = "primary";

pub struct MutationPropagator {
    db: Database,
    remote: Arc<dyn RemoteCalendarApi>,
    tokens: TokenStore,
}

impl MutationPropagator {
    pub fn new(db: Database, remote: Arc<dyn RemoteCalendarApi>, tokens: TokenStore) -> Self {
        MutationPropagator { db, remote, tokens }
    }

    async fn credential_for(&self, user_id: &str) -> Result<Credential, SyncError> {
        self.tokens.fresh_credential(user_id).await
    }

    /// Push a locally created event. On success the row gains its external
    /// identifiers and the next sync will treat it as linked.
    pub async fn on_create(&self, event: &CanonicalEvent) -> RemoteStatus {
        let credential = match self.credential_for(&event.user_id).await {
            Ok(c) => c,
            Err(e) => return local_only(event, "create", e),
        };

        let payload = EventPayload::from_event(event);
        match self
            .remote
            .insert_event(&credential.access_token, DEFAULT_CALENDAR_ID, &payload)
            .await
        {
            Ok(created) => {
                if let Err(e) = self.db.set_external_ids(
                    &event.user_id,
                    &event.local_id,
                    &created.id,
                    DEFAULT_CALENDAR_ID,
                ) {
                    return local_only(event, "create", e);
                }
                RemoteStatus::Linked
            }
            Err(e) => local_only(event, "create", e),
        }
    }

    /// Push an update for an event that already has a remote counterpart.
    /// Events never pushed remain local-only without a remote call.
    pub async fn on_update(&self, event: &CanonicalEvent) -> RemoteStatus {
        let external_id = match event.external_id.as_deref() {
            Some(id) => id,
            None => {
                return RemoteStatus::LocalOnly {
                    reason: "event has no remote counterpart".to_string(),
                }
            }
        };
        let calendar_id = event
            .external_calendar_id
            .as_deref()
            .unwrap_or(DEFAULT_CALENDAR_ID);

        let credential = match self.credential_for(&event.user_id).await {
            Ok(c) => c,
            Err(e) => return local_only(event, "update", e),
        };

        let payload = EventPayload::from_event(event);
        match self
            .remote
            .update_event(&credential.access_token, calendar_id, external_id, &payload)
            .await
        {
            Ok(_) => RemoteStatus::Linked,
            Err(e) => local_only(event, "update", e),
        }
    }

    /// Remove the remote counterpart of a locally deleted event.
    pub async fn on_delete(&self, event: &CanonicalEvent) -> RemoteStatus {
        let external_id = match event.external_id.as_deref() {
            Some(id) => id,
            None => {
                return RemoteStatus::LocalOnly {
                    reason: "event has no remote counterpart".to_string(),
                }
            }
        };
        let calendar_id = event
            .external_calendar_id
            .as_deref()
            .unwrap_or(DEFAULT_CALENDAR_ID);

        let credential = match self.credential_for(&event.user_id).await {
            Ok(c) => c,
            Err(e) => return local_only(event, "delete", e),
        };

        match self
            .remote
            .delete_event(&credential.access_token, calendar_id, external_id)
            .await
        {
            Ok(()) => RemoteStatus::Linked,
            Err(e) => local_only(event, "delete", e),
        }
    }
}

fn local_only(event: &CanonicalEvent, op: &str, err: SyncError) -> RemoteStatus {
    let err = match err {
        e @ SyncError::RemotePropagation(_) => e,
        other => SyncError::RemotePropagation(other.to_string()),
    };
    warn!(
        user_id = %event.user_id,
        local_id = %event.local_id,
        op,
        error = %err,
        "remote propagation failed; event stays local"
    );
    RemoteStatus::LocalOnly {
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{seed_credential, FakeOAuth, FakeRemote};
    use chrono::{Duration, Utc};

    fn setup(remote: FakeRemote, oauth: FakeOAuth) -> (Database, Arc<FakeRemote>, MutationPropagator) {
        let db = Database::open_in_memory().unwrap();
        let remote = Arc::new(remote);
        let tokens = TokenStore::new(db.clone(), Arc::new(oauth));
        let propagator = MutationPropagator::new(db.clone(), remote.clone(), tokens);
        (db, remote, propagator)
    }

    fn local_event(db: &Database) -> CanonicalEvent {
        let event = CanonicalEvent::new_local(
            "user-1",
            "Dentist".to_string(),
            Utc::now(),
            Utc::now() + Duration::hours(1),
        );
        db.insert_event(&event).unwrap();
        event
    }

    #[tokio::test]
    async fn successful_create_links_the_row() {
        let (db, remote, propagator) = setup(FakeRemote::new(), FakeOAuth::accepting());
        seed_credential(&db, "user-1", 3600);
        let event = local_event(&db);

        let status = propagator.on_create(&event).await;
        assert!(matches!(status, RemoteStatus::Linked));

        let stored = db.get_event("user-1", &event.local_id).unwrap().unwrap();
        assert_eq!(stored.external_id.as_deref(), Some("remote-1"));
        assert_eq!(stored.external_calendar_id.as_deref(), Some(DEFAULT_CALENDAR_ID));
        assert_eq!(remote.mutation_log(), vec!["insert primary remote-1"]);
    }

    #[tokio::test]
    async fn create_with_expired_credential_keeps_the_local_row() {
        let (db, remote, propagator) = setup(FakeRemote::new(), FakeOAuth::rejecting());
        seed_credential(&db, "user-1", 60); // needs refresh, refresh rejected
        let event = local_event(&db);

        let status = propagator.on_create(&event).await;
        assert!(matches!(status, RemoteStatus::LocalOnly { .. }));

        // The commit stands, just unlinked.
        let stored = db.get_event("user-1", &event.local_id).unwrap().unwrap();
        assert!(stored.external_id.is_none());
        assert!(remote.mutation_log().is_empty());
    }

    #[tokio::test]
    async fn update_of_unlinked_event_makes_no_remote_call() {
        let (db, remote, propagator) = setup(FakeRemote::new(), FakeOAuth::accepting());
        seed_credential(&db, "user-1", 3600);
        let event = local_event(&db);

        let status = propagator.on_update(&event).await;
        assert!(matches!(status, RemoteStatus::LocalOnly { .. }));
        assert!(remote.mutation_log().is_empty());
    }

    #[tokio::test]
    async fn update_of_linked_event_patches_the_remote() {
        let (db, remote, propagator) = setup(FakeRemote::new(), FakeOAuth::accepting());
        seed_credential(&db, "user-1", 3600);
        let mut event = local_event(&db);
        db.set_external_ids("user-1", &event.local_id, "evt-9", "work-cal")
            .unwrap();
        event.external_id = Some("evt-9".to_string());
        event.external_calendar_id = Some("work-cal".to_string());

        let status = propagator.on_update(&event).await;
        assert!(matches!(status, RemoteStatus::Linked));
        assert_eq!(remote.mutation_log(), vec!["update work-cal evt-9"]);
    }

    #[tokio::test]
    async fn failed_delete_reports_local_only() {
        let (db, remote, propagator) =
            setup(FakeRemote::new().fail_mutations(), FakeOAuth::accepting());
        seed_credential(&db, "user-1", 3600);
        let mut event = local_event(&db);
        event.external_id = Some("evt-9".to_string());

        let status = propagator.on_delete(&event).await;
        assert!(matches!(status, RemoteStatus::LocalOnly { .. }));
        assert!(remote.mutation_log().is_empty());
    }

    #[tokio::test]
    async fn delete_of_linked_event_reaches_the_remote() {
        let (db, remote, propagator) = setup(FakeRemote::new(), FakeOAuth::accepting());
        seed_credential(&db, "user-1", 3600);
        let mut event = local_event(&db);
        event.external_id = Some("evt-9".to_string());

        let status = propagator.on_delete(&event).await;
        assert!(matches!(status, RemoteStatus::Linked));
        assert_eq!(remote.mutation_log(), vec!["delete primary evt-9"]);
    }
}
