use std::sync::Arc;

use anyhow::Result;

use almanac_core::{OAuthExchange, RemoteCalendarApi};
use almanac_google::{GoogleCalendarClient, GoogleOAuth};

use crate::config::ServerConfig;
use crate::locks::UserLocks;
use crate::propagate::MutationPropagator;
use crate::store::Database;
use crate::sync::SyncEngine;
use crate::token::TokenStore;

/// Shared application state, cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub tokens: TokenStore,
    pub engine: Arc<SyncEngine>,
    pub propagator: Arc<MutationPropagator>,
    pub oauth: Arc<dyn OAuthExchange>,
    pub locks: UserLocks,
}

impl AppState {
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let db = Database::open(&config.db_path()?)?;
        let oauth: Arc<dyn OAuthExchange> = Arc::new(GoogleOAuth::new(
            config.google.client_id.clone(),
            config.google.client_secret.clone(),
            config.redirect_uri(),
        ));
        let remote: Arc<dyn RemoteCalendarApi> = Arc::new(GoogleCalendarClient::new());
        Ok(Self::wire(db, remote, oauth))
    }

    fn wire(
        db: Database,
        remote: Arc<dyn RemoteCalendarApi>,
        oauth: Arc<dyn OAuthExchange>,
    ) -> Self {
        let tokens = TokenStore::new(db.clone(), oauth.clone());
        let locks = UserLocks::default();
        let engine = Arc::new(SyncEngine::new(
            db.clone(),
            remote.clone(),
            tokens.clone(),
            locks.clone(),
        ));
        let propagator = Arc::new(MutationPropagator::new(
            db.clone(),
            remote,
            tokens.clone(),
        ));
        AppState {
            db,
            tokens,
            engine,
            propagator,
            oauth,
            locks,
        }
    }

    #[cfg(test)]
    pub fn for_tests(
        db: Database,
        remote: Arc<dyn RemoteCalendarApi>,
        oauth: Arc<dyn OAuthExchange>,
    ) -> Self {
        Self::wire(db, remote, oauth)
    }
}
