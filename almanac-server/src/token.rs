//! Credential lifecycle: load, refresh-on-demand, invalidation.

use std::sync::Arc;

use tracing::warn;

use almanac_core::{Credential, OAuthExchange, SyncError, TokenSet, CALENDAR_SERVICE};

use crate::store::Database;

#[derive(Clone)]
pub struct TokenStore {
    db: Database,
    oauth: Arc<dyn OAuthExchange>,
}

impl TokenStore {
    pub fn new(db: Database, oauth: Arc<dyn OAuthExchange>) -> Self {
        TokenStore { db, oauth }
    }

    pub fn get(&self, user_id: &str) -> Result<Option<Credential>, SyncError> {
        self.db.get_credential(user_id, CALENDAR_SERVICE)
    }

    /// Persist tokens from a completed OAuth handshake.
    pub fn connect(&self, user_id: &str, tokens: &TokenSet) -> Result<(), SyncError> {
        self.db.upsert_credential(user_id, CALENDAR_SERVICE, tokens)
    }

    /// Refresh the credential if it is expired or inside the skew window.
    /// A rejected refresh marks the credential invalid and raises
    /// `AuthExpired` instead of retrying.
    pub async fn ensure_fresh(&self, credential: Credential) -> Result<Credential, SyncError> {
        if credential.invalid {
            return Err(SyncError::AuthExpired);
        }
        if !credential.needs_refresh() {
            return Ok(credential);
        }

        match self.oauth.refresh(&credential.refresh_token).await {
            Ok(tokens) => {
                // The provider typically omits the refresh token on
                // refresh; the stored one stays valid.
                let refresh_token = tokens
                    .refresh_token
                    .clone()
                    .unwrap_or_else(|| credential.refresh_token.clone());
                let persisted = TokenSet {
                    access_token: tokens.access_token.clone(),
                    refresh_token: Some(refresh_token.clone()),
                    expires_at: tokens.expires_at,
                };
                self.db
                    .upsert_credential(&credential.user_id, &credential.service, &persisted)?;

                Ok(Credential {
                    access_token: tokens.access_token,
                    refresh_token,
                    expires_at: tokens.expires_at,
                    invalid: false,
                    ..credential
                })
            }
            Err(err) => {
                warn!(
                    user_id = %credential.user_id,
                    error = %err,
                    "token refresh rejected; marking credential invalid"
                );
                self.db
                    .mark_credential_invalid(&credential.user_id, &credential.service)?;
                Err(SyncError::AuthExpired)
            }
        }
    }

    /// Load + freshen in one step, for callers that only hold a user id.
    pub async fn fresh_credential(&self, user_id: &str) -> Result<Credential, SyncError> {
        let credential = self.get(user_id)?.ok_or(SyncError::AuthExpired)?;
        self.ensure_fresh(credential).await
    }

    pub fn touch_last_sync(&self, user_id: &str) -> Result<(), SyncError> {
        self.db.touch_last_sync(user_id, CALENDAR_SERVICE)
    }
}
