//! Credential rows: keyed upsert, invalidation, last-sync bookkeeping.

use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

use almanac_core::{Credential, SyncError, TokenSet};

use super::{from_ts, storage_err, to_ts, Database};

fn credential_from_row(row: &Row<'_>) -> rusqlite::Result<Credential> {
    Ok(Credential {
        user_id: row.get(0)?,
        service: row.get(1)?,
        access_token: row.get(2)?,
        refresh_token: row.get(3)?,
        expires_at: from_ts(row.get(4)?),
        last_sync_at: row.get::<_, Option<i64>>(5)?.map(from_ts),
        invalid: row.get(6)?,
    })
}

impl Database {
    pub fn get_credential(
        &self,
        user_id: &str,
        service: &str,
    ) -> Result<Option<Credential>, SyncError> {
        self.conn()
            .query_row(
                "SELECT user_id, service, access_token, refresh_token, expires_at, \
                 last_sync_at, invalid FROM credentials WHERE user_id = ?1 AND service = ?2",
                params![user_id, service],
                credential_from_row,
            )
            .optional()
            .map_err(storage_err)
    }

    /// Atomic upsert keyed by (user_id, service). A fresh token set clears
    /// the invalid flag; last_sync_at is preserved across updates.
    pub fn upsert_credential(
        &self,
        user_id: &str,
        service: &str,
        tokens: &TokenSet,
    ) -> Result<(), SyncError> {
        let refresh_token = tokens.refresh_token.as_deref().ok_or_else(|| {
            SyncError::Validation("refresh token required for unattended refresh".to_string())
        })?;

        self.conn()
            .execute(
                "INSERT INTO credentials \
                 (user_id, service, access_token, refresh_token, expires_at, last_sync_at, invalid) \
                 VALUES (?1, ?2, ?3, ?4, ?5, NULL, 0) \
                 ON CONFLICT(user_id, service) DO UPDATE SET \
                    access_token = excluded.access_token, \
                    refresh_token = excluded.refresh_token, \
                    expires_at = excluded.expires_at, \
                    invalid = 0",
                params![
                    user_id,
                    service,
                    tokens.access_token,
                    refresh_token,
                    to_ts(tokens.expires_at)
                ],
            )
            .map_err(storage_err)?;
        Ok(())
    }

    /// Flag a credential whose refresh was rejected. It stays invalid
    /// until a new OAuth handshake replaces it.
    pub fn mark_credential_invalid(&self, user_id: &str, service: &str) -> Result<(), SyncError> {
        self.conn()
            .execute(
                "UPDATE credentials SET invalid = 1 WHERE user_id = ?1 AND service = ?2",
                params![user_id, service],
            )
            .map_err(storage_err)?;
        Ok(())
    }

    pub fn touch_last_sync(&self, user_id: &str, service: &str) -> Result<(), SyncError> {
        self.conn()
            .execute(
                "UPDATE credentials SET last_sync_at = ?3 WHERE user_id = ?1 AND service = ?2",
                params![user_id, service, to_ts(Utc::now())],
            )
            .map_err(storage_err)?;
        Ok(())
    }
}
