//! The OAuth callback endpoint.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use almanac_core::SyncError;

use crate::routes::{AppError, UserId};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/oauth/callback", get(callback))
        .route("/oauth/status", get(status))
}

#[derive(Deserialize)]
pub struct CallbackQuery {
    pub code: String,
    /// Round-tripped through the consent screen; carries the user id the
    /// handshake was started for.
    #[serde(default)]
    pub state: String,
}

#[derive(Serialize)]
pub struct CallbackResponse {
    pub connected: bool,
    pub user_id: String,
    pub synced_events: Option<usize>,
    pub sync_error: Option<String>,
}

/// GET /oauth/callback - Complete the consent handshake, then kick off a
/// first sync. The connection stands even if that sync fails.
async fn callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<Json<CallbackResponse>, AppError> {
    if query.state.is_empty() {
        return Err(SyncError::Validation(
            "missing state parameter; cannot attribute the consent to a user".to_string(),
        )
        .into());
    }
    let user_id = query.state;

    let tokens = state.oauth.exchange_code(&query.code).await?;
    state.tokens.connect(&user_id, &tokens)?;
    info!(user_id, "calendar connected");

    let (synced_events, sync_error) = match state.engine.run_sync(&user_id).await {
        Ok(run) => (Some(run.total_synced), None),
        Err(e) => {
            warn!(user_id, error = %e, "initial sync after connect failed");
            (None, Some(e.to_string()))
        }
    };

    Ok(Json(CallbackResponse {
        connected: true,
        user_id,
        synced_events,
        sync_error,
    }))
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub connected: bool,
    pub needs_reauth: bool,
    pub last_sync_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// GET /oauth/status - Whether the requesting user has a usable
/// credential.
async fn status(
    State(state): State<AppState>,
    UserId(user_id): UserId,
) -> Result<Json<StatusResponse>, AppError> {
    let credential = state.tokens.get(&user_id)?;
    Ok(Json(match credential {
        Some(c) => StatusResponse {
            connected: true,
            needs_reauth: c.invalid,
            last_sync_at: c.last_sync_at,
        },
        None => StatusResponse {
            connected: false,
            needs_reauth: false,
            last_sync_at: None,
        },
    }))
}
