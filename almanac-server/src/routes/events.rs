//! Event CRUD endpoints.
//!
//! Local writes commit first; the remote push happens under the same
//! per-user lock and its outcome rides along as a secondary status.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use almanac_core::{CanonicalEvent, RemoteStatus, SyncError};

use crate::routes::{AppError, UserId};
use crate::state::AppState;
use crate::store::dedup_events;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route("/events/{id}", axum::routing::put(update_event).delete(delete_event))
}

/// GET /events - All events for the user, duplicates collapsed in favor
/// of the synced copy.
async fn list_events(
    State(state): State<AppState>,
    UserId(user_id): UserId,
) -> Result<Json<Vec<CanonicalEvent>>, AppError> {
    let events = state.db.list_events(&user_id)?;
    Ok(Json(dedup_events(events)))
}

#[derive(Deserialize)]
pub struct CreateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub all_day: bool,
    pub location: Option<String>,
    pub attendees: Option<String>,
    pub color_hex: Option<String>,
}

/// A mutated event plus the outcome of its remote push.
#[derive(Serialize)]
pub struct MutationResponse {
    pub event: CanonicalEvent,
    pub remote: RemoteStatus,
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
    pub remote: RemoteStatus,
}

/// POST /events - Create a local event and push it best-effort.
async fn create_event(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Json(req): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<MutationResponse>), AppError> {
    let title = req
        .title
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| SyncError::Validation("title is required".to_string()))?;
    let start_at = req
        .start_at
        .ok_or_else(|| SyncError::Validation("start_at is required".to_string()))?;
    let end_at = req
        .end_at
        .ok_or_else(|| SyncError::Validation("end_at is required".to_string()))?;
    if end_at < start_at {
        return Err(SyncError::Validation("end_at is before start_at".to_string()).into());
    }

    let _guard = state.locks.acquire(&user_id).await;

    let mut event = CanonicalEvent::new_local(&user_id, title, start_at, end_at);
    event.description = req.description;
    event.all_day = req.all_day;
    event.location = req.location;
    event.attendees = req.attendees;
    event.color_hex = req.color_hex;
    state.db.insert_event(&event)?;

    let remote = state.propagator.on_create(&event).await;

    // Re-read so a successful push's external ids land in the response.
    let event = state
        .db
        .get_event(&user_id, &event.local_id)?
        .unwrap_or(event);

    Ok((StatusCode::CREATED, Json(MutationResponse { event, remote })))
}

#[derive(Deserialize)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub all_day: Option<bool>,
    pub location: Option<String>,
    pub attendees: Option<String>,
    pub status: Option<String>,
    pub color_hex: Option<String>,
}

/// PUT /events/:id - Patch fields on an event, then push best-effort.
async fn update_event(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(local_id): Path<String>,
    Json(req): Json<UpdateEventRequest>,
) -> Result<Json<MutationResponse>, AppError> {
    let _guard = state.locks.acquire(&user_id).await;

    let mut event = state
        .db
        .get_event(&user_id, &local_id)?
        .ok_or_else(|| SyncError::NotFound(local_id.clone()))?;

    if let Some(title) = req.title {
        if title.trim().is_empty() {
            return Err(SyncError::Validation("title cannot be empty".to_string()).into());
        }
        event.title = title;
    }
    if let Some(description) = req.description {
        event.description = Some(description);
    }
    if let Some(start_at) = req.start_at {
        event.start_at = start_at;
    }
    if let Some(end_at) = req.end_at {
        event.end_at = end_at;
    }
    if let Some(all_day) = req.all_day {
        event.all_day = all_day;
    }
    if let Some(location) = req.location {
        event.location = Some(location);
    }
    if let Some(attendees) = req.attendees {
        event.attendees = Some(attendees);
    }
    if let Some(status) = req.status {
        event.status = status;
    }
    if let Some(color_hex) = req.color_hex {
        event.color_hex = Some(color_hex);
    }
    if event.end_at < event.start_at {
        return Err(SyncError::Validation("end_at is before start_at".to_string()).into());
    }
    event.last_modified = Utc::now();

    state.db.update_event(&event)?;
    let remote = state.propagator.on_update(&event).await;

    Ok(Json(MutationResponse { event, remote }))
}

/// DELETE /events/:id - Remove the local row, then the remote copy
/// best-effort.
async fn delete_event(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(local_id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    let _guard = state.locks.acquire(&user_id).await;

    let event = state
        .db
        .get_event(&user_id, &local_id)?
        .ok_or_else(|| SyncError::NotFound(local_id.clone()))?;

    state.db.delete_event(&user_id, &local_id)?;
    let remote = state.propagator.on_delete(&event).await;

    Ok(Json(DeleteResponse {
        deleted: true,
        remote,
    }))
}
