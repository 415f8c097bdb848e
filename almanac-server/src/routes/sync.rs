//! The manual sync endpoint.

use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;

use almanac_core::CalendarSyncResult;

use crate::routes::{AppError, UserId};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/sync", post(run_sync))
}

#[derive(Serialize)]
pub struct SyncResponse {
    pub success: bool,
    pub total_events: usize,
    pub calendars_count: usize,
    pub per_calendar_results: Vec<CalendarSyncResult>,
}

/// POST /sync - Run one full sync for the requesting user.
async fn run_sync(
    State(state): State<AppState>,
    UserId(user_id): UserId,
) -> Result<Json<SyncResponse>, AppError> {
    let run = state.engine.run_sync(&user_id).await?;

    Ok(Json(SyncResponse {
        success: true,
        total_events: run.total_synced,
        calendars_count: run.per_calendar.len(),
        per_calendar_results: run.per_calendar,
    }))
}
