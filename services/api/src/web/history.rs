//! services/api/src/web/history.rs
//!
//! Handlers for the caller's playback history.

use crate::error::reject;
use crate::web::middleware::UserId;
use crate::web::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use media_lists_core::{NewWatchHistoryEntry, WatchHistoryEntry};
use std::sync::Arc;

/// Returns the caller's history, most recent first.
#[utoipa::path(
    get,
    path = "/history",
    responses((status = 200, description = "History entries", body = [WatchHistoryEntry])),
    params(("x-user-id" = String, Header, description = "The identity provider's uid."))
)]
pub async fn get_history_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserId>,
) -> Result<Json<Vec<WatchHistoryEntry>>, (StatusCode, String)> {
    let entries = state
        .history
        .entries(user.as_str())
        .await
        .map_err(|e| reject("load watch history", e))?;
    Ok(Json(entries))
}

/// Records a playback entry. The caller's lists must have been initialized.
#[utoipa::path(
    post,
    path = "/history",
    request_body = NewWatchHistoryEntry,
    responses(
        (status = 201, description = "Entry recorded", body = WatchHistoryEntry),
        (status = 404, description = "User document not found")
    ),
    params(("x-user-id" = String, Header, description = "The identity provider's uid."))
)]
pub async fn add_history_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserId>,
    Json(entry): Json<NewWatchHistoryEntry>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let stored = state
        .history
        .add_entry(user.as_str(), entry)
        .await
        .map_err(|e| reject("record watch history", e))?;
    Ok((StatusCode::CREATED, Json(stored)))
}
