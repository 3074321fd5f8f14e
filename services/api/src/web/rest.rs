//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the list endpoints and the master
//! definition for the OpenAPI specification.

use crate::error::reject;
use crate::web::middleware::UserId;
use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use media_lists_core::{
    AssistantReply, ChatMessage, ChatRole, EpisodeRef, ListName, ListStats, MediaType,
    NewSavedMedia, NewWatchHistoryEntry, SavedMedia, StoredChatMessage, UserLists,
    WatchHistoryEntry,
};
use serde::Serialize;
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        get_lists_handler,
        get_stats_handler,
        get_list_handler,
        add_to_list_handler,
        toggle_handler,
        membership_handler,
        remove_from_list_handler,
        move_handler,
        crate::web::history::get_history_handler,
        crate::web::history::add_history_handler,
        crate::web::chat::chat_handler,
        crate::web::chat::chat_history_handler,
        crate::web::stream::list_stream_handler,
    ),
    components(
        schemas(
            UserLists, SavedMedia, NewSavedMedia, MediaType, ListName, ListStats,
            MembershipResponse, NewWatchHistoryEntry, WatchHistoryEntry, EpisodeRef,
            ChatMessage, ChatRole, StoredChatMessage, AssistantReply,
            crate::web::chat::ChatRequest,
        )
    ),
    tags(
        (name = "Media Lists API", description = "Personal watchlists, favorites and watch history.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response Structs
//=========================================================================================

/// Whether an item is in a list after a query or toggle.
#[derive(Serialize, ToSchema)]
pub struct MembershipResponse {
    pub list: ListName,
    pub media_id: i64,
    pub in_list: bool,
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Liveness check.
#[utoipa::path(get, path = "/health", responses((status = 200, description = "Service is up")))]
pub async fn health_handler() -> StatusCode {
    StatusCode::OK
}

/// Returns all five lists, initializing them on first access.
#[utoipa::path(
    get,
    path = "/lists",
    responses(
        (status = 200, description = "The caller's lists", body = UserLists),
        (status = 401, description = "Missing x-user-id header"),
        (status = 500, description = "Internal server error")
    ),
    params(("x-user-id" = String, Header, description = "The identity provider's uid."))
)]
pub async fn get_lists_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserId>,
) -> Result<Json<UserLists>, (StatusCode, String)> {
    let lists = state
        .lists
        .get_lists(user.as_str())
        .await
        .map_err(|e| reject("load lists", e))?;
    Ok(Json(lists))
}

/// Item counts per list, for profile pages.
#[utoipa::path(
    get,
    path = "/lists/stats",
    responses((status = 200, description = "Counts per list", body = ListStats)),
    params(("x-user-id" = String, Header, description = "The identity provider's uid."))
)]
pub async fn get_stats_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserId>,
) -> Result<Json<ListStats>, (StatusCode, String)> {
    let stats = state
        .lists
        .stats(user.as_str())
        .await
        .map_err(|e| reject("load list stats", e))?;
    Ok(Json(stats))
}

/// Returns a single list.
#[utoipa::path(
    get,
    path = "/lists/{list}",
    responses((status = 200, description = "Items in the list", body = [SavedMedia])),
    params(
        ("list" = ListName, Path, description = "List name"),
        ("x-user-id" = String, Header, description = "The identity provider's uid.")
    )
)]
pub async fn get_list_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserId>,
    Path(list): Path<ListName>,
) -> Result<Json<Vec<SavedMedia>>, (StatusCode, String)> {
    let items = state
        .lists
        .get_list(user.as_str(), list)
        .await
        .map_err(|e| reject("load list", e))?;
    Ok(Json(items))
}

/// Adds an item to a list. Adding an item that is already there changes nothing.
#[utoipa::path(
    post,
    path = "/lists/{list}",
    request_body = NewSavedMedia,
    responses(
        (status = 204, description = "Item is in the list"),
        (status = 400, description = "Invalid media record")
    ),
    params(
        ("list" = ListName, Path, description = "List name"),
        ("x-user-id" = String, Header, description = "The identity provider's uid.")
    )
)]
pub async fn add_to_list_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserId>,
    Path(list): Path<ListName>,
    Json(media): Json<NewSavedMedia>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .lists
        .add_to_list(user.as_str(), list, media)
        .await
        .map_err(|e| reject("add to list", e))?;
    Ok(StatusCode::NO_CONTENT)
}

/// Removes the item if present, adds it otherwise.
#[utoipa::path(
    post,
    path = "/lists/{list}/toggle",
    request_body = NewSavedMedia,
    responses((status = 200, description = "New membership", body = MembershipResponse)),
    params(
        ("list" = ListName, Path, description = "List name"),
        ("x-user-id" = String, Header, description = "The identity provider's uid.")
    )
)]
pub async fn toggle_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserId>,
    Path(list): Path<ListName>,
    Json(media): Json<NewSavedMedia>,
) -> Result<Json<MembershipResponse>, (StatusCode, String)> {
    let media_id = media.id;
    let in_list = state
        .lists
        .toggle_in_list(user.as_str(), list, media)
        .await
        .map_err(|e| reject("toggle list membership", e))?;
    Ok(Json(MembershipResponse {
        list,
        media_id,
        in_list,
    }))
}

/// Reports whether an item is in a list.
#[utoipa::path(
    get,
    path = "/lists/{list}/{media_id}",
    responses((status = 200, description = "Membership", body = MembershipResponse)),
    params(
        ("list" = ListName, Path, description = "List name"),
        ("media_id" = i64, Path, description = "Catalog id"),
        ("x-user-id" = String, Header, description = "The identity provider's uid.")
    )
)]
pub async fn membership_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserId>,
    Path((list, media_id)): Path<(ListName, i64)>,
) -> Result<Json<MembershipResponse>, (StatusCode, String)> {
    let in_list = state
        .lists
        .is_in_list(user.as_str(), list, media_id)
        .await
        .map_err(|e| reject("check list membership", e))?;
    Ok(Json(MembershipResponse {
        list,
        media_id,
        in_list,
    }))
}

/// Removes an item from a list. Removing an absent item changes nothing.
#[utoipa::path(
    delete,
    path = "/lists/{list}/{media_id}",
    responses((status = 204, description = "Item is not in the list")),
    params(
        ("list" = ListName, Path, description = "List name"),
        ("media_id" = i64, Path, description = "Catalog id"),
        ("x-user-id" = String, Header, description = "The identity provider's uid.")
    )
)]
pub async fn remove_from_list_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserId>,
    Path((list, media_id)): Path<(ListName, i64)>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .lists
        .remove_from_list(user.as_str(), list, media_id)
        .await
        .map_err(|e| reject("remove from list", e))?;
    Ok(StatusCode::NO_CONTENT)
}

/// Moves an item between lists. Any `addedAt` in the body is ignored; the item
/// gets a fresh one in the target list.
#[utoipa::path(
    post,
    path = "/lists/{list}/move/{to}",
    request_body = NewSavedMedia,
    responses(
        (status = 204, description = "Item moved"),
        (status = 409, description = "Item was removed from the source list but not added to the target")
    ),
    params(
        ("list" = ListName, Path, description = "Source list"),
        ("to" = ListName, Path, description = "Target list"),
        ("x-user-id" = String, Header, description = "The identity provider's uid.")
    )
)]
pub async fn move_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserId>,
    Path((from, to)): Path<(ListName, ListName)>,
    Json(media): Json<NewSavedMedia>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .lists
        .move_to_list(user.as_str(), from, to, media)
        .await
        .map_err(|e| reject("move item", e))?;
    Ok(StatusCode::NO_CONTENT)
}
