//! services/api/src/web/chat.rs
//!
//! The assistant chat endpoints. Every answered exchange is saved to the
//! caller's chat history.

use crate::error::reject;
use crate::web::middleware::{UserId, DISPLAY_NAME_HEADER};
use crate::web::state::AppState;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
    Extension,
};
use media_lists_core::{AssistantReply, ChatMessage, ChatRole, StoredChatMessage};
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;
use utoipa::ToSchema;

/// The conversation so far; the last message must come from the user.
#[derive(Deserialize, ToSchema)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
}

/// Answers the user's latest message with knowledge of their lists.
#[utoipa::path(
    post,
    path = "/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Assistant reply", body = AssistantReply),
        (status = 400, description = "Conversation does not end with a user message"),
        (status = 503, description = "No completion service configured")
    ),
    params(("x-user-id" = String, Header, description = "The identity provider's uid."))
)]
pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserId>,
    headers: HeaderMap,
    Json(req): Json<ChatRequest>,
) -> Result<Json<AssistantReply>, (StatusCode, String)> {
    let Some(assistant) = state.assistant.as_ref() else {
        warn!("Chat requested but no completion service is configured");
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "The assistant is not available".to_string(),
        ));
    };

    let display_name = headers
        .get(DISPLAY_NAME_HEADER)
        .and_then(|v| v.to_str().ok());

    let reply = assistant
        .reply(user.as_str(), display_name, &req.messages)
        .await
        .map_err(|e| reject("answer chat message", e))?;

    let turns = req.messages.last().cloned().into_iter().chain([ChatMessage {
        role: ChatRole::Assistant,
        content: reply.content.clone(),
    }]);
    for turn in turns {
        state
            .chats
            .save_message(user.as_str(), turn)
            .await
            .map_err(|e| reject("save chat message", e))?;
    }
    Ok(Json(reply))
}

/// Returns the caller's saved conversation, oldest turn first.
#[utoipa::path(
    get,
    path = "/chat/history",
    responses((status = 200, description = "Saved turns", body = [StoredChatMessage])),
    params(("x-user-id" = String, Header, description = "The identity provider's uid."))
)]
pub async fn chat_history_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserId>,
) -> Result<Json<Vec<StoredChatMessage>>, (StatusCode, String)> {
    let messages = state
        .chats
        .history(user.as_str())
        .await
        .map_err(|e| reject("load chat history", e))?;
    Ok(Json(messages))
}
