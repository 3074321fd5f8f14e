//! crates/media_lists_core/src/chat_history.rs
//!
//! Assistant conversations kept in the user's document, one array entry per turn.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::{ChatMessage, StoredChatMessage, UserLists};
use crate::ports::{DocumentStore, PortError, PortResult};

/// Document field holding the conversation turns.
pub const CHAT_HISTORY_FIELD: &str = "chatHistory";

#[derive(Clone)]
pub struct ChatHistoryService {
    store: Arc<dyn DocumentStore>,
}

impl ChatHistoryService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Appends one turn with a fresh `createdAt`, creating the user document if needed.
    pub async fn save_message(
        &self,
        user_id: &str,
        message: ChatMessage,
    ) -> PortResult<StoredChatMessage> {
        if user_id.is_empty() {
            return Err(PortError::InvalidInput("User ID is required".to_string()));
        }
        if self.store.get(user_id).await?.is_none() {
            self.store.set(user_id, UserLists::empty_document()).await?;
            debug!(user_id, "Initialized user document for chat history");
        }

        let now = Utc::now();
        let stored = StoredChatMessage {
            id: format!("{}-{}", now.timestamp_micros(), message.role.as_str()),
            role: message.role,
            content: message.content,
            created_at: now,
        };
        let value = serde_json::to_value(&stored)
            .map_err(|e| PortError::Unexpected(format!("Failed to encode chat message: {}", e)))?;
        self.store.array_union(user_id, CHAT_HISTORY_FIELD, value).await?;

        info!(user_id, message_id = %stored.id, "Saved chat message");
        Ok(stored)
    }

    /// All saved turns, oldest first. Turns with the same timestamp keep their save order.
    pub async fn history(&self, user_id: &str) -> PortResult<Vec<StoredChatMessage>> {
        if user_id.is_empty() {
            return Ok(Vec::new());
        }
        let Some(mut document) = self.store.get(user_id).await? else {
            return Ok(Vec::new());
        };
        let Some(raw) = document.remove(CHAT_HISTORY_FIELD) else {
            return Ok(Vec::new());
        };

        let mut messages: Vec<StoredChatMessage> = serde_json::from_value(raw)
            .map_err(|e| PortError::Unexpected(format!("Malformed chat history: {}", e)))?;
        messages.sort_by_key(|message| message.created_at);
        Ok(messages)
    }
}
