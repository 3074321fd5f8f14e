//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use media_lists_core::{
    ports::{CompletionService, DocumentStore},
    AssistantService, ChatHistoryService, ListService, WatchHistoryService,
};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub lists: ListService,
    pub history: WatchHistoryService,
    pub chats: ChatHistoryService,
    /// `None` when no completion backend is configured; chat requests then fail with 503.
    pub assistant: Option<AssistantService>,
}

impl AppState {
    /// Wires the core services around one document store.
    pub fn new(
        config: Arc<Config>,
        store: Arc<dyn DocumentStore>,
        completion: Option<Arc<dyn CompletionService>>,
    ) -> Self {
        let lists = ListService::new(store.clone());
        let history = WatchHistoryService::new(store.clone());
        let chats = ChatHistoryService::new(store);
        let assistant =
            completion.map(|completion| AssistantService::new(lists.clone(), completion));
        Self {
            config,
            lists,
            history,
            chats,
            assistant,
        }
    }
}
