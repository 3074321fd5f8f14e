//! crates/media_lists_core/src/assistant.rs
//!
//! Grounds the movie assistant in the user's saved lists. The completion backend
//! is an opaque `CompletionService`; this module decides what the assistant knows
//! and answers watchlist questions directly from the store.

use serde::Serialize;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::debug;

use crate::domain::{ChatMessage, ChatRole, SavedMedia, UserLists};
use crate::lists::ListService;
use crate::ports::{CompletionService, PortError, PortResult};

/// How many titles per list are written into the prompt.
const PROMPT_TITLES_PER_LIST: usize = 20;

const EMPTY_WATCHLIST_REPLY: &str =
    "Your watchlist is currently empty. Would you like some movie recommendations to get started?";
const WATCHLIST_REPLY: &str = "Here's your current watchlist:";

/// The assistant's answer, optionally with saved items to display alongside it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AssistantReply {
    pub content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<SavedMedia>,
}

/// Builds the system prompt describing the user's lists.
pub fn build_system_prompt(display_name: Option<&str>, lists: &UserLists) -> String {
    let mut prompt = String::from(
        "You are CineAI, a knowledgeable movie assistant with access to the user's lists.\n\
         \n\
         Important instructions:\n\
         1. You have full access to the user's lists below and can answer questions about them.\n\
         2. Never say you can't access the watchlist.\n\
         3. Format list items clearly with bullets and the year in parentheses.\n\
         4. Always put movie and show titles in quotes.\n",
    );

    if let Some(name) = display_name.filter(|name| !name.trim().is_empty()) {
        let _ = writeln!(prompt, "\nThe user's name is {}.", name.trim());
    }

    let _ = writeln!(prompt, "\nCurrent user data:");
    let _ = writeln!(prompt, "- Watchlist count: {}", lists.watchlist.len());
    let _ = writeln!(
        prompt,
        "- Recently added: {}",
        lists
            .watchlist
            .iter()
            .max_by_key(|item| item.added_at)
            .map_or("None", |item| item.title.as_str())
    );

    write_section(&mut prompt, "Watchlist", &lists.watchlist);
    write_section(&mut prompt, "Favorites", &lists.favorites);
    write_section(&mut prompt, "Recently viewed", &lists.recently_viewed);
    prompt
}

fn write_section(prompt: &mut String, heading: &str, items: &[SavedMedia]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(prompt, "\n{}:", heading);
    for item in items.iter().take(PROMPT_TITLES_PER_LIST) {
        let year = item
            .release_date
            .as_deref()
            .or(item.first_air_date.as_deref())
            .and_then(|date| date.get(..4));
        match year {
            Some(year) => {
                let _ = writeln!(prompt, "- \"{}\" ({}, {:?})", item.title, year, item.media_type);
            }
            None => {
                let _ = writeln!(prompt, "- \"{}\" ({:?})", item.title, item.media_type);
            }
        }
    }
    if items.len() > PROMPT_TITLES_PER_LIST {
        let _ = writeln!(prompt, "- ...and {} more", items.len() - PROMPT_TITLES_PER_LIST);
    }
}

/// Chat front end that combines the user's lists with a completion backend.
#[derive(Clone)]
pub struct AssistantService {
    lists: ListService,
    completion: Arc<dyn CompletionService>,
}

impl AssistantService {
    pub fn new(lists: ListService, completion: Arc<dyn CompletionService>) -> Self {
        Self { lists, completion }
    }

    /// Answers the last user message of `messages`.
    ///
    /// Questions mentioning the watchlist are answered from the store without calling
    /// the completion service. Only reads; a missing document is not created.
    pub async fn reply(
        &self,
        user_id: &str,
        display_name: Option<&str>,
        messages: &[ChatMessage],
    ) -> PortResult<AssistantReply> {
        let question = match messages.last() {
            Some(message)
                if message.role == ChatRole::User && !message.content.trim().is_empty() =>
            {
                message.content.as_str()
            }
            _ => {
                return Err(PortError::InvalidInput(
                    "The conversation must end with a user message".to_string(),
                ))
            }
        };

        let lists = self.lists.read_lists(user_id).await?;

        if question.to_lowercase().contains("watchlist") {
            debug!(user_id, "Answering watchlist question from stored lists");
            let content = if lists.watchlist.is_empty() {
                EMPTY_WATCHLIST_REPLY
            } else {
                WATCHLIST_REPLY
            };
            return Ok(AssistantReply {
                content: content.to_string(),
                media: lists.watchlist,
            });
        }

        let system_prompt = build_system_prompt(display_name, &lists);
        let content = self.completion.complete(&system_prompt, messages).await?;
        Ok(AssistantReply {
            content,
            media: Vec::new(),
        })
    }
}
