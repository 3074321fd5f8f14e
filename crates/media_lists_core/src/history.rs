//! crates/media_lists_core/src/history.rs
//!
//! Playback history kept in the user's document next to the lists.

use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use crate::domain::{NewWatchHistoryEntry, WatchHistoryEntry};
use crate::ports::{DocumentStore, PortError, PortResult};

/// Document field holding the history array.
pub const WATCH_HISTORY_FIELD: &str = "watchHistory";

#[derive(Clone)]
pub struct WatchHistoryService {
    store: Arc<dyn DocumentStore>,
}

impl WatchHistoryService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Records a playback entry. The user document must already exist.
    pub async fn add_entry(
        &self,
        user_id: &str,
        entry: NewWatchHistoryEntry,
    ) -> PortResult<WatchHistoryEntry> {
        if self.store.get(user_id).await?.is_none() {
            return Err(PortError::NotFound("User document not found".to_string()));
        }

        let now = Utc::now();
        let stored = WatchHistoryEntry {
            id: format!("{}-{}", entry.movie_id, now.timestamp_millis()),
            movie_id: entry.movie_id,
            title: entry.title,
            poster_path: entry.poster_path,
            progress: entry.progress,
            duration: entry.duration,
            media_type: entry.media_type,
            episode: entry.episode,
            timestamp: now,
        };
        let value = serde_json::to_value(&stored)
            .map_err(|e| PortError::Unexpected(format!("Failed to encode history entry: {}", e)))?;
        self.store.array_union(user_id, WATCH_HISTORY_FIELD, value).await?;

        info!(user_id, entry_id = %stored.id, "Recorded watch history entry");
        Ok(stored)
    }

    /// All entries, most recent first.
    pub async fn entries(&self, user_id: &str) -> PortResult<Vec<WatchHistoryEntry>> {
        let Some(mut document) = self.store.get(user_id).await? else {
            return Ok(Vec::new());
        };
        let Some(raw) = document.remove(WATCH_HISTORY_FIELD) else {
            return Ok(Vec::new());
        };

        let mut entries: Vec<WatchHistoryEntry> = serde_json::from_value(raw)
            .map_err(|e| PortError::Unexpected(format!("Malformed watch history: {}", e)))?;
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EpisodeRef, MediaType, UserLists};
    use crate::memory::MemoryDocumentStore;
    use serde_json::json;

    fn progress(movie_id: i64) -> NewWatchHistoryEntry {
        NewWatchHistoryEntry {
            movie_id,
            title: "The Wire".to_string(),
            poster_path: None,
            progress: 0.5,
            duration: 3600.0,
            media_type: MediaType::Tv,
            episode: Some(EpisodeRef {
                season: 1,
                episode: 2,
                name: "The Detail".to_string(),
            }),
        }
    }

    #[tokio::test]
    async fn adding_requires_an_existing_document() {
        let history = WatchHistoryService::new(Arc::new(MemoryDocumentStore::new()));
        let err = history.add_entry("u1", progress(1438)).await.unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));
    }

    #[tokio::test]
    async fn entries_are_newest_first() {
        let store = Arc::new(MemoryDocumentStore::new());
        store.set("u1", UserLists::empty_document()).await.unwrap();
        store
            .array_union(
                "u1",
                WATCH_HISTORY_FIELD,
                json!({
                    "id": "1-0", "movieId": 1, "title": "Old", "poster_path": null,
                    "progress": 1.0, "duration": 10.0, "media_type": "movie",
                    "timestamp": "2020-01-01T00:00:00Z"
                }),
            )
            .await
            .unwrap();

        let history = WatchHistoryService::new(store);
        let added = history.add_entry("u1", progress(1438)).await.unwrap();
        assert!(added.id.starts_with("1438-"));

        let entries = history.entries("u1").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, added.id);
        assert_eq!(entries[1].title, "Old");
    }

    #[tokio::test]
    async fn missing_history_reads_as_empty() {
        let store = Arc::new(MemoryDocumentStore::new());
        let history = WatchHistoryService::new(store.clone());
        assert!(history.entries("u1").await.unwrap().is_empty());

        store.set("u1", UserLists::empty_document()).await.unwrap();
        assert!(history.entries("u1").await.unwrap().is_empty());
    }
}
