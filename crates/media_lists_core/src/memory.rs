//! crates/media_lists_core/src/memory.rs
//!
//! An in-process `DocumentStore`. Used by tests and by the `memory` store backend
//! for local development; contents are lost on restart.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::ports::{DocumentStore, PortError, PortResult, SnapshotStream, UserDocument};
use crate::snapshots::SnapshotHub;

/// Document store kept in a `HashMap` behind an async lock.
#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: RwLock<HashMap<String, UserDocument>>,
    snapshots: SnapshotHub,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `edit` to the array stored in `field`, creating the field if needed.
    async fn edit_array<F>(&self, user_id: &str, field: &str, edit: F) -> PortResult<()>
    where
        F: FnOnce(&mut Vec<Value>),
    {
        let mut documents = self.documents.write().await;
        let document = documents
            .get_mut(user_id)
            .ok_or_else(|| PortError::NotFound(format!("User document {} not found", user_id)))?;

        let slot = document
            .entry(field.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        let array = slot.as_array_mut().ok_or_else(|| {
            PortError::Unexpected(format!("Field '{}' is not an array", field))
        })?;
        edit(array);

        self.snapshots.publish(user_id, document);
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, user_id: &str) -> PortResult<Option<UserDocument>> {
        Ok(self.documents.read().await.get(user_id).cloned())
    }

    async fn set(&self, user_id: &str, document: UserDocument) -> PortResult<()> {
        let mut documents = self.documents.write().await;
        self.snapshots.publish(user_id, &document);
        documents.insert(user_id.to_string(), document);
        Ok(())
    }

    async fn array_union(&self, user_id: &str, field: &str, value: Value) -> PortResult<()> {
        self.edit_array(user_id, field, |array| {
            if !array.contains(&value) {
                array.push(value);
            }
        })
        .await
    }

    async fn array_remove(&self, user_id: &str, field: &str, value: Value) -> PortResult<()> {
        self.edit_array(user_id, field, |array| array.retain(|element| element != &value))
            .await
    }

    async fn watch(&self, user_id: &str) -> PortResult<SnapshotStream> {
        Ok(self.snapshots.watch(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use serde_json::json;

    async fn seeded() -> MemoryDocumentStore {
        let store = MemoryDocumentStore::new();
        store
            .set("u1", json!({ "watchlist": [] }).as_object().unwrap().clone())
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn union_deduplicates_only_identical_values() {
        let store = seeded().await;
        let a = json!({ "id": 1, "title": "Alien" });
        let b = json!({ "id": 1, "title": "Alien (1979)" });

        store.array_union("u1", "watchlist", a.clone()).await.unwrap();
        store.array_union("u1", "watchlist", a.clone()).await.unwrap();
        store.array_union("u1", "watchlist", b.clone()).await.unwrap();

        let document = store.get("u1").await.unwrap().unwrap();
        assert_eq!(document["watchlist"], json!([a, b]));
    }

    #[tokio::test]
    async fn remove_needs_an_exact_value_match() {
        let store = seeded().await;
        let stored = json!({ "id": 1, "title": "Alien" });
        store.array_union("u1", "watchlist", stored.clone()).await.unwrap();

        store
            .array_remove("u1", "watchlist", json!({ "id": 1, "title": "Stale" }))
            .await
            .unwrap();
        assert_eq!(store.get("u1").await.unwrap().unwrap()["watchlist"], json!([stored]));

        store.array_remove("u1", "watchlist", stored).await.unwrap();
        assert_eq!(store.get("u1").await.unwrap().unwrap()["watchlist"], json!([]));
    }

    #[tokio::test]
    async fn array_updates_on_missing_document_fail() {
        let store = MemoryDocumentStore::new();
        let err = store
            .array_union("ghost", "watchlist", json!({ "id": 1 }))
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));
        assert!(store.get("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn union_creates_a_missing_field() {
        let store = seeded().await;
        store.array_union("u1", "favorites", json!({ "id": 3 })).await.unwrap();
        let document = store.get("u1").await.unwrap().unwrap();
        assert_eq!(document["favorites"], json!([{ "id": 3 }]));
    }

    #[tokio::test]
    async fn watchers_see_each_write() {
        let store = seeded().await;
        let mut snapshots = store.watch("u1").await.unwrap();

        store.array_union("u1", "watchlist", json!({ "id": 5 })).await.unwrap();

        let snapshot = snapshots.next().await.unwrap().unwrap();
        assert_eq!(snapshot["watchlist"], json!([{ "id": 5 }]));
    }
}
