//! crates/media_lists_core/src/lists.rs
//!
//! The list synchronization module: add, remove, move and query saved media in a
//! user's named lists. The service holds no state of its own. Every call reads or
//! writes the user's document in the `DocumentStore`, so independent consumers stay
//! consistent only by re-reading the store or by subscribing to its snapshots.
//!
//! No locking happens here. `add_to_list` checks for an existing id and then issues
//! an array union; two concurrent adds of differently-denormalized copies of the same
//! id can both pass the check and both land. The store's union only collapses
//! byte-identical values.

use chrono::Utc;
use futures::StreamExt;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::{ListName, ListStats, NewSavedMedia, SavedMedia, UserLists};
use crate::history::WATCH_HISTORY_FIELD;
use crate::ports::{DocumentStore, PortError, PortResult, UserDocument};

//=========================================================================================
// Subscription Handle
//=========================================================================================

/// A live subscription created by [`ListService::subscribe`].
///
/// Delivery stops when the handle is unsubscribed or dropped.
#[must_use = "dropping a Subscription ends it immediately"]
pub struct Subscription {
    token: CancellationToken,
}

impl Subscription {
    pub fn unsubscribe(self) {
        // Cancellation happens in Drop.
    }

    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

//=========================================================================================
// The Service
//=========================================================================================

/// Operations on a user's saved-media lists.
#[derive(Clone)]
pub struct ListService {
    store: Arc<dyn DocumentStore>,
}

impl ListService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Returns all five lists, creating the empty default document on first access.
    pub async fn get_lists(&self, user_id: &str) -> PortResult<UserLists> {
        require_user(user_id)?;

        match self.store.get(user_id).await? {
            Some(document) => UserLists::from_document(&document),
            None => {
                self.initialize(user_id).await?;
                Ok(UserLists::default())
            }
        }
    }

    /// Returns one list. An absent document reads as empty and is not created.
    pub async fn get_list(&self, user_id: &str, list: ListName) -> PortResult<Vec<SavedMedia>> {
        if user_id.is_empty() {
            return Ok(Vec::new());
        }
        let lists = self.read_lists(user_id).await?;
        Ok(lists.into_list(list))
    }

    /// Adds `media` to `list` with a fresh `addedAt`. A second add of the same id is a no-op.
    pub async fn add_to_list(
        &self,
        user_id: &str,
        list: ListName,
        media: NewSavedMedia,
    ) -> PortResult<()> {
        require_user(user_id)?;
        media.validate()?;

        let document = match self.store.get(user_id).await? {
            Some(document) => document,
            None => self.initialize(user_id).await?,
        };

        if find_stored(&document, list, media.id).is_some() {
            debug!(user_id, %list, media_id = media.id, "Item already in list; add ignored");
            return Ok(());
        }

        let media_id = media.id;
        let saved = SavedMedia::stamp(media, Utc::now());
        let value = serde_json::to_value(&saved)
            .map_err(|e| PortError::Unexpected(format!("Failed to encode saved media: {}", e)))?;
        self.store.array_union(user_id, list.field(), value).await?;

        info!(user_id, %list, media_id, "Added item to list");
        Ok(())
    }

    /// Removes the item with `media_id` from `list`. Removing an absent item is a no-op.
    ///
    /// The removal passes the stored record back to the store's exact-match remove.
    /// If another writer replaces that record between the read and the remove, nothing
    /// is removed and no error is reported.
    pub async fn remove_from_list(
        &self,
        user_id: &str,
        list: ListName,
        media_id: i64,
    ) -> PortResult<()> {
        require_user(user_id)?;
        self.remove_stored(user_id, list, media_id).await?;
        Ok(())
    }

    /// Moves `media` from one list to another as a remove followed by a fresh add.
    ///
    /// The two steps are separate store writes. When the add fails after the remove
    /// took the item out of `from`, the item is in neither list and the failure is
    /// reported as `PortError::PartialMove`; nothing is rolled back. If `from` did not
    /// hold the item, an add failure is returned as the store reported it.
    pub async fn move_to_list(
        &self,
        user_id: &str,
        from: ListName,
        to: ListName,
        media: impl Into<NewSavedMedia>,
    ) -> PortResult<()> {
        require_user(user_id)?;
        let media: NewSavedMedia = media.into();
        media.validate()?;

        let removed = self.remove_stored(user_id, from, media.id).await?;

        match self.add_to_list(user_id, to, media).await {
            Ok(()) => Ok(()),
            Err(e) if removed => {
                warn!(user_id, %from, %to, error = %e, "Move interrupted after removal");
                Err(PortError::PartialMove {
                    from,
                    to,
                    reason: e.to_string(),
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Whether an item with `media_id` is in `list`. Never writes.
    pub async fn is_in_list(
        &self,
        user_id: &str,
        list: ListName,
        media_id: i64,
    ) -> PortResult<bool> {
        if user_id.is_empty() {
            return Ok(false);
        }
        Ok(match self.store.get(user_id).await? {
            Some(document) => find_stored(&document, list, media_id).is_some(),
            None => false,
        })
    }

    /// Removes the item if present, adds it otherwise. Returns the new membership.
    pub async fn toggle_in_list(
        &self,
        user_id: &str,
        list: ListName,
        media: NewSavedMedia,
    ) -> PortResult<bool> {
        if self.is_in_list(user_id, list, media.id).await? {
            self.remove_from_list(user_id, list, media.id).await?;
            Ok(false)
        } else {
            self.add_to_list(user_id, list, media).await?;
            Ok(true)
        }
    }

    /// Counts items per list and watch-history entries. Never writes.
    pub async fn stats(&self, user_id: &str) -> PortResult<ListStats> {
        require_user(user_id)?;
        let Some(document) = self.store.get(user_id).await? else {
            return Ok(ListStats::default());
        };
        Ok(stats_of(&document))
    }

    /// Calls `callback` with the user's lists now and after every write to the document.
    ///
    /// The current state is read without creating a missing document. Store errors
    /// are passed to the callback; the subscription keeps running until the handle is
    /// dropped or the store closes the stream.
    pub async fn subscribe<F>(&self, user_id: &str, callback: F) -> PortResult<Subscription>
    where
        F: Fn(PortResult<UserLists>) + Send + Sync + 'static,
    {
        require_user(user_id)?;

        // Watch before reading so no write between the two is missed.
        let mut snapshots = self.store.watch(user_id).await?;
        callback(self.read_lists(user_id).await);

        let token = CancellationToken::new();
        let cancelled = token.clone();
        let user_id = user_id.to_string();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    next = snapshots.next() => match next {
                        Some(snapshot) => {
                            callback(
                                snapshot.and_then(|document| UserLists::from_document(&document)),
                            );
                        }
                        None => break,
                    },
                }
            }
            debug!(%user_id, "List subscription ended");
        });

        Ok(Subscription { token })
    }

    /// Returns all five lists without creating a missing document.
    pub async fn read_lists(&self, user_id: &str) -> PortResult<UserLists> {
        match self.store.get(user_id).await? {
            Some(document) => UserLists::from_document(&document),
            None => Ok(UserLists::default()),
        }
    }

    /// Removes the stored record for `media_id` and reports whether one was there.
    ///
    /// The removal passes the stored record back to the store's exact-match remove.
    async fn remove_stored(
        &self,
        user_id: &str,
        list: ListName,
        media_id: i64,
    ) -> PortResult<bool> {
        let Some(document) = self.store.get(user_id).await? else {
            debug!(user_id, %list, media_id, "No user document; remove ignored");
            return Ok(false);
        };

        match find_stored(&document, list, media_id) {
            Some(stored) => {
                self.store
                    .array_remove(user_id, list.field(), stored.clone())
                    .await?;
                info!(user_id, %list, media_id, "Removed item from list");
                Ok(true)
            }
            None => {
                debug!(user_id, %list, media_id, "Item not in list; remove ignored");
                Ok(false)
            }
        }
    }

    async fn initialize(&self, user_id: &str) -> PortResult<UserDocument> {
        let document = UserLists::empty_document();
        self.store.set(user_id, document.clone()).await?;
        info!(user_id, "Initialized user lists");
        Ok(document)
    }
}

//=========================================================================================
// Helpers
//=========================================================================================

fn require_user(user_id: &str) -> PortResult<()> {
    if user_id.is_empty() {
        return Err(PortError::InvalidInput("User ID is required".to_string()));
    }
    Ok(())
}

/// Finds the stored record for `media_id`, exactly as the store holds it.
///
/// Matching is by `id` alone; a movie and a TV show sharing a numeric id collide.
fn find_stored(document: &UserDocument, list: ListName, media_id: i64) -> Option<&Value> {
    document
        .get(list.field())
        .and_then(Value::as_array)?
        .iter()
        .find(|item| item.get("id").and_then(Value::as_i64) == Some(media_id))
}

fn stats_of(document: &UserDocument) -> ListStats {
    let count = |field: &str| {
        document
            .get(field)
            .and_then(Value::as_array)
            .map_or(0, Vec::len)
    };
    ListStats {
        watchlist_count: count(ListName::Watchlist.field()),
        favorites_count: count(ListName::Favorites.field()),
        watched_count: count(ListName::Watched.field()),
        want_to_watch_count: count(ListName::WantToWatch.field()),
        recently_viewed_count: count(ListName::RecentlyViewed.field()),
        watch_history_count: count(WATCH_HISTORY_FIELD),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MediaType;
    use crate::memory::MemoryDocumentStore;
    use crate::ports::SnapshotStream;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn inception() -> NewSavedMedia {
        NewSavedMedia {
            id: 42,
            title: "Inception".to_string(),
            media_type: MediaType::Movie,
            poster_path: Some("/x.jpg".to_string()),
            backdrop_path: None,
            overview: None,
            vote_average: None,
            release_date: None,
            first_air_date: None,
        }
    }

    fn service() -> (ListService, Arc<MemoryDocumentStore>) {
        let store = Arc::new(MemoryDocumentStore::new());
        (ListService::new(store.clone()), store)
    }

    #[tokio::test]
    async fn first_access_initializes_empty_lists_once() {
        let (lists, store) = service();

        assert_eq!(lists.get_lists("u1").await.unwrap(), UserLists::default());
        let stored = store.get("u1").await.unwrap().unwrap();
        assert_eq!(stored, UserLists::empty_document());

        assert_eq!(lists.get_lists("u1").await.unwrap(), UserLists::default());
    }

    #[tokio::test]
    async fn get_lists_requires_a_user_id() {
        let (lists, _) = service();
        assert!(matches!(lists.get_lists("").await, Err(PortError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn adding_twice_keeps_one_item() {
        let (lists, _) = service();
        lists.get_lists("u1").await.unwrap();

        lists.add_to_list("u1", ListName::Watchlist, inception()).await.unwrap();
        let once = lists.get_list("u1", ListName::Watchlist).await.unwrap();
        lists.add_to_list("u1", ListName::Watchlist, inception()).await.unwrap();
        let twice = lists.get_list("u1", ListName::Watchlist).await.unwrap();

        assert_eq!(once.len(), 1);
        assert_eq!(once, twice);
        assert_eq!(twice[0].id, 42);
    }

    #[tokio::test]
    async fn add_without_prior_read_creates_the_document() {
        let (lists, _) = service();
        lists.add_to_list("u1", ListName::Favorites, inception()).await.unwrap();

        let all = lists.get_lists("u1").await.unwrap();
        assert_eq!(all.favorites.len(), 1);
        assert!(all.watchlist.is_empty());
    }

    #[tokio::test]
    async fn add_rejects_invalid_media() {
        let (lists, _) = service();
        let mut media = inception();
        media.first_air_date = Some("2010-01-01".to_string());

        let err = lists.add_to_list("u1", ListName::Watchlist, media).await.unwrap_err();
        assert!(matches!(err, PortError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn remove_undoes_add() {
        let (lists, _) = service();
        let before = lists.get_lists("u1").await.unwrap();

        lists.add_to_list("u1", ListName::Watchlist, inception()).await.unwrap();
        lists.remove_from_list("u1", ListName::Watchlist, 42).await.unwrap();

        assert_eq!(lists.get_lists("u1").await.unwrap(), before);
    }

    #[tokio::test]
    async fn removing_a_missing_item_is_a_no_op() {
        let (lists, store) = service();
        lists.remove_from_list("nobody", ListName::Watched, 1).await.unwrap();
        assert!(store.get("nobody").await.unwrap().is_none());

        lists.add_to_list("u1", ListName::Watched, inception()).await.unwrap();
        lists.remove_from_list("u1", ListName::Watched, 7).await.unwrap();
        assert_eq!(lists.get_list("u1", ListName::Watched).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn lists_are_independent() {
        let (lists, _) = service();
        lists.add_to_list("u1", ListName::Favorites, inception()).await.unwrap();
        assert!(lists.get_list("u1", ListName::Watchlist).await.unwrap().is_empty());

        lists.add_to_list("u1", ListName::Watchlist, inception()).await.unwrap();
        lists.remove_from_list("u1", ListName::Watchlist, 42).await.unwrap();
        assert_eq!(lists.get_list("u1", ListName::Favorites).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn membership_follows_add_and_remove() {
        let (lists, _) = service();
        assert!(!lists.is_in_list("u1", ListName::Watchlist, 42).await.unwrap());

        lists.add_to_list("u1", ListName::Watchlist, inception()).await.unwrap();
        assert!(lists.is_in_list("u1", ListName::Watchlist, 42).await.unwrap());
        assert!(!lists.is_in_list("u1", ListName::Favorites, 42).await.unwrap());

        lists.remove_from_list("u1", ListName::Watchlist, 42).await.unwrap();
        assert!(!lists.is_in_list("u1", ListName::Watchlist, 42).await.unwrap());
    }

    #[tokio::test]
    async fn membership_query_does_not_create_documents() {
        let (lists, store) = service();
        assert!(!lists.is_in_list("u1", ListName::Watchlist, 42).await.unwrap());
        assert!(!lists.is_in_list("", ListName::Watchlist, 42).await.unwrap());
        assert!(store.get("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn move_restamps_added_at() {
        let (lists, _) = service();
        lists.add_to_list("u1", ListName::Watchlist, inception()).await.unwrap();

        let added_at = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let original = SavedMedia::stamp(inception(), added_at);
        lists
            .move_to_list("u1", ListName::Watchlist, ListName::Watched, original.clone())
            .await
            .unwrap();

        let all = lists.get_lists("u1").await.unwrap();
        assert!(all.watchlist.is_empty());
        assert_eq!(all.watched.len(), 1);
        assert_eq!(all.watched[0].id, 42);
        assert_ne!(all.watched[0].added_at, original.added_at);
    }

    #[tokio::test]
    async fn duplicate_check_ignores_media_type() {
        let (lists, _) = service();
        let mut show = inception();
        show.media_type = MediaType::Tv;
        show.title = "Some Show".to_string();

        lists.add_to_list("u1", ListName::Watchlist, inception()).await.unwrap();
        lists.add_to_list("u1", ListName::Watchlist, show).await.unwrap();

        let watchlist = lists.get_list("u1", ListName::Watchlist).await.unwrap();
        assert_eq!(watchlist.len(), 1);
        assert_eq!(watchlist[0].media_type, MediaType::Movie);
    }

    #[tokio::test]
    async fn toggle_flips_membership() {
        let (lists, _) = service();
        assert!(lists.toggle_in_list("u1", ListName::Favorites, inception()).await.unwrap());
        assert!(lists.is_in_list("u1", ListName::Favorites, 42).await.unwrap());
        assert!(!lists.toggle_in_list("u1", ListName::Favorites, inception()).await.unwrap());
        assert!(!lists.is_in_list("u1", ListName::Favorites, 42).await.unwrap());
    }

    #[tokio::test]
    async fn stats_count_each_list() {
        let (lists, store) = service();
        assert_eq!(lists.stats("u1").await.unwrap(), ListStats::default());

        lists.add_to_list("u1", ListName::Watchlist, inception()).await.unwrap();
        lists.add_to_list("u1", ListName::Favorites, inception()).await.unwrap();
        store
            .array_union("u1", WATCH_HISTORY_FIELD, json!({ "id": "42-1" }))
            .await
            .unwrap();

        let stats = lists.stats("u1").await.unwrap();
        assert_eq!(stats.watchlist_count, 1);
        assert_eq!(stats.favorites_count, 1);
        assert_eq!(stats.watched_count, 0);
        assert_eq!(stats.watch_history_count, 1);
    }

    #[tokio::test]
    async fn racing_copies_of_one_id_can_coexist() {
        let (lists, store) = service();
        lists.get_lists("u1").await.unwrap();
        let stored = json!({
            "id": 42, "title": "Inception", "media_type": "movie",
            "addedAt": "2024-01-01T00:00:00Z"
        });
        store.array_union("u1", "watchlist", stored).await.unwrap();

        // Another session re-saves the same id with different denormalized fields.
        let refreshed = json!({
            "id": 42, "title": "Inception (2010)", "media_type": "movie",
            "addedAt": "2024-01-02T00:00:00Z"
        });
        store.array_union("u1", "watchlist", refreshed).await.unwrap();

        assert_eq!(lists.get_list("u1", ListName::Watchlist).await.unwrap().len(), 2);

        // Remove takes out the first stored match only.
        lists.remove_from_list("u1", ListName::Watchlist, 42).await.unwrap();
        let left = lists.get_list("u1", ListName::Watchlist).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].title, "Inception (2010)");
    }

    /// Store whose unions fail for one field, to interrupt a move halfway.
    struct FailingUnion {
        inner: MemoryDocumentStore,
        field: &'static str,
    }

    #[async_trait]
    impl DocumentStore for FailingUnion {
        async fn get(&self, user_id: &str) -> PortResult<Option<UserDocument>> {
            self.inner.get(user_id).await
        }
        async fn set(&self, user_id: &str, document: UserDocument) -> PortResult<()> {
            self.inner.set(user_id, document).await
        }
        async fn array_union(&self, user_id: &str, field: &str, value: Value) -> PortResult<()> {
            if field == self.field {
                return Err(PortError::Unexpected("network unreachable".to_string()));
            }
            self.inner.array_union(user_id, field, value).await
        }
        async fn array_remove(&self, user_id: &str, field: &str, value: Value) -> PortResult<()> {
            self.inner.array_remove(user_id, field, value).await
        }
        async fn watch(&self, user_id: &str) -> PortResult<SnapshotStream> {
            self.inner.watch(user_id).await
        }
    }

    #[tokio::test]
    async fn interrupted_move_reports_partial_failure() {
        let store = Arc::new(FailingUnion {
            inner: MemoryDocumentStore::new(),
            field: "watched",
        });
        let lists = ListService::new(store);
        lists.add_to_list("u1", ListName::Watchlist, inception()).await.unwrap();

        let err = lists
            .move_to_list("u1", ListName::Watchlist, ListName::Watched, inception())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PortError::PartialMove { from: ListName::Watchlist, to: ListName::Watched, .. }
        ));
        let all = lists.get_lists("u1").await.unwrap();
        assert!(all.watchlist.is_empty());
        assert!(all.watched.is_empty());
    }

    #[tokio::test]
    async fn failed_move_of_an_absent_item_keeps_the_store_error() {
        let store = Arc::new(FailingUnion {
            inner: MemoryDocumentStore::new(),
            field: "watched",
        });
        let lists = ListService::new(store);
        lists.get_lists("u1").await.unwrap();

        let err = lists
            .move_to_list("u1", ListName::Watchlist, ListName::Watched, inception())
            .await
            .unwrap_err();

        assert!(matches!(err, PortError::Unexpected(_)));
        let all = lists.get_lists("u1").await.unwrap();
        assert!(all.watchlist.is_empty());
        assert!(all.watched.is_empty());
    }

    #[tokio::test]
    async fn read_lists_does_not_create_documents() {
        let (lists, store) = service();
        assert_eq!(lists.read_lists("u1").await.unwrap(), UserLists::default());
        assert!(store.get("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn add_propagates_store_errors() {
        let store = Arc::new(FailingUnion {
            inner: MemoryDocumentStore::new(),
            field: "favorites",
        });
        let lists = ListService::new(store);
        let err = lists
            .add_to_list("u1", ListName::Favorites, inception())
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Unexpected(_)));
    }

    #[tokio::test]
    async fn subscribers_see_current_state_then_changes() {
        let (lists, _) = service();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let subscription = lists
            .subscribe("u1", move |update| {
                let _ = tx.send(update.map(|all| all.watchlist.len()));
            })
            .await
            .unwrap();

        assert_eq!(rx.recv().await.unwrap().unwrap(), 0);

        lists.add_to_list("u1", ListName::Watchlist, inception()).await.unwrap();
        // The initializing write arrives first, then the add.
        assert_eq!(rx.recv().await.unwrap().unwrap(), 0);
        assert_eq!(rx.recv().await.unwrap().unwrap(), 1);

        assert!(subscription.is_active());
        subscription.unsubscribe();
    }

    #[tokio::test]
    async fn unsubscribed_callbacks_stop_firing() {
        let (lists, _) = service();
        lists.get_lists("u1").await.unwrap();
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        let subscription = lists
            .subscribe("u1", move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        subscription.unsubscribe();
        tokio::time::sleep(Duration::from_millis(20)).await;
        lists.add_to_list("u1", ListName::Watchlist, inception()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn find_stored_returns_the_raw_record() {
        let document = json!({ "watched": [{ "id": 1, "extra": "kept" }] });
        let document = document.as_object().unwrap().clone();
        let found = find_stored(&document, ListName::Watched, 1).unwrap();
        assert_eq!(found["extra"], json!("kept"));
        assert!(find_stored(&document, ListName::Watchlist, 1).is_none());
    }
}
