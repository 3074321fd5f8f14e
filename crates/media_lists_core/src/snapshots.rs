//! crates/media_lists_core/src/snapshots.rs
//!
//! In-process fan-out of document snapshots.
//!
//! Store implementations publish the committed document after every write; each
//! watcher of a user gets its own `tokio::sync::broadcast` receiver. Slow watchers
//! skip intermediate snapshots instead of blocking writers, which is harmless because
//! every snapshot carries the whole document.

use futures::stream;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use crate::ports::{SnapshotStream, UserDocument};

/// Default per-user buffer of pending snapshots.
pub const DEFAULT_SNAPSHOT_BUFFER: usize = 16;

/// Registry of per-user broadcast channels.
pub struct SnapshotHub {
    capacity: usize,
    channels: Mutex<HashMap<String, broadcast::Sender<UserDocument>>>,
}

impl Default for SnapshotHub {
    fn default() -> Self {
        Self::new(DEFAULT_SNAPSHOT_BUFFER)
    }
}

impl SnapshotHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            channels: Mutex::new(HashMap::new()),
        }
    }

    /// Delivers `document` to every current watcher of `user_id`.
    pub fn publish(&self, user_id: &str, document: &UserDocument) {
        let mut channels = match self.channels.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(sender) = channels.get(user_id) {
            if sender.send(document.clone()).is_err() {
                // Last receiver is gone.
                channels.remove(user_id);
                debug!(user_id, "Dropped snapshot channel with no watchers");
            }
        }
    }

    /// Opens a stream of future snapshots for `user_id`.
    pub fn watch(&self, user_id: &str) -> SnapshotStream {
        let receiver = {
            let mut channels = match self.channels.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            channels
                .entry(user_id.to_string())
                .or_insert_with(|| broadcast::channel(self.capacity).0)
                .subscribe()
        };

        let user_id = user_id.to_string();
        Box::pin(stream::unfold(
            (receiver, user_id),
            |(mut receiver, user_id)| async move {
                loop {
                    match receiver.recv().await {
                        Ok(document) => return Some((Ok(document), (receiver, user_id))),
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(%user_id, skipped, "Snapshot watcher lagged behind");
                        }
                        Err(RecvError::Closed) => return None,
                    }
                }
            },
        ))
    }

    /// Number of users with at least one open channel.
    pub fn watched_users(&self) -> usize {
        match self.channels.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}
