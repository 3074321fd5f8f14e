//! crates/media_lists_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the concrete document database and completion API.

use async_trait::async_trait;
use futures::Stream;
use serde_json::{Map, Value};
use std::pin::Pin;

use crate::domain::{ChatMessage, ListName};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    /// The item left `from` but could not be added to `to`; it is in neither list.
    #[error("Item was removed from {from} but could not be added to {to}: {reason}")]
    PartialMove {
        from: ListName,
        to: ListName,
        reason: String,
    },
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Document Store Types
//=========================================================================================

/// The raw per-user document, addressed by `users/{uid}`.
pub type UserDocument = Map<String, Value>;

/// Push stream of whole-document snapshots, one per committed write.
pub type SnapshotStream = Pin<Box<dyn Stream<Item = PortResult<UserDocument>> + Send>>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Per-user document database with field-level atomic array primitives.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Reads the document, or `None` when the user has no document yet.
    async fn get(&self, user_id: &str) -> PortResult<Option<UserDocument>>;

    /// Overwrites the whole document.
    async fn set(&self, user_id: &str, document: UserDocument) -> PortResult<()>;

    /// Appends `value` to the array in `field` unless an equal value is already there.
    ///
    /// Equality is full JSON value equality. Fails with `NotFound` if the document is absent.
    async fn array_union(&self, user_id: &str, field: &str, value: Value) -> PortResult<()>;

    /// Removes every element of the array in `field` equal to `value`.
    ///
    /// Fails with `NotFound` if the document is absent.
    async fn array_remove(&self, user_id: &str, field: &str, value: Value) -> PortResult<()>;

    /// Subscribes to the document. The stream yields the document after each write.
    async fn watch(&self, user_id: &str) -> PortResult<SnapshotStream>;
}

/// An opaque text-completion service backing the assistant chat.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Produces the assistant's next message for the conversation so far.
    async fn complete(&self, system_prompt: &str, messages: &[ChatMessage]) -> PortResult<String>;
}
