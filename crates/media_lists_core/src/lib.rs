pub mod assistant;
pub mod chat_history;
pub mod domain;
pub mod history;
pub mod lists;
pub mod memory;
pub mod ports;
pub mod snapshots;

pub use assistant::{AssistantReply, AssistantService};
pub use chat_history::ChatHistoryService;
pub use domain::{
    ChatMessage, ChatRole, EpisodeRef, ListName, ListStats, MediaType, NewSavedMedia,
    NewWatchHistoryEntry, SavedMedia, StoredChatMessage, UserLists, WatchHistoryEntry,
};
pub use history::WatchHistoryService;
pub use lists::{ListService, Subscription};
pub use memory::MemoryDocumentStore;
pub use ports::{
    CompletionService, DocumentStore, PortError, PortResult, SnapshotStream, UserDocument,
};
pub use snapshots::SnapshotHub;
