//! crates/media_lists_core/src/domain.rs
//!
//! Defines the core data structures for the application.
//! Saved records are denormalized snapshots of catalog entries: the descriptive
//! fields are copied at save time and never refreshed from the metadata provider.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ports::{PortError, PortResult, UserDocument};

/// Catalog namespace of a saved item. Ids are only unique within one namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Tv,
}

/// One of the five named collections owned by a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub enum ListName {
    Watchlist,
    Favorites,
    Watched,
    WantToWatch,
    RecentlyViewed,
}

impl ListName {
    pub const ALL: [ListName; 5] = [
        ListName::Watchlist,
        ListName::Favorites,
        ListName::Watched,
        ListName::WantToWatch,
        ListName::RecentlyViewed,
    ];

    /// The document field this list is stored under.
    pub fn field(&self) -> &'static str {
        match self {
            ListName::Watchlist => "watchlist",
            ListName::Favorites => "favorites",
            ListName::Watched => "watched",
            ListName::WantToWatch => "wantToWatch",
            ListName::RecentlyViewed => "recentlyViewed",
        }
    }
}

impl fmt::Display for ListName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field())
    }
}

impl FromStr for ListName {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ListName::ALL
            .into_iter()
            .find(|list| list.field() == s)
            .ok_or_else(|| PortError::InvalidInput(format!("Unknown list '{}'", s)))
    }
}

/// A media record as supplied by a caller, before the module stamps `addedAt`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NewSavedMedia {
    pub id: i64,
    pub title: String,
    pub media_type: MediaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backdrop_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote_average: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_air_date: Option<String>,
}

impl NewSavedMedia {
    /// Checks the record before it is written.
    ///
    /// Movies carry `release_date`, TV shows carry `first_air_date`, never the other.
    pub fn validate(&self) -> PortResult<()> {
        if self.id <= 0 {
            return Err(PortError::InvalidInput(format!(
                "Media id must be positive, got {}",
                self.id
            )));
        }
        if self.title.trim().is_empty() {
            return Err(PortError::InvalidInput("Media title is required".to_string()));
        }
        match self.media_type {
            MediaType::Movie if self.first_air_date.is_some() => Err(PortError::InvalidInput(
                "A movie cannot carry first_air_date".to_string(),
            )),
            MediaType::Tv if self.release_date.is_some() => Err(PortError::InvalidInput(
                "A TV show cannot carry release_date".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Release year from whichever date field applies to the media type.
    pub fn year(&self) -> Option<&str> {
        self.release_date
            .as_deref()
            .or(self.first_air_date.as_deref())
            .and_then(|date| date.get(..4))
    }
}

/// A snapshot of a catalog entry saved into one of a user's lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SavedMedia {
    pub id: i64,
    pub title: String,
    pub media_type: MediaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backdrop_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote_average: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_air_date: Option<String>,
    #[serde(rename = "addedAt")]
    pub added_at: DateTime<Utc>,
}

impl SavedMedia {
    /// Starts a new list membership for `media` at time `at`.
    pub fn stamp(media: NewSavedMedia, at: DateTime<Utc>) -> Self {
        Self {
            id: media.id,
            title: media.title,
            media_type: media.media_type,
            poster_path: media.poster_path,
            backdrop_path: media.backdrop_path,
            overview: media.overview,
            vote_average: media.vote_average,
            release_date: media.release_date,
            first_air_date: media.first_air_date,
            added_at: at,
        }
    }
}

impl From<SavedMedia> for NewSavedMedia {
    fn from(saved: SavedMedia) -> Self {
        Self {
            id: saved.id,
            title: saved.title,
            media_type: saved.media_type,
            poster_path: saved.poster_path,
            backdrop_path: saved.backdrop_path,
            overview: saved.overview,
            vote_average: saved.vote_average,
            release_date: saved.release_date,
            first_air_date: saved.first_air_date,
        }
    }
}

/// The set of named lists owned by one user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct UserLists {
    pub watchlist: Vec<SavedMedia>,
    pub favorites: Vec<SavedMedia>,
    pub watched: Vec<SavedMedia>,
    pub want_to_watch: Vec<SavedMedia>,
    pub recently_viewed: Vec<SavedMedia>,
}

impl UserLists {
    /// Reads the lists out of a raw user document.
    ///
    /// Missing lists decode as empty; unrelated fields such as `watchHistory` are ignored.
    pub fn from_document(document: &UserDocument) -> PortResult<Self> {
        serde_json::from_value(serde_json::Value::Object(document.clone())).map_err(|e| {
            PortError::Unexpected(format!("User document has malformed lists: {}", e))
        })
    }

    /// The default document written on first access: every list present and empty.
    pub fn empty_document() -> UserDocument {
        ListName::ALL
            .into_iter()
            .map(|list| (list.field().to_string(), serde_json::Value::Array(Vec::new())))
            .collect()
    }

    pub fn list(&self, name: ListName) -> &[SavedMedia] {
        match name {
            ListName::Watchlist => &self.watchlist,
            ListName::Favorites => &self.favorites,
            ListName::Watched => &self.watched,
            ListName::WantToWatch => &self.want_to_watch,
            ListName::RecentlyViewed => &self.recently_viewed,
        }
    }

    pub fn into_list(self, name: ListName) -> Vec<SavedMedia> {
        match name {
            ListName::Watchlist => self.watchlist,
            ListName::Favorites => self.favorites,
            ListName::Watched => self.watched,
            ListName::WantToWatch => self.want_to_watch,
            ListName::RecentlyViewed => self.recently_viewed,
        }
    }
}

/// Item counts shown on the profile page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ListStats {
    pub watchlist_count: usize,
    pub favorites_count: usize,
    pub watched_count: usize,
    pub want_to_watch_count: usize,
    pub recently_viewed_count: usize,
    pub watch_history_count: usize,
}

// Season/episode marker for a TV history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct EpisodeRef {
    pub season: u32,
    pub episode: u32,
    pub name: String,
}

/// Playback progress reported by a client, before id and timestamp are assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NewWatchHistoryEntry {
    #[serde(rename = "movieId")]
    pub movie_id: i64,
    pub title: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    pub progress: f64,
    pub duration: f64,
    pub media_type: MediaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode: Option<EpisodeRef>,
}

/// One stored playback record in the user's `watchHistory` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct WatchHistoryEntry {
    pub id: String,
    #[serde(rename = "movieId")]
    pub movie_id: i64,
    pub title: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    pub progress: f64,
    pub duration: f64,
    pub media_type: MediaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode: Option<EpisodeRef>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single turn in a conversation with the assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// A conversation turn kept in the user's `chatHistory` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct StoredChatMessage {
    pub id: String,
    pub role: ChatRole,
    pub content: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}
