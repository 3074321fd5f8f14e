//! services/api/src/error.rs
//!
//! Defines the primary error type for the API service and the mapping from
//! core port errors to HTTP responses.

use crate::config::ConfigError;
use axum::http::StatusCode;
use media_lists_core::ports::PortError;
use tracing::error;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a failure while applying the embedded migrations.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// Logs a failed operation and converts the port error into a handler rejection.
pub fn reject(action: &str, e: PortError) -> (StatusCode, String) {
    let status = match &e {
        PortError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        PortError::Unauthorized => StatusCode::UNAUTHORIZED,
        PortError::NotFound(_) => StatusCode::NOT_FOUND,
        PortError::PartialMove { .. } => StatusCode::CONFLICT,
        PortError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        error!("Failed to {}: {:?}", action, e);
        (status, format!("Failed to {}", action))
    } else {
        error!("Rejected request to {}: {}", action, e);
        (status, e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use media_lists_core::ListName;

    #[test]
    fn client_errors_keep_their_message() {
        let (status, body) = reject("add to list", PortError::InvalidInput("bad id".to_string()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("bad id"));
    }

    #[test]
    fn server_errors_hide_details() {
        let (status, body) =
            reject("add to list", PortError::Unexpected("pool timed out".to_string()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "Failed to add to list");
    }

    #[test]
    fn partial_moves_are_conflicts() {
        let err = PortError::PartialMove {
            from: ListName::Watchlist,
            to: ListName::Watched,
            reason: "offline".to_string(),
        };
        let (status, body) = reject("move item", err);
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body.contains("watchlist"));
    }
}
