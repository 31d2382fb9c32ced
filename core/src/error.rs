//! Error types for the batch query cache.

use crate::types::ParentId;
use thiserror::Error;

/// Errors surfaced by the cache, its stores and its configuration.
///
/// A failed query is always reported as an error; it is never folded into an
/// empty result, so callers can tell "no tickets" from "could not load".
#[derive(Error, Debug)]
pub enum BatchQueryError {
    /// The ticket or attendee store failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// The ticket-count provider failed for one parent.
    #[error("Ticket count provider failed for parent {parent_id}: {message}")]
    CountProvider {
        /// Parent whose counts could not be computed.
        parent_id: ParentId,
        /// Provider-supplied description.
        message: String,
    },

    /// Configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for batch query operations.
pub type Result<T> = std::result::Result<T, BatchQueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_provider_error_display_names_parent() {
        let error = BatchQueryError::CountProvider {
            parent_id: ParentId::new(42),
            message: "timeout".to_string(),
        };

        let display = format!("{error}");
        assert!(display.contains("parent 42"));
        assert!(display.contains("timeout"));
    }

    #[test]
    fn storage_error_display() {
        let error = BatchQueryError::Storage("connection refused".to_string());
        assert_eq!(format!("{error}"), "Storage error: connection refused");
    }
}
