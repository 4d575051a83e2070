//! Error types for task store operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the task store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Task description cannot be empty")]
    Validation,

    #[error("Task with ID {0} not found")]
    NotFound(u64),

    #[error("No task IDs left to assign")]
    IdsExhausted,

    #[error("Failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed JSON in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The file parsed but its contents break a store invariant.
    #[error("Invalid task data in {}: {reason}", .path.display())]
    Schema { path: PathBuf, reason: String },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for failures of the backing file rather than of the request.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            StoreError::Io { .. } | StoreError::Json { .. } | StoreError::Schema { .. }
        )
    }
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;
