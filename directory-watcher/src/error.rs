//! Error types for the directory watcher.

use thiserror::Error;

use crate::watcher::WatcherState;

/// Result type alias for watcher operations.
pub type Result<T> = std::result::Result<T, WatcherError>;

/// Errors that can occur in the directory watcher.
#[derive(Error, Debug)]
pub enum WatcherError {
    /// Directory not found.
    #[error("directory not found: {0}")]
    DirectoryNotFound(String),

    /// Path exists but is not a directory.
    #[error("path is not a directory: {0}")]
    NotADirectory(String),

    /// Operation not allowed in the current state.
    #[error("cannot {operation} while watcher is {state:?}")]
    InvalidState {
        operation: &'static str,
        state: WatcherState,
    },

    /// Notify error.
    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),

    /// Directory walk error.
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}
