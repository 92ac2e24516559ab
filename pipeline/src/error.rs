//! Error types for the intake pipeline.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that end a run or stop the pipeline from starting.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Staging or relocation failed.
    #[error("staging error: {0}")]
    Staging(#[from] intake_staging::StagingError),

    /// Directory watcher error.
    #[error("watcher error: {0}")]
    Watcher(#[from] intake_directory_watcher::WatcherError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The file is already being processed by another run.
    #[error("run already in flight for: {0}")]
    AlreadyInFlight(String),

    /// Background task ended abnormally.
    #[error("dispatcher task failed: {0}")]
    Task(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Whether the run was rejected for missing parameters.
    pub fn is_invalid_parameters(&self) -> bool {
        matches!(self, Self::Staging(e) if e.is_invalid_parameters())
    }
}

/// Errors raised by a processor. These select the failed outcome for a run
/// and are never fatal to the pipeline.
#[derive(Error, Debug)]
pub enum ProcessorError {
    /// Input content could not be interpreted.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Reading input or writing output failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The processor did not finish in time.
    #[error("processor timed out after {0:?}")]
    Timeout(Duration),

    /// Any other processing failure.
    #[error("processing failed: {0}")]
    Failed(String),
}
