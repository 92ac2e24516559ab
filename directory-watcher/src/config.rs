//! Configuration types for directory watching.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WatcherError};

/// Default interval between polls of the watched directory.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Configuration for the watched upload directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Path to the directory. Only its direct children are considered.
    pub path: PathBuf,

    /// Eligible file extensions, without the leading dot.
    pub extensions: Vec<String>,

    /// How arrivals are detected.
    pub watch_mode: WatchMode,

    /// Interval between polls in [`WatchMode::Poll`].
    pub poll_interval: Duration,

    /// Capacity of the live event channel.
    pub channel_capacity: usize,
}

impl WatchConfig {
    /// Create a new watch config that accepts `.json` files.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            extensions: vec!["json".to_string()],
            watch_mode: WatchMode::Poll,
            poll_interval: DEFAULT_POLL_INTERVAL,
            channel_capacity: 1000,
        }
    }

    /// Replace the eligible extensions.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.into().trim_start_matches('.').to_string())
            .collect();
        self
    }

    /// Set the watch mode.
    pub fn with_mode(mut self, mode: WatchMode) -> Self {
        self.watch_mode = mode;
        self
    }

    /// Set the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Check the configuration before watching.
    pub fn validate(&self) -> Result<()> {
        if self.extensions.iter().all(|e| e.is_empty()) {
            return Err(WatcherError::Config(
                "at least one eligible extension is required".to_string(),
            ));
        }
        if self.watch_mode == WatchMode::Poll && self.poll_interval.is_zero() {
            return Err(WatcherError::Config(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        if self.channel_capacity == 0 {
            return Err(WatcherError::Config(
                "channel capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Check if a path has an eligible extension (case-insensitive).
    pub fn is_eligible(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }
}

/// How to detect new files in the watched directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchMode {
    /// Compare directory snapshots every poll interval. Works on any
    /// filesystem, including network mounts.
    #[default]
    Poll,

    /// Use the platform's native change notifications.
    Native,
}
