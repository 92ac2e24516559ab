//! # Directory Watcher
//!
//! This crate discovers files dropped into the intake upload directory.
//!
//! ## Features
//!
//! - **Backlog Drain**: Files present at startup are listed once, in name order
//! - **Live Watching**: Newly arriving files are streamed as they appear
//! - **Eligibility Filter**: Only configured extensions are reported
//! - **Portable Polling**: Poll mode works on filesystems without native events
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Directory Watcher                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  WatchConfig ──► DirectoryWatcher ──► WatchedFile              │
//! │       │                │                   ▲                    │
//! │       ▼                ▼                   │                    │
//! │  is_eligible     BacklogScanner ───────────┤                    │
//! │                  WatchSubscription ────────┘                    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod scanner;
pub mod watcher;

pub use config::{DEFAULT_POLL_INTERVAL, WatchConfig, WatchMode};
pub use error::{Result, WatcherError};
pub use event::{DiscoverySource, FileEventKind, WatchedFile};
pub use scanner::BacklogScanner;
pub use watcher::{DirectoryWatcher, WatchSubscription, WatcherState};
