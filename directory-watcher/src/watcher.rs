//! Directory watcher implementation.
//!
//! The watcher moves through three states:
//!
//! ```text
//! Idle ──drain_backlog──► DrainingBacklog ──subscribe──► Watching
//!   ▲                                                       │
//!   └──────────────── subscription dropped ─────────────────┘
//! ```
//!
//! Files that arrive after the backlog scan but before the live listener is
//! attached are not reported by either phase.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use notify::{PollWatcher, RecursiveMode, Watcher};
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info};

use crate::config::{WatchConfig, WatchMode};
use crate::error::{Result, WatcherError};
use crate::event::{DiscoverySource, FileEventKind, WatchedFile};
use crate::scanner::BacklogScanner;

/// Lifecycle state of a [`DirectoryWatcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    /// Not started, or the last subscription was dropped.
    Idle,

    /// Backlog has been enumerated and is being handed out.
    DrainingBacklog,

    /// Live listener attached.
    Watching,
}

/// Watches a single upload directory for eligible files.
pub struct DirectoryWatcher {
    config: WatchConfig,
    state: Arc<watch::Sender<WatcherState>>,
}

impl DirectoryWatcher {
    /// Create a watcher for an existing directory.
    pub fn new(config: WatchConfig) -> Result<Self> {
        config.validate()?;

        let path = &config.path;
        if !path.exists() {
            return Err(WatcherError::DirectoryNotFound(path.display().to_string()));
        }
        if !path.is_dir() {
            return Err(WatcherError::NotADirectory(path.display().to_string()));
        }

        let (state, _) = watch::channel(WatcherState::Idle);
        Ok(Self {
            config,
            state: Arc::new(state),
        })
    }

    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    /// Current state.
    pub fn state(&self) -> WatcherState {
        *self.state.borrow()
    }

    /// Receiver that observes state transitions.
    pub fn state_changes(&self) -> watch::Receiver<WatcherState> {
        self.state.subscribe()
    }

    /// Enumerate eligible files already in the directory.
    ///
    /// Moves the watcher from `Idle` to `DrainingBacklog`. Files are returned
    /// in file name order.
    pub fn drain_backlog(&self) -> Result<Vec<WatchedFile>> {
        self.transition(
            "drain backlog",
            WatcherState::Idle,
            WatcherState::DrainingBacklog,
        )?;

        match BacklogScanner::new(&self.config).scan() {
            Ok(paths) => Ok(paths
                .into_iter()
                .map(|path| WatchedFile::new(path, DiscoverySource::Backlog))
                .collect()),
            Err(e) => {
                self.state.send_replace(WatcherState::Idle);
                Err(e)
            }
        }
    }

    /// Attach the live listener.
    ///
    /// Must be called after [`drain_backlog`](Self::drain_backlog). Every
    /// eligible file that appears afterwards is yielded once by the returned
    /// subscription. Dropping the subscription detaches the listener and
    /// returns the watcher to `Idle`.
    pub fn subscribe(&self) -> Result<WatchSubscription> {
        self.transition(
            "subscribe",
            WatcherState::DrainingBacklog,
            WatcherState::Watching,
        )?;

        match self.start_listener() {
            Ok(subscription) => Ok(subscription),
            Err(e) => {
                self.state.send_replace(WatcherState::DrainingBacklog);
                Err(e)
            }
        }
    }

    fn transition(
        &self,
        operation: &'static str,
        from: WatcherState,
        to: WatcherState,
    ) -> Result<()> {
        let mut result = Ok(());
        self.state.send_if_modified(|state| {
            if *state == from {
                *state = to;
                true
            } else {
                result = Err(WatcherError::InvalidState {
                    operation,
                    state: *state,
                });
                false
            }
        });
        if result.is_ok() {
            debug!("Watcher state {from:?} -> {to:?}");
        }
        result
    }

    fn start_listener(&self) -> Result<WatchSubscription> {
        let (event_tx, event_rx) = mpsc::channel(self.config.channel_capacity);
        let config = self.config.clone();

        let handler = move |res: std::result::Result<notify::Event, notify::Error>| match res {
            Ok(event) => {
                if !FileEventKind::from(event.kind).is_arrival() {
                    return;
                }

                for path in event.paths {
                    if !path.is_file() || !config.is_eligible(&path) {
                        debug!("Ignoring non-eligible arrival: {}", path.display());
                        continue;
                    }

                    let file = WatchedFile::new(path, DiscoverySource::Live);
                    if let Err(e) = event_tx.blocking_send(file) {
                        error!("Failed to send file event: {e}");
                    }
                }
            }
            Err(e) => {
                error!("Watch error: {e}");
            }
        };

        let mut watcher: Box<dyn Watcher + Send> = match self.config.watch_mode {
            WatchMode::Poll => Box::new(PollWatcher::new(
                handler,
                notify::Config::default().with_poll_interval(self.config.poll_interval),
            )?),
            WatchMode::Native => Box::new(notify::recommended_watcher(handler)?),
        };
        watcher.watch(&self.config.path, RecursiveMode::NonRecursive)?;

        info!(
            "Watching {} ({:?} mode)",
            self.config.path.display(),
            self.config.watch_mode
        );

        Ok(WatchSubscription {
            events: ReceiverStream::new(event_rx),
            _watcher: watcher,
            state: self.state.clone(),
        })
    }
}

/// Live stream of eligible files arriving in the watched directory.
pub struct WatchSubscription {
    events: ReceiverStream<WatchedFile>,

    /// Kept alive for as long as events should be delivered.
    _watcher: Box<dyn Watcher + Send>,

    state: Arc<watch::Sender<WatcherState>>,
}

impl WatchSubscription {
    /// Wait for the next arrival.
    pub async fn next_file(&mut self) -> Option<WatchedFile> {
        futures::StreamExt::next(self).await
    }

    /// Detach the listener.
    pub fn unsubscribe(self) {}
}

impl Stream for WatchSubscription {
    type Item = WatchedFile;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.events).poll_next(cx)
    }
}

impl Drop for WatchSubscription {
    fn drop(&mut self) {
        self.state.send_replace(WatcherState::Idle);
        info!("Directory watcher stopped");
    }
}
