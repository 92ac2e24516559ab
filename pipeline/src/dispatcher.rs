//! Run orchestration.
//!
//! The dispatcher turns every eligible upload into one run:
//!
//! ```text
//! WatchedFile ──► RunParameters ──► before_run ──► Processor ──► after_run
//!                                       │                           │
//!                                  (abandoned)              Completed | Failed
//! ```
//!
//! On start the backlog is enumerated and the live listener attached. Live
//! arrivals queue until every backlog file has reached an outcome. A failing
//! run never stops the dispatcher.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::{Stream, StreamExt};
use intake_directory_watcher::{DirectoryWatcher, WatchedFile, WatcherState};
use intake_staging::{RunLifecycle, RunLifecycleController, RunOutcome, RunParameters};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::config::{Directories, PipelineConfig};
use crate::error::{PipelineError, ProcessorError, Result};
use crate::processor::Processor;

/// Drives runs for files discovered in the upload directory.
pub struct Dispatcher {
    config: PipelineConfig,
    directories: Directories,
    lifecycle: Arc<dyn RunLifecycle>,
    processor: Arc<dyn Processor>,

    /// Upload paths with a run in progress.
    in_flight: Mutex<HashSet<PathBuf>>,

    counters: RunCounters,
}

impl Dispatcher {
    /// Create a dispatcher that relocates files with [`RunLifecycleController`].
    pub fn new(config: PipelineConfig, processor: Arc<dyn Processor>) -> Result<Self> {
        config.validate()?;
        let directories = config.directories();

        Ok(Self {
            config,
            directories,
            lifecycle: Arc::new(RunLifecycleController::new()),
            processor,
            in_flight: Mutex::new(HashSet::new()),
            counters: RunCounters::default(),
        })
    }

    /// Replace the lifecycle hooks.
    pub fn with_lifecycle(mut self, lifecycle: Arc<dyn RunLifecycle>) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn directories(&self) -> &Directories {
        &self.directories
    }

    /// Snapshot of run counters.
    pub fn stats(&self) -> DispatcherStats {
        self.counters.snapshot()
    }

    /// Parameters for a run of the file at `upload`.
    ///
    /// The input, output and error paths keep the upload's file name. A path
    /// without a file name yields parameters that fail validation.
    pub fn run_parameters(&self, upload: &Path) -> RunParameters {
        let params = RunParameters::new()
            .with_upload_path(upload)
            .with_anonymize(self.config.anonymize);

        match upload.file_name() {
            Some(name) => params
                .with_input_path(self.directories.input.join(name))
                .with_output_path(self.directories.output.join(name))
                .with_error_path(self.directories.error.join(name)),
            None => params,
        }
    }

    /// Drain the backlog, then watch for new uploads in the background.
    ///
    /// Returns once every backlog file has reached an outcome and the live
    /// listener is attached.
    pub async fn start(self: Arc<Self>) -> Result<DispatcherHandle> {
        let watcher = DirectoryWatcher::new(self.config.watch_config())?;

        let backlog = watcher.drain_backlog()?;
        // Attach before running the backlog so uploads arriving meanwhile are
        // queued in the subscription rather than lost.
        let subscription = watcher.subscribe()?;

        info!("Draining backlog of {} files", backlog.len());
        self.run_all(futures::stream::iter(backlog)).await;

        let token = CancellationToken::new();

        let dispatcher = self.clone();
        let cancelled = token.clone().cancelled_owned();
        let task = tokio::spawn(async move {
            dispatcher.run_all(subscription.take_until(cancelled)).await;
            debug!("Live dispatch loop finished");
        });

        info!(
            "Dispatcher ready, watching {}",
            self.directories.upload.display()
        );

        Ok(DispatcherHandle {
            token,
            task,
            watcher,
        })
    }

    /// Run every file from `files`, up to the configured number at once.
    async fn run_all<S>(&self, files: S)
    where
        S: Stream<Item = WatchedFile>,
    {
        files
            .for_each_concurrent(self.config.max_concurrent_runs, |file| async move {
                // Errors are logged inside the run.
                let _ = self.submit(file).await;
            })
            .await;
    }

    /// Run a single file through the full lifecycle.
    ///
    /// A processor failure is reported as [`RunOutcome::Failed`], not as an
    /// error. Errors mean the run was rejected, abandoned before processing,
    /// or its input could not be relocated afterwards.
    pub async fn submit(&self, file: WatchedFile) -> Result<RunOutcome> {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", %run_id, file = %file.path.display());

        async move {
            let upload = file.path;
            if !self.in_flight.lock().await.insert(upload.clone()) {
                warn!("Run already in flight, skipping submission");
                return Err(PipelineError::AlreadyInFlight(upload.display().to_string()));
            }

            let result = self.execute(&upload).await;
            self.in_flight.lock().await.remove(&upload);

            if let Err(e) = &result {
                error!("Run error: {e}");
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn execute(&self, upload: &Path) -> Result<RunOutcome> {
        let params = self.run_parameters(upload);

        let staged = match params.validate() {
            Ok(()) => self.lifecycle.before_run(&params).await,
            Err(e) => Err(e),
        };
        if let Err(e) = staged {
            self.counters.abandoned.fetch_add(1, Ordering::Relaxed);
            return Err(e.into());
        }

        let outcome = match self.process(&params).await {
            Ok(()) => RunOutcome::Completed,
            Err(e) => {
                warn!(processor = self.processor.name(), "Processing failed: {e}");
                RunOutcome::Failed
            }
        };
        self.counters.record(outcome);

        self.lifecycle.after_run(&params, outcome).await?;
        info!(?outcome, "Run finished");
        Ok(outcome)
    }

    async fn process(&self, params: &RunParameters) -> std::result::Result<(), ProcessorError> {
        let (Some(input), Some(output)) = (&params.input_path, &params.output_path) else {
            return Err(ProcessorError::InvalidInput(
                "run parameters lack input or output path".to_string(),
            ));
        };

        let content = tokio::fs::read(input).await?;
        let run = self.processor.process(&content, params);
        let transformed = match self.config.processor_timeout() {
            Some(limit) => tokio::time::timeout(limit, run)
                .await
                .map_err(|_| ProcessorError::Timeout(limit))??,
            None => run.await?,
        };

        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(output, transformed).await?;
        debug!("Wrote output to {}", output.display());
        Ok(())
    }
}

/// Handle to a started dispatcher.
pub struct DispatcherHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
    watcher: DirectoryWatcher,
}

impl DispatcherHandle {
    /// State of the underlying directory watcher.
    pub fn watcher_state(&self) -> WatcherState {
        self.watcher.state()
    }

    /// Stop accepting new uploads and wait for in-flight runs to finish.
    pub async fn shutdown(self) -> Result<()> {
        self.token.cancel();
        self.task
            .await
            .map_err(|e| PipelineError::Task(e.to_string()))?;
        info!("Dispatcher stopped");
        Ok(())
    }
}

#[derive(Debug, Default)]
struct RunCounters {
    completed: AtomicUsize,
    failed: AtomicUsize,
    abandoned: AtomicUsize,
}

impl RunCounters {
    fn record(&self, outcome: RunOutcome) {
        let counter = match outcome {
            RunOutcome::Completed => &self.completed,
            RunOutcome::Failed => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> DispatcherStats {
        DispatcherStats {
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            abandoned: self.abandoned.load(Ordering::Relaxed),
        }
    }
}

/// Statistics about dispatched runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatcherStats {
    /// Runs whose processor succeeded.
    pub completed: usize,

    /// Runs whose processor failed.
    pub failed: usize,

    /// Runs rejected or abandoned before processing.
    pub abandoned: usize,
}

impl DispatcherStats {
    /// Runs that reached an outcome.
    pub fn finished(&self) -> usize {
        self.completed + self.failed
    }
}
