//! # Intake Pipeline
//!
//! Watches an upload directory and runs every eligible file through a
//! processor, routing it by outcome:
//!
//! - **Upload**: files are dropped into the upload directory
//! - **Staging**: each file is moved into the input directory before processing
//! - **Processing**: a [`Processor`] transforms the staged content
//! - **Routing**: completed inputs are removed, failed inputs go to the error
//!   directory
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use intake_pipeline::{Dispatcher, PersonAnonymizer, PipelineConfig};
//!
//! let config = PipelineConfig::new("/srv/intake").with_anonymize(true);
//! config.ensure_directories().await?;
//!
//! let dispatcher = Arc::new(Dispatcher::new(config, Arc::new(PersonAnonymizer::new()))?);
//! let handle = dispatcher.clone().start().await?;
//! // ...
//! handle.shutdown().await?;
//! ```

pub mod anonymizer;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod processor;

pub use anonymizer::{Person, PersonAnonymizer};
pub use config::{Directories, PipelineConfig};
pub use dispatcher::{Dispatcher, DispatcherHandle, DispatcherStats};
pub use error::{PipelineError, ProcessorError, Result};
pub use processor::Processor;

// Re-export from dependencies for convenience
pub use intake_directory_watcher::{DiscoverySource, WatchMode, WatchedFile, WatcherState};
pub use intake_staging::{RunLifecycle, RunLifecycleController, RunOutcome, RunParameters};
