//! # Staging
//!
//! File relocation and run lifecycle hooks for the intake pipeline.
//!
//! ```text
//! upload/ ──before_run──► input/ ──processor──► output/
//!                            │
//!                            ├──after_run(Completed)──► deleted
//!                            └──after_run(Failed)─────► error/
//! ```

pub mod error;
pub mod lifecycle;
pub mod mover;
pub mod params;

pub use error::{FileOperation, Result, StagingError};
pub use lifecycle::{RunLifecycle, RunLifecycleController};
pub use mover::StagingMover;
pub use params::{
    ANONYMIZE, ERROR_PATH, INPUT_PATH, OUTPUT_PATH, RunOutcome, RunParameters, UPLOAD_PATH,
};
