//! The transformation step of a run.

use async_trait::async_trait;
use intake_staging::RunParameters;

use crate::error::ProcessorError;

/// Trait for record processors.
///
/// A processor receives the staged input content and returns the content to
/// write to the run's output path. Any error turns the run into a failed one.
#[async_trait]
pub trait Processor: Send + Sync {
    /// Get the name of this processor.
    fn name(&self) -> &str;

    /// Transform `input` for the run described by `params`.
    async fn process(
        &self,
        input: &[u8],
        params: &RunParameters,
    ) -> std::result::Result<Vec<u8>, ProcessorError>;
}
