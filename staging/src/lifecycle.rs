//! Pre- and post-run hooks.
//!
//! A run is bracketed by two calls that any scheduler makes directly:
//!
//! 1. [`RunLifecycle::before_run`] stages the uploaded file into the input
//!    directory, so processing never reads from the upload location.
//! 2. [`RunLifecycle::after_run`] reacts to the outcome: the staged input is
//!    deleted on success and moved to the error directory on failure.
//!
//! Every run whose `before_run` succeeded must receive exactly one
//! `after_run`. The controller does not retry and never changes an outcome.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::Result;
use crate::mover::StagingMover;
use crate::params::{ERROR_PATH, INPUT_PATH, RunOutcome, RunParameters, UPLOAD_PATH, parent_dir};

/// Hooks invoked around a single processing run.
#[async_trait]
pub trait RunLifecycle: Send + Sync {
    /// Prepare the filesystem before the processor runs.
    async fn before_run(&self, params: &RunParameters) -> Result<()>;

    /// Relocate files after the processor reached `outcome`.
    async fn after_run(&self, params: &RunParameters, outcome: RunOutcome) -> Result<()>;
}

/// Lifecycle that moves files between the upload, input and error directories.
#[derive(Debug, Clone, Default)]
pub struct RunLifecycleController {
    mover: StagingMover,
}

impl RunLifecycleController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mover(mover: StagingMover) -> Self {
        Self { mover }
    }
}

#[async_trait]
impl RunLifecycle for RunLifecycleController {
    async fn before_run(&self, params: &RunParameters) -> Result<()> {
        params.require(&[UPLOAD_PATH, INPUT_PATH])?;
        let upload = params.required_path(UPLOAD_PATH)?;
        let input = params.required_path(INPUT_PATH)?;

        let staged = self
            .mover
            .move_to_directory(upload, parent_dir(input))
            .await?;
        debug!(path = %staged.display(), "Staged upload for processing");
        Ok(())
    }

    async fn after_run(&self, params: &RunParameters, outcome: RunOutcome) -> Result<()> {
        match outcome {
            RunOutcome::Completed => {
                let input = params.required_path(INPUT_PATH)?;
                self.mover.delete(input).await?;
                info!(input = %input.display(), "Run completed, removed staged input");
            }
            RunOutcome::Failed => {
                params.require(&[INPUT_PATH, ERROR_PATH])?;
                let input = params.required_path(INPUT_PATH)?;
                let error = params.required_path(ERROR_PATH)?;
                let moved = self
                    .mover
                    .move_to_directory(input, parent_dir(error))
                    .await?;
                info!(path = %moved.display(), "Run failed, moved input to error directory");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StagingError;
    use pretty_assertions::assert_eq;
    use std::path::Path;
    use tempfile::TempDir;

    struct Layout {
        temp_dir: TempDir,
        params: RunParameters,
    }

    impl Layout {
        fn new(name: &str) -> Self {
            let temp_dir = TempDir::new().unwrap();
            let root = temp_dir.path();
            std::fs::create_dir(root.join("upload")).unwrap();
            std::fs::write(root.join("upload").join(name), r#"[{"name":"Wei Lang"}]"#).unwrap();

            let params = RunParameters::new()
                .with_upload_path(root.join("upload").join(name))
                .with_input_path(root.join("input").join(name))
                .with_output_path(root.join("output").join(name))
                .with_error_path(root.join("error").join(name));

            Self {
                temp_dir,
                params,
            }
        }

        fn path(&self, key: &str) -> &Path {
            self.params.path(key).unwrap()
        }

        fn file_count(&self) -> usize {
            walk(self.temp_dir.path())
        }
    }

    fn walk(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .map(|p| if p.is_dir() { walk(&p) } else { 1 })
            .sum()
    }

    #[tokio::test]
    async fn test_before_run_stages_into_input_directory() {
        let layout = Layout::new("persons.json");
        let controller = RunLifecycleController::new();

        controller.before_run(&layout.params).await.unwrap();

        assert!(!layout.path(UPLOAD_PATH).exists());
        assert!(layout.path(INPUT_PATH).exists());
    }

    #[tokio::test]
    async fn test_completed_run_removes_input() {
        let layout = Layout::new("persons.json");
        let controller = RunLifecycleController::new();
        controller.before_run(&layout.params).await.unwrap();

        // Stand-in for the processor writing its output.
        let output = layout.params.output_path.clone().unwrap();
        std::fs::create_dir_all(output.parent().unwrap()).unwrap();
        std::fs::write(&output, "[]").unwrap();

        controller
            .after_run(&layout.params, RunOutcome::Completed)
            .await
            .unwrap();

        assert!(!layout.path(INPUT_PATH).exists());
        assert!(output.exists());
    }

    #[tokio::test]
    async fn test_failed_run_moves_input_to_error_directory() {
        let layout = Layout::new("persons.json");
        let controller = RunLifecycleController::new();
        controller.before_run(&layout.params).await.unwrap();

        controller
            .after_run(&layout.params, RunOutcome::Failed)
            .await
            .unwrap();

        assert!(!layout.path(INPUT_PATH).exists());
        assert!(layout.path(ERROR_PATH).exists());
        assert_eq!(
            layout.path(ERROR_PATH).file_name().unwrap(),
            "persons.json"
        );
    }

    #[tokio::test]
    async fn test_before_run_without_paths_touches_nothing() {
        let layout = Layout::new("persons.json");
        let controller = RunLifecycleController::new();
        let before = layout.file_count();

        let mut params = layout.params.clone();
        params.input_path = None;
        let err = controller.before_run(&params).await.unwrap_err();
        assert!(matches!(
            err,
            StagingError::InvalidParameters { ref missing } if missing == &vec![INPUT_PATH]
        ));

        let mut params = layout.params.clone();
        params.upload_path = None;
        let err = controller.before_run(&params).await.unwrap_err();
        assert!(err.is_invalid_parameters());

        assert_eq!(layout.file_count(), before);
        assert!(layout.path(UPLOAD_PATH).exists());
        assert!(!layout.path(INPUT_PATH).parent().unwrap().exists());
    }

    #[tokio::test]
    async fn test_failed_run_requires_error_path() {
        let layout = Layout::new("persons.json");
        let controller = RunLifecycleController::new();
        controller.before_run(&layout.params).await.unwrap();

        let mut params = layout.params.clone();
        params.error_path = None;
        let err = controller
            .after_run(&params, RunOutcome::Failed)
            .await
            .unwrap_err();

        assert!(err.is_invalid_parameters());
        assert!(layout.path(INPUT_PATH).exists());
    }

    #[tokio::test]
    async fn test_second_after_run_is_an_io_failure() {
        for outcome in [RunOutcome::Completed, RunOutcome::Failed] {
            let layout = Layout::new("persons.json");
            let controller = RunLifecycleController::new();
            controller.before_run(&layout.params).await.unwrap();
            controller.after_run(&layout.params, outcome).await.unwrap();

            let err = controller
                .after_run(&layout.params, outcome)
                .await
                .unwrap_err();
            assert!(err.is_io(), "{outcome:?}: {err}");
        }
    }
}
