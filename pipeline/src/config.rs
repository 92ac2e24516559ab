//! Configuration for the intake pipeline.

use std::path::{Path, PathBuf};
use std::time::Duration;

use intake_directory_watcher::{WatchConfig, WatchMode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PipelineError, Result};

/// Configuration for the intake pipeline.
///
/// Relative directories are resolved against `work_dir`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Root for relative directories.
    pub work_dir: PathBuf,

    /// Drop zone watched for new files.
    pub upload_dir: PathBuf,

    /// Staging directory the processor reads from.
    pub input_dir: PathBuf,

    /// Directory processed output is written to.
    pub output_dir: PathBuf,

    /// Directory failed inputs are moved to.
    pub error_dir: PathBuf,

    /// Eligible file extensions.
    pub extensions: Vec<String>,

    /// How new uploads are detected.
    pub watch_mode: WatchMode,

    /// Poll interval in milliseconds.
    pub poll_interval_ms: u64,

    /// Whether runs redact personal data.
    pub anonymize: bool,

    /// Maximum number of runs in progress at once.
    pub max_concurrent_runs: usize,

    /// Processor time limit in seconds (None = unlimited).
    pub processor_timeout_secs: Option<u64>,
}

impl PipelineConfig {
    /// Create a configuration rooted at `work_dir` with default values.
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            ..Self::default()
        }
    }

    /// Load a configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        let config = Self::from_toml_str(&contents)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse a configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| PipelineError::Config(e.to_string()))
    }

    /// Enable or disable anonymization.
    pub fn with_anonymize(mut self, anonymize: bool) -> Self {
        self.anonymize = anonymize;
        self
    }

    /// Set the watch mode.
    pub fn with_watch_mode(mut self, mode: WatchMode) -> Self {
        self.watch_mode = mode;
        self
    }

    /// Set the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the concurrency bound.
    pub fn with_max_concurrent_runs(mut self, max: usize) -> Self {
        self.max_concurrent_runs = max;
        self
    }

    /// Set the processor time limit.
    pub fn with_processor_timeout(mut self, timeout: Duration) -> Self {
        self.processor_timeout_secs = Some(timeout.as_secs().max(1));
        self
    }

    /// Replace the eligible extensions.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Check the configuration for values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.extensions.iter().all(|e| e.trim_start_matches('.').is_empty()) {
            return Err(PipelineError::Config(
                "at least one eligible extension is required".to_string(),
            ));
        }
        if self.max_concurrent_runs == 0 {
            return Err(PipelineError::Config(
                "max_concurrent_runs must be at least 1".to_string(),
            ));
        }
        if self.watch_mode == WatchMode::Poll && self.poll_interval_ms == 0 {
            return Err(PipelineError::Config(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.processor_timeout_secs == Some(0) {
            return Err(PipelineError::Config(
                "processor_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve the four pipeline directories.
    pub fn directories(&self) -> Directories {
        let resolve = |dir: &Path| self.work_dir.join(dir);
        Directories {
            upload: resolve(&self.upload_dir),
            input: resolve(&self.input_dir),
            output: resolve(&self.output_dir),
            error: resolve(&self.error_dir),
        }
    }

    /// Create any pipeline directory that does not exist yet.
    pub async fn ensure_directories(&self) -> Result<Directories> {
        let directories = self.directories();
        for dir in directories.iter() {
            tokio::fs::create_dir_all(dir).await?;
        }
        Ok(directories)
    }

    /// Poll interval as a duration.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Processor time limit as a duration.
    pub fn processor_timeout(&self) -> Option<Duration> {
        self.processor_timeout_secs.map(Duration::from_secs)
    }

    /// Watcher configuration for the upload directory.
    pub fn watch_config(&self) -> WatchConfig {
        WatchConfig::new(self.directories().upload)
            .with_extensions(self.extensions.iter().cloned())
            .with_mode(self.watch_mode)
            .with_poll_interval(self.poll_interval())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("."),
            upload_dir: PathBuf::from("upload"),
            input_dir: PathBuf::from("input"),
            output_dir: PathBuf::from("output"),
            error_dir: PathBuf::from("error"),
            extensions: vec!["json".to_string()],
            watch_mode: WatchMode::Poll,
            poll_interval_ms: 5_000,
            anonymize: false,
            max_concurrent_runs: 1,
            processor_timeout_secs: None,
        }
    }
}

/// Resolved pipeline directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directories {
    pub upload: PathBuf,
    pub input: PathBuf,
    pub output: PathBuf,
    pub error: PathBuf,
}

impl Directories {
    fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        [&self.upload, &self.input, &self.output, &self.error].into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.max_concurrent_runs, 1);
        assert!(!config.anonymize);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_directories_resolve_against_work_dir() {
        let mut config = PipelineConfig::new("/srv/intake");
        config.error_dir = PathBuf::from("/var/intake/error");

        let dirs = config.directories();
        assert_eq!(dirs.upload, Path::new("/srv/intake/upload"));
        assert_eq!(dirs.input, Path::new("/srv/intake/input"));
        assert_eq!(dirs.output, Path::new("/srv/intake/output"));
        assert_eq!(dirs.error, Path::new("/var/intake/error"));
    }

    #[test]
    fn test_from_toml() {
        let config = PipelineConfig::from_toml_str(
            r#"
            work_dir = "/srv/intake"
            upload_dir = "public/upload"
            watch_mode = "native"
            anonymize = true
            max_concurrent_runs = 4
            processor_timeout_secs = 30
            "#,
        )
        .unwrap();

        assert_eq!(config.upload_dir, Path::new("public/upload"));
        assert_eq!(config.watch_mode, WatchMode::Native);
        assert!(config.anonymize);
        assert_eq!(config.max_concurrent_runs, 4);
        assert_eq!(config.processor_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.input_dir, Path::new("input"));
        assert_eq!(config.extensions, vec!["json".to_string()]);
    }

    #[test]
    fn test_from_toml_rejects_bad_values() {
        assert!(PipelineConfig::from_toml_str("watch_mode = \"inotify\"").is_err());
        assert!(PipelineConfig::from_toml_str("max_concurrent_runs = -1").is_err());
    }

    #[test]
    fn test_validate() {
        assert!(
            PipelineConfig::default()
                .with_max_concurrent_runs(0)
                .validate()
                .is_err()
        );
        assert!(
            PipelineConfig::default()
                .with_extensions(["."])
                .validate()
                .is_err()
        );
        assert!(
            PipelineConfig::default()
                .with_poll_interval(Duration::ZERO)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_watch_config() {
        let config = PipelineConfig::new("/srv/intake")
            .with_extensions(["json", "ndjson"])
            .with_poll_interval(Duration::from_millis(200));
        let watch = config.watch_config();

        assert_eq!(watch.path, Path::new("/srv/intake/upload"));
        assert_eq!(watch.poll_interval, Duration::from_millis(200));
        assert!(watch.is_eligible(Path::new("a.ndjson")));
    }

    #[tokio::test]
    async fn test_ensure_directories() {
        let temp_dir = TempDir::new().unwrap();
        let dirs = PipelineConfig::new(temp_dir.path())
            .ensure_directories()
            .await
            .unwrap();

        assert!(dirs.upload.is_dir());
        assert!(dirs.input.is_dir());
        assert!(dirs.output.is_dir());
        assert!(dirs.error.is_dir());
    }

    #[test]
    fn test_load_missing_file() {
        let err = PipelineConfig::load(Path::new("/nonexistent/intake.toml")).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }
}
