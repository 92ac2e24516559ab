//! Run parameters and outcomes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StagingError};

/// Key for the path of the file in the upload directory.
pub const UPLOAD_PATH: &str = "uploadPath";
/// Key for the path the processor reads from.
pub const INPUT_PATH: &str = "inputPath";
/// Key for the path the processor writes to.
pub const OUTPUT_PATH: &str = "outputPath";
/// Key for the path a failed input is relocated to.
pub const ERROR_PATH: &str = "errorPath";
/// Key for the personal-data redaction flag.
pub const ANONYMIZE: &str = "anonymize";

/// Immutable configuration for a single run.
///
/// Paths are not checked for existence here. Every path field is optional so
/// that the string-keyed form can be represented faithfully; use
/// [`RunParameters::validate`] to reject incomplete parameters before a run
/// starts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunParameters {
    pub upload_path: Option<PathBuf>,
    pub input_path: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
    pub error_path: Option<PathBuf>,
    #[serde(default)]
    pub anonymize: bool,
}

impl RunParameters {
    /// Create empty run parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build parameters from their string-keyed form.
    ///
    /// Unknown keys are ignored. `anonymize` is true only for a
    /// case-insensitive `"true"`.
    pub fn from_map(map: &HashMap<String, String>) -> Self {
        let path = |key: &str| map.get(key).map(PathBuf::from);
        Self {
            upload_path: path(UPLOAD_PATH),
            input_path: path(INPUT_PATH),
            output_path: path(OUTPUT_PATH),
            error_path: path(ERROR_PATH),
            anonymize: map
                .get(ANONYMIZE)
                .is_some_and(|v| v.eq_ignore_ascii_case("true")),
        }
    }

    /// Convert back to the string-keyed form.
    pub fn to_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        let entries = [
            (UPLOAD_PATH, &self.upload_path),
            (INPUT_PATH, &self.input_path),
            (OUTPUT_PATH, &self.output_path),
            (ERROR_PATH, &self.error_path),
        ];
        for (key, value) in entries {
            if let Some(path) = value {
                map.insert(key.to_string(), path.to_string_lossy().into_owned());
            }
        }
        map.insert(ANONYMIZE.to_string(), self.anonymize.to_string());
        map
    }

    pub fn with_upload_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.upload_path = Some(path.into());
        self
    }

    pub fn with_input_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.input_path = Some(path.into());
        self
    }

    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    pub fn with_error_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.error_path = Some(path.into());
        self
    }

    pub fn with_anonymize(mut self, anonymize: bool) -> Self {
        self.anonymize = anonymize;
        self
    }

    /// Check that every required key is present.
    ///
    /// All missing keys are reported together.
    pub fn validate(&self) -> Result<()> {
        self.require(&[UPLOAD_PATH, INPUT_PATH, OUTPUT_PATH, ERROR_PATH])
    }

    /// Check that the given keys are present.
    pub(crate) fn require(&self, keys: &[&'static str]) -> Result<()> {
        let missing: Vec<&'static str> = keys
            .iter()
            .copied()
            .filter(|key| self.path(key).is_none())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(StagingError::missing(missing))
        }
    }

    /// Look up a path by its string key.
    pub fn path(&self, key: &str) -> Option<&Path> {
        match key {
            UPLOAD_PATH => self.upload_path.as_deref(),
            INPUT_PATH => self.input_path.as_deref(),
            OUTPUT_PATH => self.output_path.as_deref(),
            ERROR_PATH => self.error_path.as_deref(),
            _ => None,
        }
    }

    /// Look up a path that is known to be required.
    pub(crate) fn required_path(&self, key: &'static str) -> Result<&Path> {
        self.path(key)
            .ok_or_else(|| StagingError::missing(vec![key]))
    }
}

/// Outcome of a processing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunOutcome {
    /// The processor succeeded and wrote the output.
    Completed,

    /// The processor (or reading/writing around it) failed.
    Failed,
}

impl RunOutcome {
    pub fn is_completed(self) -> bool {
        self == Self::Completed
    }
}

/// Directory a file should be moved into so that it ends up at `path`.
///
/// A bare file name resolves to the current directory.
pub(crate) fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}
