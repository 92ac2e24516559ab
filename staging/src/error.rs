//! Error types for staging and run lifecycle hooks.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for staging operations.
pub type Result<T> = std::result::Result<T, StagingError>;

/// Errors that can occur while staging or relocating a file.
#[derive(Error, Debug)]
pub enum StagingError {
    /// Required run parameters are absent. No filesystem change was attempted.
    #[error("run parameters do not contain required keys: {missing:?}")]
    InvalidParameters {
        /// Keys that were missing, in their string-keyed form.
        missing: Vec<&'static str>,
    },

    /// A filesystem operation could not complete.
    ///
    /// The location of the affected file afterwards is undefined.
    #[error("failed to {op} {}: {source}", .path.display())]
    Io {
        /// Operation that failed.
        op: FileOperation,
        /// Path the operation was applied to.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl StagingError {
    pub(crate) fn missing(keys: Vec<&'static str>) -> Self {
        Self::InvalidParameters { missing: keys }
    }

    pub(crate) fn io(op: FileOperation, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            op,
            path: path.into(),
            source,
        }
    }

    /// Whether this is an `InvalidParameters` error.
    pub fn is_invalid_parameters(&self) -> bool {
        matches!(self, Self::InvalidParameters { .. })
    }

    /// Whether this is an IO failure.
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}

/// Filesystem operation named in an [`StagingError::Io`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOperation {
    Move,
    Copy,
    Delete,
    CreateDirectory,
}

impl fmt::Display for FileOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            Self::Move => "move",
            Self::Copy => "copy",
            Self::Delete => "delete",
            Self::CreateDirectory => "create directory",
        };
        f.write_str(verb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_parameters_message() {
        let err = StagingError::missing(vec!["uploadPath", "inputPath"]);
        assert_eq!(
            err.to_string(),
            r#"run parameters do not contain required keys: ["uploadPath", "inputPath"]"#
        );
        assert!(err.is_invalid_parameters());
    }

    #[test]
    fn test_io_message_names_operation() {
        let err = StagingError::io(
            FileOperation::Delete,
            "/work/input/a.json",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.is_io());
        assert_eq!(err.to_string(), "failed to delete /work/input/a.json: gone");
    }
}
