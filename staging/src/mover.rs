//! Relocating files between pipeline directories.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};

use crate::error::{FileOperation, Result, StagingError};

/// Moves and deletes files on behalf of the run lifecycle.
///
/// A move keeps the file name and never overwrites an existing file. Within a
/// single filesystem it is a `rename`, so callers never observe a partially
/// moved file. Across filesystems it degrades to copy then delete.
#[derive(Debug, Clone, Copy, Default)]
pub struct StagingMover;

impl StagingMover {
    pub fn new() -> Self {
        Self
    }

    /// Move `source` into `target_dir`, creating the directory if needed.
    ///
    /// Returns the new path of the file.
    pub async fn move_to_directory(&self, source: &Path, target_dir: &Path) -> Result<PathBuf> {
        let metadata = fs::metadata(source)
            .await
            .map_err(|e| StagingError::io(FileOperation::Move, source, e))?;
        if !metadata.is_file() {
            return Err(StagingError::io(
                FileOperation::Move,
                source,
                io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
            ));
        }

        let file_name = source.file_name().ok_or_else(|| {
            StagingError::io(
                FileOperation::Move,
                source,
                io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"),
            )
        })?;

        fs::create_dir_all(target_dir)
            .await
            .map_err(|e| StagingError::io(FileOperation::CreateDirectory, target_dir, e))?;

        let destination = target_dir.join(file_name);
        let exists = fs::try_exists(&destination)
            .await
            .map_err(|e| StagingError::io(FileOperation::Move, &destination, e))?;
        if exists {
            return Err(StagingError::io(
                FileOperation::Move,
                source,
                io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("destination {} already exists", destination.display()),
                ),
            ));
        }

        match fs::rename(source, &destination).await {
            Ok(()) => {
                debug!(
                    src = %source.display(),
                    dest = %destination.display(),
                    "Moved file"
                );
                Ok(destination)
            }
            Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
                warn!(error = %e, "Rename crosses devices, falling back to copy+delete");
                self.copy_then_delete(source, &destination).await?;
                Ok(destination)
            }
            Err(e) => Err(StagingError::io(FileOperation::Move, source, e)),
        }
    }

    /// Delete the file at `path`. A missing file is an error.
    pub async fn delete(&self, path: &Path) -> Result<()> {
        fs::remove_file(path)
            .await
            .map_err(|e| StagingError::io(FileOperation::Delete, path, e))?;
        debug!(path = %path.display(), "Deleted file");
        Ok(())
    }

    async fn copy_then_delete(&self, source: &Path, destination: &Path) -> Result<()> {
        fs::copy(source, destination)
            .await
            .map_err(|e| StagingError::io(FileOperation::Copy, source, e))?;

        if let Err(e) = fs::remove_file(source).await {
            // Leave exactly one copy behind.
            if let Err(cleanup) = fs::remove_file(destination).await {
                warn!(
                    path = %destination.display(),
                    error = %cleanup,
                    "Failed to remove copy after source delete failed"
                );
            }
            return Err(StagingError::io(FileOperation::Delete, source, e));
        }

        debug!(
            src = %source.display(),
            dest = %destination.display(),
            "Copied file and removed source"
        );
        Ok(())
    }
}
