//! Enumerating files that arrived before the watcher started.

use std::path::PathBuf;

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::WatchConfig;
use crate::error::Result;

/// Lists eligible files directly inside the watched directory.
///
/// The order is by file name, so repeated scans of the same directory
/// yield files in the same order.
pub struct BacklogScanner<'a> {
    config: &'a WatchConfig,
}

impl<'a> BacklogScanner<'a> {
    pub fn new(config: &'a WatchConfig) -> Self {
        Self { config }
    }

    /// Scan the directory once.
    pub fn scan(&self) -> Result<Vec<PathBuf>> {
        let start = std::time::Instant::now();
        let mut files = Vec::new();
        let mut skipped = 0usize;

        let walker = WalkDir::new(&self.config.path)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
            .sort_by_file_name();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                // The watched directory itself is unreadable.
                Err(e) if e.depth() == 0 => return Err(e.into()),
                Err(e) => {
                    warn!("Skipping unreadable entry: {e}");
                    continue;
                }
            };

            let path = entry.path();
            if !entry.file_type().is_file() || !self.config.is_eligible(path) {
                debug!("Ignoring non-eligible entry: {}", path.display());
                skipped += 1;
                continue;
            }

            files.push(entry.into_path());
        }

        info!(
            "Found {} eligible files in {} in {:?} ({} ignored)",
            files.len(),
            self.config.path.display(),
            start.elapsed(),
            skipped
        );

        Ok(files)
    }
}
