//! Files observed in the watched directory.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A file observed in the watch directory, on its way to a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchedFile {
    /// Path to the file.
    pub path: PathBuf,

    /// How the file was discovered.
    pub source: DiscoverySource,

    /// When the file was discovered.
    pub detected_at: DateTime<Utc>,
}

impl WatchedFile {
    pub fn new(path: impl Into<PathBuf>, source: DiscoverySource) -> Self {
        Self {
            path: path.into(),
            source,
            detected_at: Utc::now(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name, if the path has one.
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }
}

/// Where a [`WatchedFile`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoverySource {
    /// Present when the watcher started.
    Backlog,

    /// Reported by the live listener.
    Live,
}

/// Kind of file event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileEventKind {
    /// File was created.
    Created,

    /// File was modified.
    Modified,

    /// File was deleted.
    Deleted,

    /// File was renamed (old path).
    RenamedFrom,

    /// File was renamed (new path).
    RenamedTo,

    /// Unknown event type.
    Unknown,
}

impl FileEventKind {
    /// Whether the event means a file appeared at the reported path.
    pub fn is_arrival(self) -> bool {
        matches!(self, Self::Created | Self::RenamedTo)
    }
}

impl From<notify::EventKind> for FileEventKind {
    fn from(kind: notify::EventKind) -> Self {
        match kind {
            notify::EventKind::Create(_) => Self::Created,
            notify::EventKind::Modify(notify::event::ModifyKind::Name(rename)) => match rename {
                notify::event::RenameMode::From => Self::RenamedFrom,
                notify::event::RenameMode::To => Self::RenamedTo,
                _ => Self::Modified,
            },
            notify::EventKind::Modify(_) => Self::Modified,
            notify::EventKind::Remove(_) => Self::Deleted,
            _ => Self::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};

    #[test]
    fn test_watched_file_creation() {
        let file = WatchedFile::new("/work/upload/persons.json", DiscoverySource::Backlog);
        assert_eq!(file.path(), Path::new("/work/upload/persons.json"));
        assert_eq!(file.file_name(), Some("persons.json"));
        assert_eq!(file.source, DiscoverySource::Backlog);
    }

    #[test]
    fn test_arrival_kinds() {
        let created = FileEventKind::from(notify::EventKind::Create(CreateKind::File));
        let renamed_to =
            FileEventKind::from(notify::EventKind::Modify(ModifyKind::Name(RenameMode::To)));
        let renamed_from =
            FileEventKind::from(notify::EventKind::Modify(ModifyKind::Name(RenameMode::From)));
        let removed = FileEventKind::from(notify::EventKind::Remove(RemoveKind::File));

        assert!(created.is_arrival());
        assert!(renamed_to.is_arrival());
        assert!(!renamed_from.is_arrival());
        assert!(!removed.is_arrival());
        assert!(!FileEventKind::from(notify::EventKind::Any).is_arrival());
    }
}
