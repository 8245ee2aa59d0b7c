//! Where the snapshot lives between generations.

use crate::error::{Result, WarmBootError};
use crate::snapshot::WarmBootSnapshot;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const SOURCE: &str = "SnapshotStore";

/// Persistent storage for the warm-boot document.
pub trait SnapshotStore {
    /// Returns `None` when no document was saved, which means a cold boot.
    fn load(&self) -> Result<Option<WarmBootSnapshot>>;

    fn save(&self, snapshot: &WarmBootSnapshot) -> Result<()>;
}

/// Stores the snapshot as a pretty-printed JSON file.
///
/// Saving writes a sibling temporary file and renames it over the target, so
/// a reader sees either the previous document or the new one, never a torn
/// write.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self) -> Result<Option<WarmBootSnapshot>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                crate::info_log!(
                    SOURCE,
                    path = %self.path.display(),
                    "no warm boot snapshot found"
                );
                return Ok(None);
            }
            Err(e) => return Err(WarmBootError::Store(e)),
        };
        let snapshot = WarmBootSnapshot::from_json(&text)?;
        crate::info_log!(
            SOURCE,
            path = %self.path.display(),
            version = snapshot.version,
            "loaded warm boot snapshot"
        );
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &WarmBootSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let text = snapshot.to_json_pretty()?;
        let temp = self.temp_path();
        fs::write(&temp, text)?;
        fs::rename(&temp, &self.path)?;
        crate::info_log!(
            SOURCE,
            path = %self.path.display(),
            "saved warm boot snapshot"
        );
        Ok(())
    }
}
