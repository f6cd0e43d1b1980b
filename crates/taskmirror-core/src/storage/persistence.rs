//! Snapshot persistence
//!
//! Saves the synced snapshot as JSON so the next run can continue with an
//! incremental sync. Uses atomic writes (write to temp file, then rename) to
//! prevent corruption.
//!
//! Storage location: `~/.local/share/taskmirror/snapshot.json` (configurable
//! via `Config`)

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::error::{StorageError, StorageResult};
use super::SnapshotStore;
use crate::config::Config;
use crate::sync::Snapshot;

/// Stores the snapshot in a single JSON file
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    /// Store at an explicit path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the snapshot path of the given configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.snapshot_path())
    }

    /// Path of the snapshot file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn backup_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".corrupt.backup");
        PathBuf::from(name)
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self) -> StorageResult<Option<Snapshot>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::from_io(e, "read", self.path.clone())),
        };

        match serde_json::from_slice::<Snapshot>(&bytes) {
            Ok(snapshot) => {
                debug!("Loaded snapshot from {:?}", self.path);
                Ok(Some(snapshot))
            }
            Err(e) => {
                let backup_path = self.backup_path();
                warn!("Snapshot {:?} is unreadable, backing up to {:?}", self.path, backup_path);
                fs::copy(&self.path, &backup_path)
                    .map_err(|err| StorageError::from_io(err, "back up to", backup_path.clone()))?;
                Err(StorageError::CorruptSnapshot {
                    path: self.path.clone(),
                    backup_path,
                    details: e.to_string(),
                })
            }
        }
    }

    fn save(&self, snapshot: &Snapshot) -> StorageResult<()> {
        let bytes = serde_json::to_vec_pretty(snapshot)?;
        atomic_write(&self.path, &bytes)?;
        debug!("Saved snapshot to {:?}", self.path);
        Ok(())
    }
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
///
/// The target file is never left in a partially-written state.
fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| StorageError::from_io(e, "create directory", parent.to_path_buf()))?;
    }

    let temp_path = path.with_extension("tmp");

    let write_err = |e: io::Error| StorageError::from_io(e, "write", temp_path.clone());
    let mut file = File::create(&temp_path).map_err(write_err)?;
    file.write_all(data).map_err(write_err)?;
    // Sync to disk before rename
    file.sync_all().map_err(write_err)?;

    fs::rename(&temp_path, path)
        .map_err(|e| StorageError::from_io(e, "replace", path.to_path_buf()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::SyncResponse;
    use tempfile::TempDir;

    fn sample() -> Snapshot {
        let response: SyncResponse = serde_json::from_str(
            r#"{
                "sync_token": "abc",
                "items": [{"id": "1", "content": "Buy Milk", "labels": ["Food"]}],
                "projects": [{"id": "p", "name": "Inbox", "inbox_project": true}],
                "labels": [{"id": "l", "name": "Food"}],
                "temp_id_mapping": {"tmp": "1"}
            }"#,
        )
        .unwrap();
        Snapshot::from_response(response)
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileSnapshotStore::new(temp_dir.path().join("snapshot.json"));

        // Initially no snapshot
        assert!(store.load().unwrap().is_none());

        store.save(&sample()).unwrap();
        assert!(store.path().exists());

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.sync_token(), Some("abc"));
        assert_eq!(loaded.item("1").unwrap().labels, vec!["Food"]);
        assert_eq!(loaded.project("p").unwrap().name, "Inbox");
        // Per-exchange data is not persisted
        assert!(loaded.temp_id_mapping().is_empty());
    }

    #[test]
    fn test_corrupt_snapshot_is_backed_up() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("snapshot.json");
        fs::write(&path, b"{ not json").unwrap();

        let store = FileSnapshotStore::new(&path);
        match store.load() {
            Err(StorageError::CorruptSnapshot { backup_path, .. }) => {
                assert_eq!(fs::read(&backup_path).unwrap(), b"{ not json");
            }
            other => panic!("expected corrupt snapshot error, got {:?}", other),
        }
    }

    #[test]
    fn test_unreadable_path_reports_read() {
        let temp_dir = TempDir::new().unwrap();
        // A directory where the file should be
        let store = FileSnapshotStore::new(temp_dir.path());

        match store.load() {
            Err(StorageError::Io { action, .. }) => assert_eq!(action, "read"),
            other => panic!("expected read error, got {:?}", other),
        }
    }

    #[test]
    fn test_atomic_write_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let nested_path = temp_dir
            .path()
            .join("a")
            .join("b")
            .join("c")
            .join("file.txt");

        atomic_write(&nested_path, b"test data").unwrap();

        assert!(nested_path.exists());
        let content = fs::read_to_string(&nested_path).unwrap();
        assert_eq!(content, "test data");
        assert!(!nested_path.with_extension("tmp").exists());
    }

    #[test]
    fn test_overwrite_keeps_latest() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileSnapshotStore::new(temp_dir.path().join("snapshot.json"));

        store.save(&Snapshot::default()).unwrap();
        store.save(&sample()).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.sync_token(), Some("abc"));
    }
}
