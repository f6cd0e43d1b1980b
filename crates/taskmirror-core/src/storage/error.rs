//! Storage error handling
//!
//! Provides typed errors for snapshot persistence with descriptive messages
//! and recovery suggestions.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or saving the snapshot
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Permission denied: cannot {action} '{path}'. Check file permissions.")]
    PermissionDenied {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Disk full or quota exceeded while trying to {action} '{path}'")]
    DiskFull {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Any other I/O failure
    #[error("Failed to {action} '{path}': {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Snapshot file exists but cannot be parsed
    #[error("Snapshot at '{path}' is corrupted: {details}. A backup has been created at '{backup_path}'.")]
    CorruptSnapshot {
        path: PathBuf,
        backup_path: PathBuf,
        details: String,
    },

    #[error("Failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),
}

impl StorageError {
    /// Classify an I/O error from `action` on `path`
    pub fn from_io(error: io::Error, action: &'static str, path: PathBuf) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => StorageError::PermissionDenied {
                action,
                path,
                source: error,
            },
            _ if is_disk_full_error(&error) => StorageError::DiskFull {
                action,
                path,
                source: error,
            },
            _ => StorageError::Io {
                action,
                path,
                source: error,
            },
        }
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StorageError::DiskFull { .. } => Some("Free up disk space and try again."),
            StorageError::PermissionDenied { .. } => {
                Some("Check file and directory permissions of the data directory.")
            }
            StorageError::CorruptSnapshot { .. } => {
                Some("Run `taskmirror sync --full` to rebuild the local mirror from the server.")
            }
            _ => None,
        }
    }
}

fn is_disk_full_error(error: &io::Error) -> bool {
    let msg = error.to_string().to_lowercase();
    msg.contains("no space left")
        || msg.contains("disk full")
        || msg.contains("quota exceeded")
        || msg.contains("not enough space")
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_denied_classification() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let err = StorageError::from_io(io_err, "read", PathBuf::from("/data/snapshot.json"));

        assert!(matches!(err, StorageError::PermissionDenied { .. }));
        assert!(err.to_string().contains("cannot read '/data/snapshot.json'"));
        assert!(err.recovery_suggestion().is_some());
    }

    #[test]
    fn test_disk_full_detection() {
        let io_err = io::Error::new(io::ErrorKind::Other, "No space left on device");
        let err = StorageError::from_io(io_err, "write", PathBuf::from("/full/disk"));

        assert!(matches!(err, StorageError::DiskFull { .. }));
        assert!(err.recovery_suggestion().is_some());
    }

    #[test]
    fn test_other_io_keeps_action() {
        let io_err = io::Error::new(io::ErrorKind::Other, "broken pipe");
        let err = StorageError::from_io(io_err, "replace", PathBuf::from("/x"));
        assert!(matches!(err, StorageError::Io { action: "replace", .. }));
        assert!(err.to_string().starts_with("Failed to replace '/x'"));
        assert!(err.recovery_suggestion().is_none());
    }

    #[test]
    fn test_corrupt_snapshot_display() {
        let err = StorageError::CorruptSnapshot {
            path: PathBuf::from("/data/snapshot.json"),
            backup_path: PathBuf::from("/data/snapshot.json.corrupt.backup"),
            details: "expected value at line 1".to_string(),
        };

        let msg = err.to_string();
        assert!(msg.contains("corrupted"));
        assert!(msg.contains("backup"));
        assert!(err.recovery_suggestion().unwrap().contains("--full"));
    }
}
