//! Storage layer
//!
//! Persists the synced snapshot between runs. Only collections and the sync
//! token are stored; everything else is rebuilt from the server.

pub mod error;
pub mod persistence;

pub use error::{StorageError, StorageResult};
pub use persistence::FileSnapshotStore;

use crate::sync::Snapshot;

/// Somewhere a snapshot can be kept between runs
pub trait SnapshotStore: Send + Sync {
    /// Load the stored snapshot, `None` if nothing has been saved yet
    fn load(&self) -> StorageResult<Option<Snapshot>>;

    /// Replace the stored snapshot
    fn save(&self, snapshot: &Snapshot) -> StorageResult<()>;
}
