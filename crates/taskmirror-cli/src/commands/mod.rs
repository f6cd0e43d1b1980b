//! Command handlers
//!
//! Every networked command goes through a [`Session`]. It loads the persisted
//! snapshot, wires a sync client to the configured API, cancels the in-flight
//! call on Ctrl-C and saves the snapshot once the command is done.

pub mod config;
pub mod label;
pub mod project;
pub mod status;
pub mod sync;
pub mod task;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use taskmirror_core::sync::{SyncError, SyncPhase};
use taskmirror_core::{Config, FileSnapshotStore, Snapshot, SnapshotStore, StorageError, SyncClient};

use crate::output::Output;

/// Loaded configuration, snapshot and client for one CLI invocation
pub struct Session {
    pub config: Config,
    pub client: SyncClient,
    pub cancel: CancellationToken,
    store: FileSnapshotStore,
}

impl Session {
    /// Load config and snapshot and build the client
    pub fn open(config_path: Option<&PathBuf>, output: &Output) -> Result<Self> {
        let config =
            Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
        let transport = config.transport()?;

        let store = FileSnapshotStore::from_config(&config);
        let snapshot = load_snapshot(&store, output)?;

        let client = SyncClient::new(Arc::new(transport)).with_snapshot(snapshot);

        let cancel = CancellationToken::new();
        let on_interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                on_interrupt.cancel();
            }
        });

        Ok(Self {
            config,
            client,
            cancel,
            store,
        })
    }

    /// Persist the snapshot if any sync succeeded during this session
    ///
    /// The server already holds the changes, so a failed save only costs a
    /// full sync next time.
    pub async fn save(&self) {
        if self.client.phase() != SyncPhase::Synced {
            return;
        }
        let snapshot = self.client.snapshot().await;
        if let Err(e) = self.store.save(&snapshot) {
            warn!("Failed to persist snapshot: {}", e);
        }
    }

    /// Bring the snapshot up to date before reading from it
    ///
    /// A failed refresh is reported and the local snapshot is used as is.
    pub async fn refresh(&self, output: &Output) -> Snapshot {
        match self.client.sync(&self.cancel, Vec::new()).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                output.warn(&format!("Sync failed, showing local data: {}", e.user_message()));
                self.client.snapshot().await
            }
        }
    }
}

/// Load the persisted snapshot, starting fresh when it is unreadable
fn load_snapshot(store: &FileSnapshotStore, output: &Output) -> Result<Snapshot> {
    match store.load() {
        Ok(snapshot) => Ok(snapshot.unwrap_or_default()),
        Err(e @ StorageError::CorruptSnapshot { .. }) => {
            warn!("Discarding unreadable snapshot: {}", e);
            output.warn(&e.to_string());
            Ok(Snapshot::default())
        }
        Err(e) => match e.recovery_suggestion() {
            Some(hint) => Err(anyhow!("{}\n{}", e, hint)),
            None => Err(e.into()),
        },
    }
}

/// Turn a sync error into the message shown for the failed operation
pub fn failed(err: SyncError) -> anyhow::Error {
    anyhow!(err.user_message())
}
