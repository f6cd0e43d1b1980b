//! taskmirror Core Library
//!
//! This crate provides the core functionality for taskmirror, a client that
//! keeps a local mirror of a task service's items, projects and labels in
//! step with the server's sync endpoint.
//!
//! # Architecture
//!
//! - **Sync endpoint**: Source of truth; every change is a command sent with a
//!   sync call
//! - **Snapshot**: Local mirror, only ever replaced by merging a server response
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let client = SyncClient::new(Arc::new(config.transport()?));
//! let cancel = CancellationToken::new();
//!
//! client.full_sync(&cancel).await?;
//! let item = client.add_task(&cancel, AddItemArgs::new("Buy milk")).await?;
//! ```
//!
//! # Modules
//!
//! - `sync`: Transport, commands, orchestrator, merge and diff
//! - `models`: Items, projects, labels and their value types
//! - `storage`: Snapshot persistence
//! - `config`: Application configuration

pub mod config;
pub mod models;
pub mod storage;
pub mod sync;

pub use config::Config;
pub use models::{DueDate, Item, Label, Priority, Project};
pub use storage::{FileSnapshotStore, SnapshotStore, StorageError};
pub use sync::{Command, CommandArgs, Snapshot, SyncClient, SyncError, SyncPhase};
