//! Sync orchestrator
//!
//! [`SyncClient`] owns the local snapshot and decides between a full and an
//! incremental sync. Every operation holds the state lock for its whole
//! exchange, so two calls never send the same token and a failed call never
//! leaves a half-applied snapshot behind.

use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::command::{
    AddItemArgs, AddLabelArgs, AddProjectArgs, Command, CommandArgs, TargetArgs, UpdateItemArgs,
    UpdateProjectArgs,
};
use super::diff::{diff, ItemForm, TimeZoneProvider};
use super::error::{SyncError, SyncResult};
use super::merge;
use super::snapshot::Snapshot;
use super::transport::{CommandStatus, SyncRequest, Transport};
use crate::models::{Item, Label, Project};

/// Where the client is in its sync lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// No token yet
    Uninitialized,
    /// A full sync is in flight
    FullSyncPending,
    /// Holding a token from a successful sync
    Synced,
    /// An incremental sync is in flight
    IncrementalSyncPending,
}

/// Client for the sync endpoint
pub struct SyncClient {
    transport: Arc<dyn Transport>,
    /// Current snapshot; also serializes operations
    state: Mutex<Snapshot>,
    phase: watch::Sender<SyncPhase>,
    phase_rx: watch::Receiver<SyncPhase>,
}

impl SyncClient {
    /// Create a client with an empty snapshot
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        let (phase_tx, phase_rx) = watch::channel(SyncPhase::Uninitialized);
        Self {
            transport,
            state: Mutex::new(Snapshot::default()),
            phase: phase_tx,
            phase_rx,
        }
    }

    /// Start from a previously persisted snapshot
    pub fn with_snapshot(self, snapshot: Snapshot) -> Self {
        let phase = if snapshot.sync_token().is_some() {
            SyncPhase::Synced
        } else {
            SyncPhase::Uninitialized
        };
        self.phase.send_replace(phase);
        Self {
            state: Mutex::new(snapshot),
            ..self
        }
    }

    /// Get the current phase
    pub fn phase(&self) -> SyncPhase {
        *self.phase_rx.borrow()
    }

    /// Subscribe to phase changes
    pub fn subscribe_phase(&self) -> watch::Receiver<SyncPhase> {
        self.phase_rx.clone()
    }

    /// Copy of the current snapshot
    ///
    /// Waits for an in-flight sync to finish.
    pub async fn snapshot(&self) -> Snapshot {
        self.state.lock().await.clone()
    }

    // ==================== Sync Operations ====================

    /// Discard the local mirror and fetch everything
    pub async fn full_sync(&self, cancel: &CancellationToken) -> SyncResult<Snapshot> {
        let mut state = self.state.lock().await;
        self.run(&mut state, Vec::new(), true, cancel).await?;
        Ok(state.clone())
    }

    /// Send `commands` and fold the server's changes into the snapshot
    ///
    /// Without a token this is a full sync carrying the commands. Individual
    /// command failures do not fail the call; they are recorded in the
    /// returned snapshot's outcomes.
    pub async fn sync(
        &self,
        cancel: &CancellationToken,
        commands: Vec<Command>,
    ) -> SyncResult<Snapshot> {
        for command in &commands {
            command.args.validate()?;
        }
        let mut state = self.state.lock().await;
        self.run(&mut state, commands, false, cancel).await?;
        Ok(state.clone())
    }

    async fn run(
        &self,
        state: &mut Snapshot,
        commands: Vec<Command>,
        force_full: bool,
        cancel: &CancellationToken,
    ) -> SyncResult<()> {
        let request = match state.sync_token() {
            Some(token) if !force_full => SyncRequest::incremental(token, commands),
            _ => SyncRequest::full(commands),
        };

        let previous = self.phase();
        self.set_phase(if request.is_full() {
            SyncPhase::FullSyncPending
        } else {
            SyncPhase::IncrementalSyncPending
        });

        match self.exchange(state, &request, cancel).await {
            Ok(next) => {
                *state = next;
                self.set_phase(SyncPhase::Synced);
                self.report_outcomes(state, &request);
                Ok(())
            }
            Err(e) => {
                warn!("Sync failed, keeping previous state: {}", e);
                self.set_phase(previous);
                Err(e)
            }
        }
    }

    /// One request/response round trip, producing the next snapshot
    async fn exchange(
        &self,
        state: &Snapshot,
        request: &SyncRequest,
        cancel: &CancellationToken,
    ) -> SyncResult<Snapshot> {
        debug!(
            "Sending {} sync with {} command(s)",
            if request.is_full() { "full" } else { "incremental" },
            request.commands.len()
        );

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SyncError::Cancelled),
            result = self.transport.execute(request) => result?,
        };

        // The server may answer an incremental request with everything
        let full = request.is_full() || response.full_sync;
        if full && !request.is_full() {
            info!("Server sent a full sync, replacing local state");
        }
        let delta = Snapshot::from_response(response);
        if full {
            merge::replace(delta)
        } else {
            merge::merge(state, &delta)
        }
    }

    fn report_outcomes(&self, state: &Snapshot, request: &SyncRequest) {
        for command in &request.commands {
            if let Some(CommandStatus::Failed(err)) = state.outcome(&command.uuid) {
                warn!(
                    "Command {} ({}) rejected: {} (code {})",
                    command.command_type(),
                    command.uuid,
                    err.error,
                    err.error_code
                );
            }
        }
        info!(
            "Sync complete: token={}, items={}, projects={}, labels={}",
            state.sync_token().unwrap_or("-"),
            state.items.len(),
            state.projects.len(),
            state.labels.len()
        );
    }

    fn set_phase(&self, phase: SyncPhase) {
        self.phase.send_replace(phase);
    }

    /// Sync a single command and turn its outcome into a result
    async fn submit(&self, cancel: &CancellationToken, command: Command) -> SyncResult<Snapshot> {
        let snapshot = self.sync(cancel, vec![command.clone()]).await?;
        snapshot.command_result(&command)?;
        Ok(snapshot)
    }

    /// Submit a creating command and return the permanent ID it was given
    async fn create(
        &self,
        cancel: &CancellationToken,
        command: Command,
    ) -> SyncResult<(Snapshot, String)> {
        let temp_id = command.temp_id.clone().ok_or_else(|| {
            SyncError::validation(format!("{} requires a temp ID", command.command_type()))
        })?;
        let snapshot = self.submit(cancel, command).await?;
        let id = snapshot
            .resolve_temp_id(&temp_id)
            .map(str::to_string)
            .ok_or(SyncError::TempIdUnresolved { temp_id })?;
        Ok((snapshot, id))
    }

    // ==================== Task Operations ====================

    /// Create a task
    pub async fn add_task(&self, cancel: &CancellationToken, args: AddItemArgs) -> SyncResult<Item> {
        self.create_task(cancel, Command::new(CommandArgs::ItemAdd(args))?)
            .await
    }

    /// Create a task from a prepared `item_add` command
    ///
    /// Retrying with the same command value is safe.
    pub async fn create_task(&self, cancel: &CancellationToken, command: Command) -> SyncResult<Item> {
        expect_type(&command, "item_add")?;
        let (snapshot, id) = self.create(cancel, command).await?;
        snapshot
            .item(&id)
            .cloned()
            .ok_or(SyncError::EntityNotFound { kind: "task", id })
    }

    /// Apply an update patch to a task
    pub async fn update_task(
        &self,
        cancel: &CancellationToken,
        args: UpdateItemArgs,
    ) -> SyncResult<Item> {
        let id = args.id.clone();
        let snapshot = self
            .submit(cancel, Command::new(CommandArgs::ItemUpdate(args))?)
            .await?;
        snapshot
            .item(&id)
            .cloned()
            .ok_or(SyncError::EntityNotFound { kind: "task", id })
    }

    /// Update a task from edited form values, sending only what changed
    pub async fn edit_task(
        &self,
        cancel: &CancellationToken,
        id: &str,
        form: &ItemForm,
        tz: &dyn TimeZoneProvider,
    ) -> SyncResult<Item> {
        let patch = {
            let state = self.state.lock().await;
            let baseline = state.item(id).ok_or_else(|| SyncError::EntityNotFound {
                kind: "task",
                id: id.to_string(),
            })?;
            diff(baseline, form, tz)?
        };
        if patch.is_noop() {
            debug!("Task {} unchanged, nothing to send", id);
        }
        self.update_task(cancel, patch).await
    }

    /// Delete a task
    pub async fn delete_task(&self, cancel: &CancellationToken, id: &str) -> SyncResult<()> {
        self.submit(cancel, Command::new(CommandArgs::ItemDelete(TargetArgs::new(id)))?)
            .await?;
        Ok(())
    }

    /// Mark a task as done
    pub async fn complete_task(&self, cancel: &CancellationToken, id: &str) -> SyncResult<Item> {
        self.target_task(cancel, CommandArgs::ItemClose(TargetArgs::new(id)))
            .await
    }

    /// Reopen a completed task
    pub async fn uncomplete_task(&self, cancel: &CancellationToken, id: &str) -> SyncResult<Item> {
        self.target_task(cancel, CommandArgs::ItemUncomplete(TargetArgs::new(id)))
            .await
    }

    async fn target_task(&self, cancel: &CancellationToken, args: CommandArgs) -> SyncResult<Item> {
        let id = args.target_id().unwrap_or_default().to_string();
        let snapshot = self.submit(cancel, Command::new(args)?).await?;
        snapshot
            .item(&id)
            .cloned()
            .ok_or(SyncError::EntityNotFound { kind: "task", id })
    }

    // ==================== Project Operations ====================

    /// Create a project
    pub async fn add_project(
        &self,
        cancel: &CancellationToken,
        args: AddProjectArgs,
    ) -> SyncResult<Project> {
        self.create_project(cancel, Command::new(CommandArgs::ProjectAdd(args))?)
            .await
    }

    /// Create a project from a prepared `project_add` command
    pub async fn create_project(
        &self,
        cancel: &CancellationToken,
        command: Command,
    ) -> SyncResult<Project> {
        expect_type(&command, "project_add")?;
        let (snapshot, id) = self.create(cancel, command).await?;
        snapshot
            .project(&id)
            .cloned()
            .ok_or(SyncError::EntityNotFound { kind: "project", id })
    }

    pub async fn update_project(
        &self,
        cancel: &CancellationToken,
        args: UpdateProjectArgs,
    ) -> SyncResult<Project> {
        let id = args.id.clone();
        let snapshot = self
            .submit(cancel, Command::new(CommandArgs::ProjectUpdate(args))?)
            .await?;
        snapshot
            .project(&id)
            .cloned()
            .ok_or(SyncError::EntityNotFound { kind: "project", id })
    }

    pub async fn archive_project(&self, cancel: &CancellationToken, id: &str) -> SyncResult<()> {
        self.submit(
            cancel,
            Command::new(CommandArgs::ProjectArchive(TargetArgs::new(id)))?,
        )
        .await?;
        Ok(())
    }

    // ==================== Label Operations ====================

    pub async fn add_label(&self, cancel: &CancellationToken, args: AddLabelArgs) -> SyncResult<Label> {
        let command = Command::new(CommandArgs::LabelAdd(args))?;
        let (snapshot, id) = self.create(cancel, command).await?;
        snapshot
            .label(&id)
            .cloned()
            .ok_or(SyncError::EntityNotFound { kind: "label", id })
    }
}

fn expect_type(command: &Command, command_type: &str) -> SyncResult<()> {
    if command.command_type() != command_type {
        return Err(SyncError::validation(format!(
            "expected a {} command, got {}",
            command_type,
            command.command_type()
        )));
    }
    Ok(())
}
