//! Local mirror of server state
//!
//! A [`Snapshot`] holds the sync token and the mirrored collections, keyed by
//! server ID. Callers read it freely but only the merge functions in
//! [`super::merge`] produce new snapshots, so collections and token always
//! come from a server response.
//!
//! The temp ID mapping and command outcomes describe the most recent exchange
//! only and are never persisted.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::command::Command;
use super::error::{SyncError, SyncResult};
use super::transport::{CommandStatus, SyncResponse};
use crate::models::{Item, Label, Project};

/// The client's mirror of server-side collections
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub(crate) sync_token: Option<String>,
    #[serde(default)]
    pub(crate) items: BTreeMap<String, Item>,
    #[serde(default)]
    pub(crate) projects: BTreeMap<String, Project>,
    #[serde(default)]
    pub(crate) labels: BTreeMap<String, Label>,
    #[serde(skip)]
    pub(crate) temp_id_mapping: HashMap<String, String>,
    #[serde(skip)]
    pub(crate) command_outcomes: HashMap<String, CommandStatus>,
}

impl Snapshot {
    /// Build a snapshot holding exactly what a response contains
    pub fn from_response(response: SyncResponse) -> Self {
        Self {
            sync_token: response.sync_token,
            items: keyed(response.items, |i| &i.id),
            projects: keyed(response.projects, |p| &p.id),
            labels: keyed(response.labels, |l| &l.id),
            temp_id_mapping: response.temp_id_mapping,
            command_outcomes: response.sync_status,
        }
    }

    /// Last token received from the server, `None` before the first sync
    pub fn sync_token(&self) -> Option<&str> {
        self.sync_token.as_deref()
    }

    /// True when nothing has been synced yet
    pub fn is_empty(&self) -> bool {
        self.sync_token.is_none()
            && self.items.is_empty()
            && self.projects.is_empty()
            && self.labels.is_empty()
    }

    // ==================== Lookups ====================

    pub fn item(&self, id: &str) -> Option<&Item> {
        self.items.get(id)
    }

    pub fn project(&self, id: &str) -> Option<&Project> {
        self.projects.get(id)
    }

    pub fn label(&self, id: &str) -> Option<&Label> {
        self.labels.get(id)
    }

    /// All items, including deleted and completed ones
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.projects.values()
    }

    pub fn labels(&self) -> impl Iterator<Item = &Label> {
        self.labels.values()
    }

    /// Open tasks in display order
    pub fn active_items(&self) -> Vec<&Item> {
        let mut items: Vec<&Item> = self.items.values().filter(|i| i.is_active()).collect();
        items.sort_by(|a, b| {
            a.child_order
                .cmp(&b.child_order)
                .then_with(|| a.id.cmp(&b.id))
        });
        items
    }

    /// Open tasks of one project in display order
    pub fn items_in_project(&self, project_id: &str) -> Vec<&Item> {
        self.active_items()
            .into_iter()
            .filter(|i| i.project_id.as_deref() == Some(project_id))
            .collect()
    }

    /// Projects that are neither deleted nor archived, in display order
    pub fn active_projects(&self) -> Vec<&Project> {
        let mut projects: Vec<&Project> =
            self.projects.values().filter(|p| p.is_active()).collect();
        projects.sort_by(|a, b| {
            b.inbox_project
                .cmp(&a.inbox_project)
                .then_with(|| a.child_order.cmp(&b.child_order))
                .then_with(|| a.id.cmp(&b.id))
        });
        projects
    }

    pub fn active_labels(&self) -> Vec<&Label> {
        let mut labels: Vec<&Label> = self.labels.values().filter(|l| !l.is_deleted).collect();
        labels.sort_by(|a, b| a.item_order.cmp(&b.item_order).then_with(|| a.name.cmp(&b.name)));
        labels
    }

    /// Find an active project by name, ignoring case
    pub fn project_by_name(&self, name: &str) -> Option<&Project> {
        self.projects
            .values()
            .filter(|p| p.is_active())
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Names of all labels that are not deleted
    pub fn label_names(&self) -> Vec<&str> {
        self.active_labels().into_iter().map(|l| l.name.as_str()).collect()
    }

    // ==================== Last exchange ====================

    /// Temp ID to permanent ID mapping from the most recent exchange
    pub fn temp_id_mapping(&self) -> &HashMap<String, String> {
        &self.temp_id_mapping
    }

    /// Permanent ID assigned to `temp_id` in the most recent exchange
    pub fn resolve_temp_id(&self, temp_id: &str) -> Option<&str> {
        self.temp_id_mapping.get(temp_id).map(String::as_str)
    }

    /// Outcomes of the commands submitted in the most recent exchange
    pub fn outcomes(&self) -> &HashMap<String, CommandStatus> {
        &self.command_outcomes
    }

    /// Outcome of a single command
    pub fn outcome(&self, uuid: &str) -> Option<&CommandStatus> {
        self.command_outcomes.get(uuid)
    }

    /// UUIDs and server errors of commands that were rejected
    pub fn failed_outcomes(&self) -> Vec<(&str, &CommandStatus)> {
        let mut failed: Vec<(&str, &CommandStatus)> = self
            .command_outcomes
            .iter()
            .filter(|(_, status)| !status.is_ok())
            .map(|(uuid, status)| (uuid.as_str(), status))
            .collect();
        failed.sort_by_key(|(uuid, _)| *uuid);
        failed
    }

    /// Turn the recorded outcome of `command` into a result
    pub fn command_result(&self, command: &Command) -> SyncResult<()> {
        match self.command_outcomes.get(&command.uuid) {
            Some(CommandStatus::Ok) => Ok(()),
            Some(CommandStatus::Failed(err)) => Err(SyncError::Command {
                command_type: command.command_type().to_string(),
                uuid: command.uuid.clone(),
                code: err.error_code,
                message: err.error.clone(),
            }),
            None => Err(SyncError::decode(format!(
                "no sync_status entry for {} command {}",
                command.command_type(),
                command.uuid
            ))),
        }
    }
}

fn keyed<T>(entities: Vec<T>, id: impl Fn(&T) -> &String) -> BTreeMap<String, T> {
    entities
        .into_iter()
        .map(|entity| (id(&entity).clone(), entity))
        .collect()
}
