//! Mutation commands
//!
//! A [`Command`] is one intended mutation sent with a sync call. Its payload
//! is a closed set of variants ([`CommandArgs`]) so encoding and validation
//! are exhaustive matches.
//!
//! Every command carries an idempotency key (`uuid`). Retrying a failed call
//! must re-send the same `Command` value: the server treats a repeated key as
//! a no-op, so regenerating it would create duplicates.

use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;
use uuid::Uuid;

use super::error::{SyncError, SyncResult};
use crate::models::{DueDate, ItemDuration, Priority};

/// Arguments of `item_add`
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct AddItemArgs {
    pub content: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<DueDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child_order: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<ItemDuration>,
    /// Let the server extract `@label` references from the content
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub auto_parse_labels: bool,
}

impl AddItemArgs {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }
}

/// Due date change inside an update
///
/// `Clear` serializes as `null`, which the server reads as "remove the due
/// date". Leaving `UpdateItemArgs::due` as `None` leaves it untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum DuePatch {
    Set(DueDate),
    Clear,
}

impl Serialize for DuePatch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DuePatch::Set(due) => due.serialize(serializer),
            DuePatch::Clear => serializer.serialize_none(),
        }
    }
}

/// Arguments of `item_update`
///
/// Only fields that are `Some` are sent; an omitted field means "leave as is"
/// while a present empty value is an explicit clear.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct UpdateItemArgs {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<DuePatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collapsed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<ItemDuration>,
}

impl UpdateItemArgs {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// True when nothing besides the target ID would be sent
    pub fn is_noop(&self) -> bool {
        self.content.is_none()
            && self.description.is_none()
            && self.due.is_none()
            && self.priority.is_none()
            && self.labels.is_none()
            && self.collapsed.is_none()
            && self.duration.is_none()
    }
}

/// Arguments of `project_add`
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct AddProjectArgs {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child_order: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_favorite: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_style: Option<String>,
}

impl AddProjectArgs {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Arguments of `project_update`
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct UpdateProjectArgs {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collapsed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_favorite: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_style: Option<String>,
}

/// Arguments of `label_add`
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct AddLabelArgs {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_order: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_favorite: Option<bool>,
}

/// Arguments of commands that only address an existing entity
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TargetArgs {
    pub id: String,
}

impl TargetArgs {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Payload of a command, one variant per command type
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum CommandArgs {
    ItemAdd(AddItemArgs),
    ItemUpdate(UpdateItemArgs),
    ItemDelete(TargetArgs),
    ItemClose(TargetArgs),
    ItemUncomplete(TargetArgs),
    ProjectAdd(AddProjectArgs),
    ProjectUpdate(UpdateProjectArgs),
    ProjectArchive(TargetArgs),
    LabelAdd(AddLabelArgs),
}

impl CommandArgs {
    /// Wire tag of the command
    pub fn command_type(&self) -> &'static str {
        match self {
            CommandArgs::ItemAdd(_) => "item_add",
            CommandArgs::ItemUpdate(_) => "item_update",
            CommandArgs::ItemDelete(_) => "item_delete",
            CommandArgs::ItemClose(_) => "item_close",
            CommandArgs::ItemUncomplete(_) => "item_uncomplete",
            CommandArgs::ProjectAdd(_) => "project_add",
            CommandArgs::ProjectUpdate(_) => "project_update",
            CommandArgs::ProjectArchive(_) => "project_archive",
            CommandArgs::LabelAdd(_) => "label_add",
        }
    }

    /// Whether the command creates a new entity (and so needs a temp ID)
    pub fn creates_entity(&self) -> bool {
        matches!(
            self,
            CommandArgs::ItemAdd(_) | CommandArgs::ProjectAdd(_) | CommandArgs::LabelAdd(_)
        )
    }

    /// ID of the entity the command addresses, for non-creating commands
    pub fn target_id(&self) -> Option<&str> {
        match self {
            CommandArgs::ItemUpdate(args) => Some(&args.id),
            CommandArgs::ProjectUpdate(args) => Some(&args.id),
            CommandArgs::ItemDelete(t)
            | CommandArgs::ItemClose(t)
            | CommandArgs::ItemUncomplete(t)
            | CommandArgs::ProjectArchive(t) => Some(&t.id),
            CommandArgs::ItemAdd(_) | CommandArgs::ProjectAdd(_) | CommandArgs::LabelAdd(_) => {
                None
            }
        }
    }

    /// Check required fields before anything is sent
    pub fn validate(&self) -> SyncResult<()> {
        match self {
            CommandArgs::ItemAdd(args) => {
                require_text(&args.content, "cannot create a task with no content")?;
                check_priority(args.priority)
            }
            CommandArgs::ItemUpdate(args) => {
                require_text(&args.id, "task ID not specified when trying to update task")?;
                if let Some(content) = &args.content {
                    require_text(content, "cannot clear the content of a task")?;
                }
                check_priority(args.priority)
            }
            CommandArgs::ProjectAdd(args) => {
                require_text(&args.name, "cannot create a project with no name")
            }
            CommandArgs::ProjectUpdate(args) => {
                require_text(&args.id, "project ID not specified when trying to update project")?;
                if let Some(name) = &args.name {
                    require_text(name, "cannot clear the name of a project")?;
                }
                Ok(())
            }
            CommandArgs::LabelAdd(args) => {
                require_text(&args.name, "cannot create a label with no name")
            }
            CommandArgs::ItemDelete(t)
            | CommandArgs::ItemClose(t)
            | CommandArgs::ItemUncomplete(t)
            | CommandArgs::ProjectArchive(t) => require_text(
                &t.id,
                &format!("{} requires a target ID", self.command_type()),
            ),
        }
    }
}

fn require_text(value: &str, message: &str) -> SyncResult<()> {
    if value.trim().is_empty() {
        return Err(SyncError::validation(message));
    }
    Ok(())
}

fn check_priority(priority: Option<Priority>) -> SyncResult<()> {
    match priority {
        Some(p) if !p.is_valid() => Err(SyncError::validation(format!(
            "priority must be between 1 and 4, got {}",
            p.value()
        ))),
        _ => Ok(()),
    }
}

/// A single mutation to submit with a sync call
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// Idempotency key
    pub uuid: String,
    /// Client-side placeholder ID, only set on creating commands
    pub temp_id: Option<String>,
    pub args: CommandArgs,
}

impl Command {
    /// Build a validated command with fresh keys
    pub fn new(args: CommandArgs) -> SyncResult<Self> {
        args.validate()?;
        let temp_id = args
            .creates_entity()
            .then(|| Uuid::new_v4().to_string());
        Ok(Self {
            uuid: Uuid::new_v4().to_string(),
            temp_id,
            args,
        })
    }

    /// Override the idempotency key
    pub fn with_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.uuid = uuid.into();
        self
    }

    /// Override the temporary ID
    pub fn with_temp_id(mut self, temp_id: impl Into<String>) -> Self {
        self.temp_id = Some(temp_id.into());
        self
    }

    /// Wire tag of the command
    pub fn command_type(&self) -> &'static str {
        self.args.command_type()
    }
}

impl Serialize for Command {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.temp_id.is_some() { 4 } else { 3 };
        let mut state = serializer.serialize_struct("Command", len)?;
        state.serialize_field("type", self.command_type())?;
        if let Some(temp_id) = &self.temp_id {
            state.serialize_field("temp_id", temp_id)?;
        } else {
            state.skip_field("temp_id")?;
        }
        state.serialize_field("uuid", &self.uuid)?;
        state.serialize_field("args", &self.args)?;
        state.end()
    }
}
