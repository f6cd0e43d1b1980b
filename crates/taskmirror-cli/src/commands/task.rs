//! Task command handlers

use anyhow::{anyhow, bail, Context, Result};
use chrono::{NaiveDate, NaiveDateTime};

use taskmirror_core::sync::{AddItemArgs, DueDateInput, ItemForm, SystemTimeZone};
use taskmirror_core::{DueDate, Priority, Snapshot};

use crate::commands::{failed, Session};
use crate::output::Output;

/// Options of `task add`
pub struct AddOptions {
    pub content: String,
    pub description: Option<String>,
    pub project: Option<String>,
    pub labels: Vec<String>,
    pub priority: Option<String>,
    pub due: Option<String>,
}

/// Options of `task edit`; unset fields keep their current value
#[derive(Default)]
pub struct EditOptions {
    pub content: Option<String>,
    pub description: Option<String>,
    pub labels: Option<Vec<String>>,
    pub priority: Option<String>,
    /// Natural-language due date
    pub due: Option<String>,
    /// `YYYY-MM-DD`
    pub due_date: Option<String>,
    /// `YYYY-MM-DD HH:MM` in local time
    pub due_time: Option<String>,
    pub no_due: bool,
}

/// Create a task
pub async fn add(session: &Session, opts: AddOptions, output: &Output) -> Result<()> {
    let snapshot = session.refresh(output).await;

    let mut args = AddItemArgs::new(opts.content);
    args.description = opts.description.unwrap_or_default();
    args.project_id = opts
        .project
        .map(|p| resolve_project(&snapshot, &p))
        .transpose()?;
    args.labels = opts.labels;
    args.priority = opts.priority.as_deref().map(parse_priority).transpose()?;
    args.due = opts.due.map(DueDate::natural);

    let item = session
        .client
        .add_task(&session.cancel, args)
        .await
        .map_err(failed)?;

    output.success(&format!("Created task: {}", item.id));
    output.print_item(&item, &session.client.snapshot().await);
    Ok(())
}

/// List open tasks
pub async fn list(
    session: &Session,
    project: Option<String>,
    label: Option<String>,
    output: &Output,
) -> Result<()> {
    let snapshot = session.refresh(output).await;

    let mut items = match project {
        Some(p) => snapshot.items_in_project(&resolve_project(&snapshot, &p)?),
        None => snapshot.active_items(),
    };
    if let Some(label) = label {
        items.retain(|i| i.has_label(&label));
    }

    output.print_items(&items, &snapshot);
    Ok(())
}

/// Show a single task
pub async fn show(session: &Session, id: String, output: &Output) -> Result<()> {
    let snapshot = session.refresh(output).await;
    let item = snapshot
        .item(&id)
        .ok_or_else(|| anyhow!("Task not found: {}", id))?;

    output.print_item(item, &snapshot);
    Ok(())
}

/// Edit a task, sending only the fields that changed
pub async fn edit(session: &Session, id: String, opts: EditOptions, output: &Output) -> Result<()> {
    let snapshot = session.refresh(output).await;
    let baseline = snapshot
        .item(&id)
        .ok_or_else(|| anyhow!("Task not found: {}", id))?;

    let tz = SystemTimeZone;
    let mut form = ItemForm::from_item(baseline, &tz);
    apply_edits(&mut form, opts)?;

    let item = session
        .client
        .edit_task(&session.cancel, &id, &form, &tz)
        .await
        .map_err(failed)?;

    output.success(&format!("Updated task: {}", item.id));
    output.print_item(&item, &session.client.snapshot().await);
    Ok(())
}

/// Mark a task as done
pub async fn done(session: &Session, id: String, output: &Output) -> Result<()> {
    let item = session
        .client
        .complete_task(&session.cancel, &id)
        .await
        .map_err(failed)?;
    output.success(&format!("Completed: {}", item.content));
    Ok(())
}

/// Reopen a completed task
pub async fn undo(session: &Session, id: String, output: &Output) -> Result<()> {
    let item = session
        .client
        .uncomplete_task(&session.cancel, &id)
        .await
        .map_err(failed)?;
    output.success(&format!("Reopened: {}", item.content));
    Ok(())
}

/// Delete a task
pub async fn delete(session: &Session, id: String, output: &Output) -> Result<()> {
    session
        .client
        .delete_task(&session.cancel, &id)
        .await
        .map_err(failed)?;
    output.success(&format!("Deleted task: {}", id));
    Ok(())
}

fn apply_edits(form: &mut ItemForm, opts: EditOptions) -> Result<()> {
    if let Some(content) = opts.content {
        form.content = content;
    }
    if let Some(description) = opts.description {
        form.description = description;
    }
    if let Some(labels) = opts.labels {
        form.labels = labels;
    }
    if let Some(priority) = opts.priority {
        form.priority = Some(parse_priority(&priority)?);
    }

    let due_options = [
        opts.due.is_some(),
        opts.due_date.is_some(),
        opts.due_time.is_some(),
        opts.no_due,
    ];
    if due_options.iter().filter(|set| **set).count() > 1 {
        bail!("Use only one of --due, --due-date, --due-time and --no-due");
    }

    if let Some(text) = opts.due {
        form.due = DueDateInput::natural(text);
    } else if let Some(date) = opts.due_date {
        let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
            .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", date))?;
        form.due = DueDateInput::date(date);
    } else if let Some(time) = opts.due_time {
        let local = NaiveDateTime::parse_from_str(&time, "%Y-%m-%d %H:%M")
            .with_context(|| format!("Invalid date-time '{}', expected YYYY-MM-DD HH:MM", time))?;
        form.due = DueDateInput::date_time(local);
    } else if opts.no_due {
        form.due = DueDateInput::none();
        form.clear_due = true;
    }
    Ok(())
}

/// Accept "p1".."p4" or the API value 1..4
fn parse_priority(value: &str) -> Result<Priority> {
    Priority::from_label(value)
        .or_else(|| value.parse::<u8>().ok().and_then(Priority::new))
        .ok_or_else(|| anyhow!("Invalid priority '{}', expected p1..p4", value))
}

/// Find a project by ID or (case-insensitive) name
pub fn resolve_project(snapshot: &Snapshot, id_or_name: &str) -> Result<String> {
    if let Some(project) = snapshot.project(id_or_name) {
        return Ok(project.id.clone());
    }
    snapshot
        .project_by_name(id_or_name)
        .map(|p| p.id.clone())
        .ok_or_else(|| anyhow!("Project not found: {}", id_or_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskmirror_core::sync::SyncResponse;
    use taskmirror_core::Item;

    fn snapshot() -> Snapshot {
        let response: SyncResponse = serde_json::from_str(
            r#"{
                "sync_token": "t",
                "projects": [
                    {"id": "100", "name": "Inbox", "inbox_project": true},
                    {"id": "200", "name": "Work"}
                ]
            }"#,
        )
        .unwrap();
        Snapshot::from_response(response)
    }

    #[test]
    fn test_parse_priority() {
        assert_eq!(parse_priority("p1").unwrap(), Priority::P1);
        assert_eq!(parse_priority("P4").unwrap(), Priority::P4);
        assert_eq!(parse_priority("4").unwrap(), Priority::P1);
        assert!(parse_priority("urgent").is_err());
        assert!(parse_priority("0").is_err());
    }

    #[test]
    fn test_resolve_project() {
        let snapshot = snapshot();
        assert_eq!(resolve_project(&snapshot, "200").unwrap(), "200");
        assert_eq!(resolve_project(&snapshot, "work").unwrap(), "200");
        assert!(resolve_project(&snapshot, "Home").is_err());
    }

    #[test]
    fn test_apply_edits() {
        let item = Item::new("1", "old");
        let mut form = ItemForm::from_item(&item, &SystemTimeZone);

        apply_edits(
            &mut form,
            EditOptions {
                content: Some("new".into()),
                priority: Some("p2".into()),
                due_date: Some("2024-03-01".into()),
                ..EditOptions::default()
            },
        )
        .unwrap();
        assert_eq!(form.content, "new");
        assert_eq!(form.priority, Some(Priority::P2));
        assert_eq!(
            form.due,
            DueDateInput::date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
        );
    }

    #[test]
    fn test_apply_edits_rejects_conflicting_due() {
        let mut form = ItemForm::default();
        let result = apply_edits(
            &mut form,
            EditOptions {
                due: Some("tomorrow".into()),
                no_due: true,
                ..EditOptions::default()
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_no_due_requests_clear() {
        let mut form = ItemForm::default();
        apply_edits(
            &mut form,
            EditOptions {
                no_due: true,
                ..EditOptions::default()
            },
        )
        .unwrap();
        assert!(form.clear_due);
        assert!(!form.due.has_due_date);
    }
}
