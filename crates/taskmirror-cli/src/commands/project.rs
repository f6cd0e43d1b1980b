//! Project command handlers

use anyhow::Result;

use taskmirror_core::sync::{AddProjectArgs, UpdateProjectArgs};

use crate::commands::task::resolve_project;
use crate::commands::{failed, Session};
use crate::output::Output;

/// Create a project
pub async fn add(
    session: &Session,
    name: String,
    color: Option<String>,
    output: &Output,
) -> Result<()> {
    let mut args = AddProjectArgs::new(name);
    args.color = color;

    let project = session
        .client
        .add_project(&session.cancel, args)
        .await
        .map_err(failed)?;

    output.success(&format!("Created project: {}", project.name));
    output.print_project(&project);
    Ok(())
}

/// List active projects
pub async fn list(session: &Session, output: &Output) -> Result<()> {
    let snapshot = session.refresh(output).await;
    output.print_projects(&snapshot.active_projects(), &snapshot);
    Ok(())
}

/// Rename a project
pub async fn rename(
    session: &Session,
    project: String,
    name: String,
    output: &Output,
) -> Result<()> {
    let snapshot = session.refresh(output).await;
    let id = resolve_project(&snapshot, &project)?;

    let args = UpdateProjectArgs {
        id,
        name: Some(name),
        ..UpdateProjectArgs::default()
    };
    let project = session
        .client
        .update_project(&session.cancel, args)
        .await
        .map_err(failed)?;

    output.success(&format!("Renamed project to: {}", project.name));
    Ok(())
}

/// Archive a project
pub async fn archive(session: &Session, project: String, output: &Output) -> Result<()> {
    let snapshot = session.refresh(output).await;
    let id = resolve_project(&snapshot, &project)?;

    session
        .client
        .archive_project(&session.cancel, &id)
        .await
        .map_err(failed)?;

    output.success(&format!("Archived project: {}", project));
    Ok(())
}
