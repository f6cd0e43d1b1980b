//! Label command handlers

use anyhow::Result;

use taskmirror_core::sync::AddLabelArgs;

use crate::commands::{failed, Session};
use crate::output::Output;

/// Create a label
pub async fn add(
    session: &Session,
    name: String,
    color: Option<String>,
    output: &Output,
) -> Result<()> {
    let args = AddLabelArgs {
        name,
        color,
        ..AddLabelArgs::default()
    };
    let label = session
        .client
        .add_label(&session.cancel, args)
        .await
        .map_err(failed)?;

    output.success(&format!("Created label: {}", label.name));
    Ok(())
}

/// List labels
pub async fn list(session: &Session, output: &Output) -> Result<()> {
    let snapshot = session.refresh(output).await;
    output.print_labels(&snapshot.active_labels());
    Ok(())
}
