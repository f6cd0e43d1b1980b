//! Sync command handler

use anyhow::Result;

use crate::commands::{failed, Session};
use crate::output::Output;

/// Sync with the server
pub async fn sync(session: &Session, full: bool, output: &Output) -> Result<()> {
    let before = session.client.snapshot().await;
    let full = full || before.sync_token().is_none();

    output.message(if full {
        "Running full sync..."
    } else {
        "Syncing changes..."
    });

    let result = if full {
        session.client.full_sync(&session.cancel).await
    } else {
        session.client.sync(&session.cancel, Vec::new()).await
    };
    let snapshot = result.map_err(failed)?;

    if !full && before.sync_token() == snapshot.sync_token() {
        output.success("Sync complete - already up to date");
    } else {
        output.success("Sync complete");
    }
    output.message(&format!(
        "  Tasks: {}, Projects: {}, Labels: {}",
        snapshot.active_items().len(),
        snapshot.active_projects().len(),
        snapshot.active_labels().len()
    ));

    Ok(())
}
