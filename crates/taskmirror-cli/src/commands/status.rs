//! Status command handler

use std::path::PathBuf;

use anyhow::{Context, Result};

use taskmirror_core::{Config, FileSnapshotStore, Snapshot, SnapshotStore};

use crate::output::{Output, OutputFormat};

/// Show configuration and local mirror status without touching the network
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    let store = FileSnapshotStore::from_config(&config);
    let snapshot = store.load()?.unwrap_or_default();
    let token_set = config.api_token.as_deref().is_some_and(|t| !t.is_empty());

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "base_url": config.base_url,
                    "api_token_set": token_set,
                    "snapshot_path": store.path(),
                    "sync_token": snapshot.sync_token(),
                    "counts": counts(&snapshot),
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", snapshot.sync_token().unwrap_or("-"));
        }
        OutputFormat::Human => {
            println!("taskmirror Status");
            println!("=================");
            println!();
            println!("Server:");
            println!("  API:   {}", config.base_url);
            println!(
                "  Token: {}",
                if token_set { "configured" } else { "(not set)" }
            );
            println!();
            println!("Local mirror:");
            println!("  Location:   {}", store.path().display());
            match snapshot.sync_token() {
                Some(token) => println!("  Sync token: {}", token),
                None => println!("  Never synced. Run `taskmirror sync`."),
            }
            println!();
            println!("Contents:");
            println!("  Open tasks: {}", snapshot.active_items().len());
            println!("  Projects:   {}", snapshot.active_projects().len());
            println!("  Labels:     {}", snapshot.active_labels().len());
        }
    }

    Ok(())
}

fn counts(snapshot: &Snapshot) -> serde_json::Value {
    serde_json::json!({
        "open_tasks": snapshot.active_items().len(),
        "tasks": snapshot.items().count(),
        "projects": snapshot.active_projects().len(),
        "labels": snapshot.active_labels().len(),
    })
}
