//! Folding sync responses into a snapshot
//!
//! The server only returns entities that changed since the token the client
//! sent, so a delta is authoritative per entity: each entity it contains
//! replaces the base entry with the same ID, everything else is carried over.
//! Soft-deleted and archived entities stay in the maps so references to them
//! keep resolving; hiding them is up to whoever renders the snapshot.
//!
//! Merge is not commutative. Two deltas touching the same ID must be applied
//! in the order the server emitted them.

use std::collections::BTreeMap;

use tracing::debug;

use super::error::{SyncError, SyncResult};
use super::snapshot::Snapshot;

/// Fold `delta` into `base`
///
/// Fails with [`SyncError::TempIdUnresolved`] when a temp ID in the delta
/// maps to an ID that the merged snapshot does not contain; the merged
/// result is discarded in that case.
pub fn merge(base: &Snapshot, delta: &Snapshot) -> SyncResult<Snapshot> {
    let mut merged = base.clone();

    overlay(&mut merged.items, &delta.items);
    overlay(&mut merged.projects, &delta.projects);
    overlay(&mut merged.labels, &delta.labels);

    if delta.sync_token.is_some() {
        merged.sync_token = delta.sync_token.clone();
    }
    merged.temp_id_mapping = delta.temp_id_mapping.clone();
    merged.command_outcomes = delta.command_outcomes.clone();

    check_temp_ids(&merged)?;

    debug!(
        "Merged delta: items={}, projects={}, labels={} (totals {}/{}/{})",
        delta.items.len(),
        delta.projects.len(),
        delta.labels.len(),
        merged.items.len(),
        merged.projects.len(),
        merged.labels.len()
    );

    Ok(merged)
}

/// Install a full-sync response in place of whatever was held before
pub fn replace(full: Snapshot) -> SyncResult<Snapshot> {
    check_temp_ids(&full)?;
    Ok(full)
}

fn overlay<T: Clone>(base: &mut BTreeMap<String, T>, delta: &BTreeMap<String, T>) {
    for (id, entity) in delta {
        base.insert(id.clone(), entity.clone());
    }
}

/// Every permanent ID in the mapping must name an entity we now hold
fn check_temp_ids(snapshot: &Snapshot) -> SyncResult<()> {
    let mut pairs: Vec<(&String, &String)> = snapshot.temp_id_mapping.iter().collect();
    pairs.sort();

    for (temp_id, id) in pairs {
        let known = snapshot.items.contains_key(id)
            || snapshot.projects.contains_key(id)
            || snapshot.labels.contains_key(id);
        if !known {
            return Err(SyncError::TempIdUnresolved {
                temp_id: temp_id.clone(),
            });
        }
    }
    Ok(())
}
