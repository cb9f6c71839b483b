use std::path::PathBuf;

use log::{info, warn};

use super::{Placed, PlacementReport, Skipped};
use crate::error::Result;
use crate::manager::{DatastoreManager, StoreId};
use crate::placement::select_datastore;

/// Move every regular file staged in the merge directory into the store with
/// the most free space, replacing it with a symlink to its new home.
///
/// Only files present before the run starts are considered. Stores that
/// already have something at the same relative path are not candidates.
pub fn distribute(manager: &mut DatastoreManager, targets: &[StoreId]) -> Result<PlacementReport> {
    let merge = manager.merge_dir()?;
    let staged: Vec<PathBuf> = manager
        .get(merge)
        .inventory()
        .files()
        .iter()
        .cloned()
        .collect();

    let mut report = PlacementReport::default();

    for rel in staged {
        let size_kb = manager.size_kb(merge, &rel)?;
        let candidates = targets
            .iter()
            .map(|&id| (id, manager.get(id)))
            .filter(|(_, store)| store.can_receive(&rel));
        let chosen = select_datastore(candidates, size_kb);

        let Some(target) = chosen else {
            warn!(
                "Couldn't get appropriate store for file: {} ({} KB)",
                rel.display(),
                size_kb
            );
            report.skipped.push(Skipped { path: rel, size_kb });
            continue;
        };

        let (_, new_path) = manager.transfer(&rel, merge, target, true)?;
        manager.link(merge, &rel, &new_path)?;
        info!("{} -> {}", rel.display(), new_path.display());

        report.placed.push(Placed {
            path: rel,
            target: new_path,
        });
    }

    Ok(report)
}
