use std::collections::BTreeMap;
use std::path::PathBuf;

use log::{debug, info, warn};

use super::{Placed, PlacementReport, Skipped};
use crate::error::Result;
use crate::manager::{DatastoreManager, StoreId};
use crate::placement::select_datastore;

/// Stores holding a regular copy of one relative path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyCount {
    pub count: usize,
    pub holders: Vec<StoreId>,
}

/// Map every relative path found in `stores` to the stores holding it.
pub fn copy_counts(manager: &DatastoreManager, stores: &[StoreId]) -> BTreeMap<PathBuf, CopyCount> {
    let mut counts: BTreeMap<PathBuf, CopyCount> = BTreeMap::new();

    for &id in stores {
        for rel in manager.get(id).inventory().files() {
            let entry = counts.entry(rel.clone()).or_insert_with(|| CopyCount {
                count: 0,
                holders: Vec::new(),
            });
            entry.count += 1;
            entry.holders.push(id);
        }
    }

    counts
}

/// Add one copy of every file held by fewer than `min_copies` stores.
///
/// A single pass raises each short file by at most one replica; run it again
/// to converge further. New copies go to the store with the most free space
/// among those with nothing at that path yet; a store holding a symlink
/// there is never written through.
pub fn balance(
    manager: &mut DatastoreManager,
    stores: &[StoreId],
    min_copies: usize,
) -> Result<PlacementReport> {
    let mut report = PlacementReport::default();

    for (rel, copies) in copy_counts(manager, stores) {
        if copies.count >= min_copies {
            continue;
        }
        let source = copies.holders[0];
        let size_kb = manager.size_kb(source, &rel)?;
        debug!(
            "{} has {} of {} copies ({} KB)",
            rel.display(),
            copies.count,
            min_copies,
            size_kb
        );

        let candidates = stores
            .iter()
            .copied()
            .filter(|&id| manager.get(id).can_receive(&rel))
            .map(|id| (id, manager.get(id)));

        let Some(target) = select_datastore(candidates, size_kb) else {
            warn!(
                "No store can take another copy of {} ({} KB)",
                rel.display(),
                size_kb
            );
            report.skipped.push(Skipped { path: rel, size_kb });
            continue;
        };

        let (from, to) = manager.transfer(&rel, source, target, false)?;
        info!("copy {} -> {}", from.display(), to.display());
        report.placed.push(Placed {
            path: rel,
            target: to,
        });
    }

    Ok(report)
}
