use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::error::Result;
use crate::manager::{DatastoreManager, StoreId};

/// Absolute paths of store files no merge-directory symlink refers to.
///
/// A file is in use when some link in the merge directory resolves to it,
/// wherever that link sits, or when a link occupies the same relative path
/// (replicas of a linked file). Nothing is modified.
pub fn unused(manager: &DatastoreManager, stores: &[StoreId]) -> Result<Vec<PathBuf>> {
    let merge = manager.get(manager.merge_dir()?);
    let referenced: BTreeSet<PathBuf> = merge.resolved_symlink_targets();

    Ok(stores
        .iter()
        .map(|&id| manager.get(id))
        .flat_map(|store| {
            let referenced = &referenced;
            store
                .inventory()
                .files()
                .iter()
                .filter(move |rel| !merge.has_symlink(rel))
                .map(move |rel| store.abs_path(rel))
                .filter(move |abs| !referenced.contains(abs))
        })
        .collect())
}
