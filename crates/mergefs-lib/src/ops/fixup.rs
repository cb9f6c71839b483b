use std::path::PathBuf;

use log::{debug, info, warn};

use super::Placed;
use crate::error::Result;
use crate::manager::{DatastoreManager, StoreId};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FixupReport {
    /// Symlinks created in the merge directory.
    pub linked: Vec<Placed>,
    /// Paths left alone because the merge directory holds a regular file there.
    pub blocked: Vec<PathBuf>,
}

/// Create a merge-directory symlink for every store file that has none.
///
/// Stores are visited in the order given; when several hold the same path the
/// first one gets the link. Running it again changes nothing.
pub fn fixup(manager: &mut DatastoreManager, stores: &[StoreId]) -> Result<FixupReport> {
    let merge = manager.merge_dir()?;
    let mut report = FixupReport::default();

    for &id in stores {
        let files: Vec<PathBuf> = manager.get(id).inventory().files().iter().cloned().collect();

        for rel in files {
            let mergedir = manager.get(merge);
            if mergedir.has_symlink(&rel) {
                continue;
            }
            if mergedir.has_file(&rel) {
                warn!(
                    "Not linking {}: a regular file is staged there in the merge directory",
                    rel.display()
                );
                report.blocked.push(rel);
                continue;
            }

            let target = manager.get(id).abs_path(&rel);
            debug!("missing link for {}", target.display());
            manager.link(merge, &rel, &target)?;
            info!("symlink {} -> {}", rel.display(), target.display());

            report.linked.push(Placed { path: rel, target });
        }
    }

    Ok(report)
}
