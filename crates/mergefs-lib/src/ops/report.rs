use std::fmt;
use std::path::PathBuf;

use super::copy_counts;
use crate::manager::{DatastoreManager, StoreId};

/// One line of the replica report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyReport {
    pub path: PathBuf,
    pub count: usize,
    /// Roots of the stores holding a regular copy, in store order.
    pub holders: Vec<PathBuf>,
}

impl fmt::Display for CopyReport {
    /// `<count>\t<path>\t<store,store,...>`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}\t", self.count, self.path.display())?;
        for (i, holder) in self.holders.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", holder.display())?;
        }
        Ok(())
    }
}

/// Replica counts for every file in `stores`, sorted by path.
///
/// With `below = Some(n)` only files held by fewer than `n` stores are kept.
pub fn report_copies(
    manager: &DatastoreManager,
    stores: &[StoreId],
    below: Option<usize>,
) -> Vec<CopyReport> {
    copy_counts(manager, stores)
        .into_iter()
        .filter(|(_, copies)| below.map_or(true, |n| copies.count < n))
        .map(|(path, copies)| CopyReport {
            path,
            count: copies.count,
            holders: copies
                .holders
                .iter()
                .map(|&id| manager.get(id).root().to_path_buf())
                .collect(),
        })
        .collect()
}
