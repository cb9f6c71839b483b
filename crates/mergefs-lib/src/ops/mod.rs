//! Reconciliation operations over a [`DatastoreManager`](crate::manager::DatastoreManager).
//!
//! - [`distribute`]: move staged files out of the merge directory, leaving symlinks
//! - [`fixup`]: add missing symlinks for files that only exist in a store
//! - [`unused`]: list store files nothing in the merge directory points at
//! - [`copy_counts`] / [`balance`]: count replicas and add one where short
//! - [`report_copies`]: replica counts as printable lines, optionally only short files
//!
//! A missing placement is reported and skipped; a failed physical action
//! aborts the run and leaves already processed files as they are.

mod balance;
mod distribute;
mod fixup;
mod report;
mod unused;

pub use balance::{balance, copy_counts, CopyCount};
pub use distribute::distribute;
pub use fixup::{fixup, FixupReport};
pub use report::{report_copies, CopyReport};
pub use unused::unused;

use std::path::PathBuf;

/// A file written to a new location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placed {
    /// Path relative to the datastore roots.
    pub path: PathBuf,
    /// Absolute path of the new copy.
    pub target: PathBuf,
}

/// A file left alone because no datastore had room for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub path: PathBuf,
    pub size_kb: i64,
}

/// Outcome of [`distribute`] and [`balance`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PlacementReport {
    pub placed: Vec<Placed>,
    pub skipped: Vec<Skipped>,
}
