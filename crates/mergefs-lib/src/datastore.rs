//! Datastores and their inventories.
//!
//! A datastore is scanned once, when it is opened. After that the
//! [`Inventory`] is a snapshot that the operations keep in step with every
//! physical action they issue; nothing rescans the disk during a run.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};
use std::rc::Rc;

use log::{debug, info};

use crate::actions::FsActions;
use crate::error::{ActionError, TransferError};
use crate::volume::Filesystem;

/// Approximate size in KB used for space accounting: rounded up, at least 1.
pub fn approx_size_kb(bytes: u64) -> i64 {
    let kb = bytes.div_ceil(1024).max(1);
    i64::try_from(kb).unwrap_or(i64::MAX)
}

/// Absolute path a symlink at `link` resolves to when it holds `target`.
///
/// Relative targets are taken from the link's directory. The result is
/// canonicalized when it exists, otherwise `.` and `..` are folded lexically.
pub fn resolve_link_target(link: &Path, target: &Path) -> PathBuf {
    let joined = match link.parent() {
        Some(parent) if target.is_relative() => parent.join(target),
        _ => target.to_path_buf(),
    };
    if let Ok(canonical) = std::fs::canonicalize(&joined) {
        return canonical;
    }

    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

/// Regular files and symlinks found under a datastore root, keyed by their
/// path relative to that root. A path is in at most one of the two.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Inventory {
    files: BTreeSet<PathBuf>,
    symlinks: BTreeMap<PathBuf, PathBuf>,
}

impl Inventory {
    pub fn files(&self) -> &BTreeSet<PathBuf> {
        &self.files
    }

    pub fn symlinks(&self) -> &BTreeMap<PathBuf, PathBuf> {
        &self.symlinks
    }

    pub fn insert_file(&mut self, rel: PathBuf) {
        self.symlinks.remove(&rel);
        self.files.insert(rel);
    }

    pub fn insert_symlink(&mut self, rel: PathBuf, target: PathBuf) {
        self.files.remove(&rel);
        self.symlinks.insert(rel, target);
    }

    pub fn remove_file(&mut self, rel: &Path) -> bool {
        self.files.remove(rel)
    }
}

/// A physical directory holding file content.
#[derive(Debug)]
pub struct Datastore {
    root: PathBuf,
    inventory: Inventory,
    fs: Rc<Filesystem>,
}

impl Datastore {
    /// Scan `root` and bind it to `fs`. `root` should already be normalized.
    ///
    /// Devices, sockets, fifos and directories are not recorded.
    pub fn open(
        root: PathBuf,
        fs: Rc<Filesystem>,
        actions: &dyn FsActions,
    ) -> Result<Self, ActionError> {
        let mut inventory = Inventory::default();

        for entry in actions.walk(&root)? {
            let rel = match entry.path.strip_prefix(&root) {
                Ok(rel) => rel.to_path_buf(),
                Err(_) => continue,
            };
            if entry.is_symlink {
                let target = actions.read_symlink(&entry.path)?;
                inventory.insert_symlink(rel, target);
            } else if entry.is_file {
                inventory.insert_file(rel);
            }
        }

        info!(
            "Opened datastore {} on {}: {} files, {} symlinks",
            root.display(),
            fs.mount_id(),
            inventory.files.len(),
            inventory.symlinks.len()
        );

        Ok(Self {
            root,
            inventory,
            fs,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn filesystem(&self) -> &Rc<Filesystem> {
        &self.fs
    }

    /// Absolute path of `rel` inside this datastore.
    pub fn abs_path(&self, rel: &Path) -> PathBuf {
        self.root.join(rel)
    }

    /// Ranking signal for placement: free space of the underlying mount.
    pub fn score_for_placement(&self) -> i64 {
        self.fs.free_kb()
    }

    pub fn has_file(&self, rel: &Path) -> bool {
        self.inventory.files.contains(rel)
    }

    pub fn has_symlink(&self, rel: &Path) -> bool {
        self.inventory.symlinks.contains_key(rel)
    }

    pub fn symlink_target(&self, rel: &Path) -> Option<&Path> {
        self.inventory.symlinks.get(rel).map(PathBuf::as_path)
    }

    /// True when nothing, neither a file nor a symlink, is recorded at `rel`.
    pub fn can_receive(&self, rel: &Path) -> bool {
        !self.has_file(rel) && !self.has_symlink(rel)
    }

    /// Absolute paths every recorded symlink resolves to.
    pub fn resolved_symlink_targets(&self) -> BTreeSet<PathBuf> {
        self.inventory
            .symlinks
            .iter()
            .map(|(rel, target)| resolve_link_target(&self.abs_path(rel), target))
            .collect()
    }

    /// Accounting size of a file in this datastore.
    pub fn size_kb(&self, rel: &Path, actions: &dyn FsActions) -> Result<i64, ActionError> {
        Ok(approx_size_kb(actions.file_len(&self.abs_path(rel))?))
    }

    /// Copy `rel` into `target`, optionally deleting it here afterwards.
    ///
    /// On success both inventories and both free-space counters reflect the
    /// new state. Returns `(old_abs_path, new_abs_path)`.
    ///
    /// The target must not already hold a file or symlink at `rel`: copying
    /// through a link would truncate whatever it points at.
    pub fn transfer(
        &mut self,
        rel: &Path,
        target: &mut Datastore,
        remove_source: bool,
        actions: &dyn FsActions,
    ) -> Result<(PathBuf, PathBuf), TransferError> {
        if self.root == target.root {
            return Err(TransferError::SameDatastore(self.root.clone()));
        }
        if !self.has_file(rel) {
            return Err(TransferError::NotInInventory {
                store: self.root.clone(),
                file: rel.to_path_buf(),
            });
        }
        if !target.can_receive(rel) {
            return Err(TransferError::TargetOccupied {
                store: target.root.clone(),
                file: rel.to_path_buf(),
            });
        }

        let src = self.abs_path(rel);
        let dst = target.abs_path(rel);
        let size_kb = self.size_kb(rel, actions)?;

        if let Some(parent) = dst.parent() {
            actions.make_directories(parent)?;
        }
        debug!("copy {} -> {} ({} KB)", src.display(), dst.display(), size_kb);
        actions.copy_file(&src, &dst)?;
        target.inventory.insert_file(rel.to_path_buf());
        target.fs.consume(size_kb);

        if remove_source {
            actions.remove_file(&src)?;
            self.inventory.remove_file(rel);
            self.fs.consume(-size_kb);
        }

        Ok((src, dst))
    }

    /// Create a symlink at `rel` pointing at `target` and record it. Parent
    /// directories are created as needed.
    pub fn link(
        &mut self,
        rel: &Path,
        target: &Path,
        actions: &dyn FsActions,
    ) -> Result<(), ActionError> {
        let link = self.abs_path(rel);
        if let Some(parent) = link.parent() {
            actions.make_directories(parent)?;
        }
        actions.create_symlink(target, &link)?;
        self.inventory
            .insert_symlink(rel.to_path_buf(), target.to_path_buf());
        Ok(())
    }
}
