//! Datastore Manager
//!
//! Owns every [`Datastore`], the shared [`FilesystemRegistry`] and the action
//! provider. Each normalized path is opened (and scanned) at most once;
//! asking for it again returns the same [`StoreId`].

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::debug;

use crate::actions::{FsActions, LocalFs, Simulated};
use crate::config::MergeConfig;
use crate::datastore::Datastore;
use crate::error::{ActionError, ConfigError, Result, TransferError};
use crate::probe::MountProbe;
use crate::volume::FilesystemRegistry;

/// Handle to a datastore owned by a [`DatastoreManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreId(usize);

pub struct DatastoreManager {
    registry: FilesystemRegistry,
    actions: Box<dyn FsActions>,
    datastores: Vec<Datastore>,
    by_path: HashMap<PathBuf, StoreId>,
    stores: Vec<StoreId>,
    merge_dir: Option<StoreId>,
}

impl DatastoreManager {
    pub fn new(probe: Box<dyn MountProbe>, actions: Box<dyn FsActions>) -> Self {
        Self {
            registry: FilesystemRegistry::new(probe),
            actions,
            datastores: Vec::new(),
            by_path: HashMap::new(),
            stores: Vec::new(),
            merge_dir: None,
        }
    }

    /// Build a manager from configuration: pick the probe, wrap actions for a
    /// dry run when `simulate` is set, then open the merge directory and
    /// every store.
    pub fn from_config(config: &MergeConfig) -> Result<Self> {
        let probe = config.probe.unwrap_or_default().build();
        let actions: Box<dyn FsActions> = if config.simulate {
            Box::new(Simulated::new(LocalFs))
        } else {
            Box::new(LocalFs)
        };

        let mut manager = Self::new(probe, actions);
        manager.set_merge_dir(config.merge_dir()?)?;
        for store in config.stores()? {
            manager.add_store(store)?;
        }
        Ok(manager)
    }

    /// Canonicalize `path`, requiring an existing directory.
    pub fn normalize(path: &Path) -> Result<PathBuf, ConfigError> {
        let canonical = std::fs::canonicalize(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ConfigError::MissingDirectory(path.to_path_buf()),
            _ => ConfigError::Inaccessible {
                path: path.to_path_buf(),
                source: e,
            },
        })?;
        if !canonical.is_dir() {
            return Err(ConfigError::NotADirectory(path.to_path_buf()));
        }
        Ok(canonical)
    }

    fn open(&mut self, root: PathBuf) -> Result<StoreId> {
        if let Some(&id) = self.by_path.get(&root) {
            debug!("datastore {} already open", root.display());
            return Ok(id);
        }
        let fs = self.registry.resolve(&root)?;
        let store = Datastore::open(root.clone(), fs, self.actions.as_ref())?;
        let id = StoreId(self.datastores.len());
        self.datastores.push(store);
        self.by_path.insert(root, id);
        Ok(id)
    }

    /// Designate the merge directory. Fails if the path is already a store.
    pub fn set_merge_dir(&mut self, path: &Path) -> Result<StoreId> {
        let root = Self::normalize(path)?;
        if let Some(id) = self.by_path.get(&root) {
            if self.stores.contains(id) {
                return Err(ConfigError::MergeDirIsStore(root).into());
            }
        }
        let id = self.open(root)?;
        self.merge_dir = Some(id);
        Ok(id)
    }

    /// Register a store. Fails if the path is the merge directory.
    pub fn add_store(&mut self, path: &Path) -> Result<StoreId> {
        let root = Self::normalize(path)?;
        if let Some(merge) = self.merge_dir {
            if self.get(merge).root() == root.as_path() {
                return Err(ConfigError::MergeDirIsStore(root).into());
            }
        }
        let id = self.open(root)?;
        if !self.stores.contains(&id) {
            self.stores.push(id);
        }
        Ok(id)
    }

    pub fn merge_dir(&self) -> Result<StoreId, ConfigError> {
        self.merge_dir.ok_or(ConfigError::NoMergeDir)
    }

    /// Registered stores in registration order, merge directory excluded.
    pub fn store_ids(&self) -> &[StoreId] {
        &self.stores
    }

    pub fn get(&self, id: StoreId) -> &Datastore {
        &self.datastores[id.0]
    }

    pub fn registry(&self) -> &FilesystemRegistry {
        &self.registry
    }

    pub fn actions(&self) -> &dyn FsActions {
        self.actions.as_ref()
    }

    /// Accounting size of `rel` in datastore `id`.
    pub fn size_kb(&self, id: StoreId, rel: &Path) -> Result<i64, ActionError> {
        self.get(id).size_kb(rel, self.actions.as_ref())
    }

    /// Move or duplicate `rel` from one datastore to another.
    pub fn transfer(
        &mut self,
        rel: &Path,
        from: StoreId,
        to: StoreId,
        remove_source: bool,
    ) -> Result<(PathBuf, PathBuf), TransferError> {
        if from == to {
            return Err(TransferError::SameDatastore(self.get(from).root().to_path_buf()));
        }
        let actions = self.actions.as_ref();
        let (src, dst) = pair_mut(&mut self.datastores, from.0, to.0);
        src.transfer(rel, dst, remove_source, actions)
    }

    /// Create a symlink at `rel` in datastore `id` pointing at `target`.
    pub fn link(&mut self, id: StoreId, rel: &Path, target: &Path) -> Result<(), ActionError> {
        let actions = self.actions.as_ref();
        self.datastores[id.0].link(rel, target, actions)
    }
}

fn pair_mut<T>(items: &mut [T], a: usize, b: usize) -> (&mut T, &mut T) {
    assert_ne!(a, b);
    if a < b {
        let (left, right) = items.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = items.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}

impl std::fmt::Debug for DatastoreManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatastoreManager")
            .field("registry", &self.registry)
            .field("datastores", &self.datastores)
            .field("stores", &self.stores)
            .field("merge_dir", &self.merge_dir)
            .finish()
    }
}
