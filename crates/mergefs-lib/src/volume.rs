//! Per-mount free-space accounting.
//!
//! Several datastores may sit on the same physical volume. The registry makes
//! sure they all share one [`Filesystem`] so that placing a file in one of
//! them is visible to the others.
//!
//! The counters are advisory: they start from the probe's numbers and are
//! then adjusted in memory as files are moved. They are never clamped.

use std::cell::Cell;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use log::debug;

use crate::error::ProbeError;
use crate::probe::MountProbe;

/// One mounted volume, the unit of free-space accounting.
#[derive(Debug)]
pub struct Filesystem {
    mount_id: String,
    free_kb: Cell<i64>,
    capacity_kb: u64,
}

impl Filesystem {
    pub fn new(mount_id: impl Into<String>, free_kb: i64, capacity_kb: u64) -> Self {
        Self {
            mount_id: mount_id.into(),
            free_kb: Cell::new(free_kb),
            capacity_kb,
        }
    }

    pub fn mount_id(&self) -> &str {
        &self.mount_id
    }

    pub fn free_kb(&self) -> i64 {
        self.free_kb.get()
    }

    pub fn capacity_kb(&self) -> u64 {
        self.capacity_kb
    }

    /// Take `delta_kb` from the free counter. A negative delta gives space back.
    pub fn consume(&self, delta_kb: i64) {
        self.free_kb.set(self.free_kb.get() - delta_kb);
    }
}

/// Deduplicates mounts by the identity the probe reports.
pub struct FilesystemRegistry {
    probe: Box<dyn MountProbe>,
    mounts: HashMap<String, Rc<Filesystem>>,
}

impl FilesystemRegistry {
    pub fn new(probe: Box<dyn MountProbe>) -> Self {
        Self {
            probe,
            mounts: HashMap::new(),
        }
    }

    /// Return the filesystem holding `path`, creating it on first sight.
    ///
    /// The probe is queried on every call; its free/capacity numbers are only
    /// used when the mount has not been seen before.
    pub fn resolve(&mut self, path: &Path) -> Result<Rc<Filesystem>, ProbeError> {
        let info = self.probe.probe(path)?;

        if let Some(fs) = self.mounts.get(&info.mount_id) {
            debug!("{} is on known mount {}", path.display(), info.mount_id);
            return Ok(Rc::clone(fs));
        }

        debug!(
            "New mount {} for {}: {} KB free of {} KB",
            info.mount_id,
            path.display(),
            info.free_kb,
            info.capacity_kb
        );
        let fs = Rc::new(Filesystem::new(
            info.mount_id.clone(),
            info.free_kb,
            info.capacity_kb,
        ));
        self.mounts.insert(info.mount_id, Rc::clone(&fs));
        Ok(fs)
    }

    /// Adjust the free counter of `fs` by `-delta_kb`.
    pub fn consume(&self, fs: &Filesystem, delta_kb: i64) {
        fs.consume(delta_kb);
    }

    pub fn len(&self) -> usize {
        self.mounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }
}

impl std::fmt::Debug for FilesystemRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilesystemRegistry")
            .field("mounts", &self.mounts)
            .finish()
    }
}
