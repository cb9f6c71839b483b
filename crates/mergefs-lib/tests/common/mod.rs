//! Common test utilities for mergefs
//!
//! `TestFarm` builds a merge directory and stores under one temporary root,
//! each on its own made-up mount with a chosen amount of free space.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use mergefs_lib::actions::LocalFs;
use mergefs_lib::probe::StaticProbe;
use mergefs_lib::{DatastoreManager, StoreId};
use tempfile::TempDir;

pub struct TestFarm {
    _temp: TempDir,
    root: PathBuf,
    probe: StaticProbe,
}

impl TestFarm {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let root = fs::canonicalize(temp.path()).unwrap();
        Self {
            _temp: temp,
            root,
            probe: StaticProbe::new(),
        }
    }

    /// Create directory `name` on its own mount with `free_kb` free.
    pub fn with_mount(mut self, name: &str, free_kb: i64) -> Self {
        let dir = self.root.join(name);
        fs::create_dir_all(&dir).unwrap();
        self.probe = self.probe.with_mount(&dir, name, free_kb, 1_000_000);
        self
    }

    /// Create several directories sharing one mount.
    pub fn with_shared_mount(mut self, mount: &str, names: &[&str], free_kb: i64) -> Self {
        for name in names {
            let dir = self.root.join(name);
            fs::create_dir_all(&dir).unwrap();
            self.probe = self.probe.clone().with_mount(&dir, mount, free_kb, 1_000_000);
        }
        self
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    /// Write `len` bytes at `rel` (relative to the farm root).
    pub fn write(&self, rel: &str, len: usize) -> PathBuf {
        let path = self.root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let content: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        fs::write(&path, content).unwrap();
        path
    }

    pub fn manager(&self) -> DatastoreManager {
        DatastoreManager::new(Box::new(self.probe.clone()), Box::new(LocalFs))
    }

    /// Manager with `merge` as merge directory and `stores` registered.
    pub fn open(&self, merge: &str, stores: &[&str]) -> (DatastoreManager, Vec<StoreId>) {
        let mut manager = self.manager();
        manager.set_merge_dir(&self.path(merge)).unwrap();
        let ids = stores
            .iter()
            .map(|s| manager.add_store(&self.path(s)).unwrap())
            .collect();
        (manager, ids)
    }
}

pub fn free_kb(manager: &DatastoreManager, id: StoreId) -> i64 {
    manager.get(id).score_for_placement()
}

pub fn assert_symlink(link: &Path, target: &Path) {
    let meta = fs::symlink_metadata(link).unwrap();
    assert!(meta.file_type().is_symlink(), "{} is not a symlink", link.display());
    assert_eq!(fs::read_link(link).unwrap(), target);
}
