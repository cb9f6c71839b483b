//! Physical filesystem actions.
//!
//! The engine never touches the disk directly. It asks an [`FsActions`]
//! provider, which lets dry runs swap in [`Simulated`] without changing any
//! of the bookkeeping.

use std::fs::{self, FileTimes};
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};

use log::{debug, info};
use walkdir::WalkDir;

use crate::error::{ActionError, ActionKind};

/// One entry found while walking a directory tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    pub path: PathBuf,
    pub is_symlink: bool,
    pub is_file: bool,
}

/// Provider of every physical operation the engine needs.
pub trait FsActions {
    /// `mkdir -p`
    fn make_directories(&self, path: &Path) -> Result<(), ActionError>;

    /// Copy a regular file, keeping permissions and timestamps. `dst` is the
    /// full destination file path.
    fn copy_file(&self, src: &Path, dst: &Path) -> Result<(), ActionError>;

    fn remove_file(&self, path: &Path) -> Result<(), ActionError>;

    /// Create `link` pointing at `target`.
    fn create_symlink(&self, target: &Path, link: &Path) -> Result<(), ActionError>;

    fn read_symlink(&self, path: &Path) -> Result<PathBuf, ActionError>;

    /// Every entry below `root` (not `root` itself). Symlinks are not followed.
    fn walk(&self, root: &Path) -> Result<Vec<WalkEntry>, ActionError>;

    /// Size in bytes of a regular file.
    fn file_len(&self, path: &Path) -> Result<u64, ActionError>;
}

/// Actions against the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFs;

impl FsActions for LocalFs {
    fn make_directories(&self, path: &Path) -> Result<(), ActionError> {
        fs::create_dir_all(path)
            .map_err(|e| ActionError::new(ActionKind::MakeDirectories, path, e))
    }

    fn copy_file(&self, src: &Path, dst: &Path) -> Result<(), ActionError> {
        let copy_err = |e| ActionError::new(ActionKind::CopyFile, src, e);

        fs::copy(src, dst).map_err(copy_err)?;

        // fs::copy keeps permissions but not timestamps.
        let meta = fs::metadata(src).map_err(copy_err)?;
        let mut times = FileTimes::new();
        if let Ok(accessed) = meta.accessed() {
            times = times.set_accessed(accessed);
        }
        if let Ok(modified) = meta.modified() {
            times = times.set_modified(modified);
        }
        fs::File::options()
            .write(true)
            .open(dst)
            .and_then(|f| f.set_times(times))
            .map_err(|e| ActionError::new(ActionKind::CopyFile, dst, e))
    }

    fn remove_file(&self, path: &Path) -> Result<(), ActionError> {
        fs::remove_file(path).map_err(|e| ActionError::new(ActionKind::RemoveFile, path, e))
    }

    fn create_symlink(&self, target: &Path, link: &Path) -> Result<(), ActionError> {
        symlink(target, link).map_err(|e| ActionError::new(ActionKind::CreateSymlink, link, e))
    }

    fn read_symlink(&self, path: &Path) -> Result<PathBuf, ActionError> {
        fs::read_link(path).map_err(|e| ActionError::new(ActionKind::ReadSymlink, path, e))
    }

    fn walk(&self, root: &Path) -> Result<Vec<WalkEntry>, ActionError> {
        let mut entries = Vec::new();
        for entry in WalkDir::new(root).follow_links(false).min_depth(1) {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(root).to_path_buf();
                ActionError::new(ActionKind::Walk, path, e.into())
            })?;
            let ft = entry.file_type();
            entries.push(WalkEntry {
                path: entry.into_path(),
                is_symlink: ft.is_symlink(),
                is_file: ft.is_file(),
            });
        }
        debug!("walked {}: {} entries", root.display(), entries.len());
        Ok(entries)
    }

    fn file_len(&self, path: &Path) -> Result<u64, ActionError> {
        fs::symlink_metadata(path)
            .map(|m| m.len())
            .map_err(|e| ActionError::new(ActionKind::Stat, path, e))
    }
}

/// Dry-run wrapper: reads go to the inner provider, mutations are only logged.
#[derive(Debug, Default, Clone)]
pub struct Simulated<A> {
    inner: A,
}

impl<A: FsActions> Simulated<A> {
    pub fn new(inner: A) -> Self {
        Self { inner }
    }
}

impl<A: FsActions> FsActions for Simulated<A> {
    fn make_directories(&self, path: &Path) -> Result<(), ActionError> {
        info!("[simulate] mkdir -p {}", path.display());
        Ok(())
    }

    fn copy_file(&self, src: &Path, dst: &Path) -> Result<(), ActionError> {
        info!("[simulate] copy {} -> {}", src.display(), dst.display());
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<(), ActionError> {
        info!("[simulate] remove {}", path.display());
        Ok(())
    }

    fn create_symlink(&self, target: &Path, link: &Path) -> Result<(), ActionError> {
        info!("[simulate] symlink {} -> {}", link.display(), target.display());
        Ok(())
    }

    fn read_symlink(&self, path: &Path) -> Result<PathBuf, ActionError> {
        self.inner.read_symlink(path)
    }

    fn walk(&self, root: &Path) -> Result<Vec<WalkEntry>, ActionError> {
        self.inner.walk(root)
    }

    fn file_len(&self, path: &Path) -> Result<u64, ActionError> {
        self.inner.file_len(path)
    }
}
