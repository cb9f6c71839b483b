//! Error types shared across the merge engine.
//!
//! Precondition failures (`ProbeError`, `ConfigError`) abort before any
//! operation runs. `ActionError` aborts the running operation without rolling
//! back files already processed. Placement misses are not errors at all; they
//! are collected in each operation's report.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Failure to determine which mount a path lives on, or how full it is.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Failed to run `{command}` for {path}: {source}")]
    Spawn {
        command: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status} for {path}")]
    ExitStatus {
        command: String,
        path: PathBuf,
        status: std::process::ExitStatus,
    },

    #[error("Unexpected output from `{command}` for {path}: {reason}")]
    Malformed {
        command: String,
        path: PathBuf,
        reason: String,
    },

    #[error("System call failed for {path}: {source}")]
    Sys {
        path: PathBuf,
        #[source]
        source: nix::Error,
    },

    #[error("No mount known for {0}")]
    UnknownPath(PathBuf),
}

/// Invalid setup detected before an operation starts.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Merge directory {0} is also listed as a store")]
    MergeDirIsStore(PathBuf),

    #[error("Directory does not exist: {0}")]
    MissingDirectory(PathBuf),

    #[error("Path is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Cannot access {path}: {source}")]
    Inaccessible {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No merge directory given")]
    NoMergeDir,

    #[error("No stores given")]
    NoStores,

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Physical operation attempted by an action provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    MakeDirectories,
    CopyFile,
    RemoveFile,
    CreateSymlink,
    ReadSymlink,
    Walk,
    Stat,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionKind::MakeDirectories => "mkdir -p",
            ActionKind::CopyFile => "copy",
            ActionKind::RemoveFile => "remove",
            ActionKind::CreateSymlink => "symlink",
            ActionKind::ReadSymlink => "readlink",
            ActionKind::Walk => "walk",
            ActionKind::Stat => "stat",
        };
        f.write_str(name)
    }
}

/// A physical filesystem action failed.
#[derive(Error, Debug)]
#[error("{kind} failed on {path}: {source}")]
pub struct ActionError {
    pub kind: ActionKind,
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

impl ActionError {
    pub fn new(kind: ActionKind, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self {
            kind,
            path: path.into(),
            source,
        }
    }
}

/// A file could not be moved or duplicated between datastores.
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Source and target are the same datastore: {0}")]
    SameDatastore(PathBuf),

    #[error("{file} is not a regular file in {store}")]
    NotInInventory { store: PathBuf, file: PathBuf },

    #[error("{file} already exists in {store}")]
    TargetOccupied { store: PathBuf, file: PathBuf },

    #[error(transparent)]
    Action(#[from] ActionError),
}

/// Umbrella error returned by the manager and the operations.
#[derive(Error, Debug)]
pub enum MergeError {
    #[error("Probe error: {0}")]
    Probe(#[from] ProbeError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Action error: {0}")]
    Action(#[from] ActionError),

    #[error("Transfer error: {0}")]
    Transfer(#[from] TransferError),
}

pub type Result<T, E = MergeError> = std::result::Result<T, E>;
