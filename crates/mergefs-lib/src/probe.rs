//! Mount probes
//!
//! A probe answers one question for a path: which mount holds it, and how
//! much space that mount has. Everything above this module only ever sees
//! [`MountInfo`].

use std::path::{Path, PathBuf};
use std::process::Command;

use clap::ValueEnum;
use log::debug;
use nix::sys::stat::stat;
use nix::sys::statvfs::statvfs;
use serde::Deserialize;

use crate::error::ProbeError;

/// Identity and size of the mount containing a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountInfo {
    /// Name that identifies the mount; equal names mean a shared volume.
    pub mount_id: String,
    /// Free space in KB.
    pub free_kb: i64,
    /// Total capacity in KB.
    pub capacity_kb: u64,
}

/// Something that can tell which mount a path lives on.
pub trait MountProbe {
    fn probe(&self, path: &Path) -> Result<MountInfo, ProbeError>;
}

/// Which probe implementation to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    /// Run `df -P` on each path
    #[default]
    Df,
    /// Query statvfs(2) directly
    Statvfs,
}

impl ProbeKind {
    pub fn build(self) -> Box<dyn MountProbe> {
        match self {
            ProbeKind::Df => Box::new(DfProbe),
            ProbeKind::Statvfs => Box::new(StatvfsProbe),
        }
    }
}

/// Probe backed by the POSIX `df -P` output format.
#[derive(Debug, Default, Clone, Copy)]
pub struct DfProbe;

const DF: &str = "df -P";

impl MountProbe for DfProbe {
    fn probe(&self, path: &Path) -> Result<MountInfo, ProbeError> {
        debug!("executing: {} {}", DF, path.display());
        let output = Command::new("df")
            .arg("-P")
            .arg(path)
            .output()
            .map_err(|source| ProbeError::Spawn {
                command: DF.to_string(),
                path: path.to_path_buf(),
                source,
            })?;

        if !output.status.success() {
            return Err(ProbeError::ExitStatus {
                command: DF.to_string(),
                path: path.to_path_buf(),
                status: output.status,
            });
        }

        parse_df_output(path, &String::from_utf8_lossy(&output.stdout))
    }
}

/// Parse `df -P` output: one header line plus exactly one data line of the
/// form `device 1024-blocks used available capacity% mountpoint`.
///
/// The data line needs at least six whitespace-separated fields. Anything
/// past the fifth is joined back with single spaces to form the mount point,
/// so mount points containing spaces parse (runs of spaces collapse to one).
pub fn parse_df_output(path: &Path, stdout: &str) -> Result<MountInfo, ProbeError> {
    let malformed = |reason: String| ProbeError::Malformed {
        command: DF.to_string(),
        path: path.to_path_buf(),
        reason,
    };

    let lines: Vec<&str> = stdout.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.len() != 2 {
        return Err(malformed(format!("expected 2 lines, got {}", lines.len())));
    }

    let fields: Vec<&str> = lines[1].split_whitespace().collect();
    if fields.len() < 6 {
        return Err(malformed(format!("expected at least 6 fields, got {}", fields.len())));
    }

    let capacity_kb: u64 = fields[1]
        .parse()
        .map_err(|_| malformed(format!("bad capacity column {:?}", fields[1])))?;
    let free_kb: i64 = fields[3]
        .parse()
        .map_err(|_| malformed(format!("bad available column {:?}", fields[3])))?;

    // Mount points may contain spaces; everything after the percentage is the name.
    let mount_id = fields[5..].join(" ");

    Ok(MountInfo {
        mount_id,
        free_kb,
        capacity_kb,
    })
}

/// Probe that asks the kernel directly. The mount is identified by the
/// device number of the path.
#[derive(Debug, Default, Clone, Copy)]
pub struct StatvfsProbe;

impl MountProbe for StatvfsProbe {
    fn probe(&self, path: &Path) -> Result<MountInfo, ProbeError> {
        let sys_err = |source| ProbeError::Sys {
            path: path.to_path_buf(),
            source,
        };

        let vfs = statvfs(path).map_err(sys_err)?;
        let st = stat(path).map_err(sys_err)?;

        let frag = vfs.fragment_size() as u64;
        let free_kb = (vfs.blocks_available() as u64).saturating_mul(frag) / 1024;
        let capacity_kb = (vfs.blocks() as u64).saturating_mul(frag) / 1024;

        Ok(MountInfo {
            mount_id: format!("dev:{}", st.st_dev),
            free_kb: i64::try_from(free_kb).unwrap_or(i64::MAX),
            capacity_kb,
        })
    }
}

/// Fixed table of mounts keyed by path prefix. The longest matching prefix
/// wins. Useful for tests and for what-if runs with made-up capacities.
#[derive(Debug, Default, Clone)]
pub struct StaticProbe {
    mounts: Vec<(PathBuf, MountInfo)>,
}

impl StaticProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mount(
        mut self,
        prefix: impl Into<PathBuf>,
        mount_id: &str,
        free_kb: i64,
        capacity_kb: u64,
    ) -> Self {
        self.mounts.push((
            prefix.into(),
            MountInfo {
                mount_id: mount_id.to_string(),
                free_kb,
                capacity_kb,
            },
        ));
        self
    }
}

impl MountProbe for StaticProbe {
    fn probe(&self, path: &Path) -> Result<MountInfo, ProbeError> {
        self.mounts
            .iter()
            .filter(|(prefix, _)| path.starts_with(prefix))
            .max_by_key(|(prefix, _)| prefix.components().count())
            .map(|(_, info)| info.clone())
            .ok_or_else(|| ProbeError::UnknownPath(path.to_path_buf()))
    }
}
