//! Configuration
//!
//! Settings come from an optional TOML file and are then overridden by
//! command-line flags:
//!
//! ```toml
//! merge_dir = "/srv/media"
//! stores = ["/mnt/disk1/media", "/mnt/disk2/media"]
//! min_copies = 2
//! probe = "df"
//! simulate = false
//! ```

use std::path::{Path, PathBuf};

use log::debug;
use serde::Deserialize;

use crate::cli::commands::Cli;
use crate::error::ConfigError;
use crate::probe::ProbeKind;

/// Replica target used by `balance` when nothing else is configured.
pub const DEFAULT_MIN_COPIES: usize = 2;

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MergeConfig {
    pub merge_dir: Option<PathBuf>,
    pub stores: Vec<PathBuf>,
    pub min_copies: Option<usize>,
    pub probe: Option<ProbeKind>,
    pub simulate: bool,
}

impl MergeConfig {
    /// `~/.config/mergefs/config.toml` on Linux.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("mergefs").join("config.toml"))
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Load `explicit` if given (it must exist), else the default file if it
    /// exists, else an empty configuration.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => {
                debug!("Loading config from {}", path.display());
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Let command-line flags win over file values.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(ref dir) = cli.mergedir {
            self.merge_dir = Some(dir.clone());
        }
        if !cli.stores.is_empty() {
            self.stores = cli.stores.clone();
        }
        if let Some(probe) = cli.probe {
            self.probe = Some(probe);
        }
        if cli.simulate {
            self.simulate = true;
        }
    }

    pub fn merge_dir(&self) -> Result<&Path, ConfigError> {
        self.merge_dir.as_deref().ok_or(ConfigError::NoMergeDir)
    }

    pub fn stores(&self) -> Result<&[PathBuf], ConfigError> {
        if self.stores.is_empty() {
            return Err(ConfigError::NoStores);
        }
        Ok(&self.stores)
    }

    pub fn min_copies(&self) -> usize {
        self.min_copies.unwrap_or(DEFAULT_MIN_COPIES)
    }
}
