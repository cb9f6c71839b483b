use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

use crate::probe::ProbeKind;

/// mergefs - keep a symlink merge directory in sync with its datastores
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Optional log level (trace, debug, info, warn, error); overrides -v
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (default: ~/.config/mergefs/config.toml)
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Merge directory holding the symlinks
    #[arg(long, short, value_name = "DIRECTORY", global = true)]
    pub mergedir: Option<PathBuf>,

    /// Comma-separated list of datastore directories
    #[arg(long, short, value_name = "DIRS", value_delimiter = ',', global = true)]
    pub stores: Vec<PathBuf>,

    /// How to query free space of each mount
    #[arg(long, value_enum, global = true)]
    pub probe: Option<ProbeKind>,

    /// Don't touch the disk, only log what would be done
    #[arg(long, short = 'n', global = true)]
    pub simulate: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Log filter for env_logger: --log-level if given, otherwise by -v count.
    pub fn log_filter(&self) -> String {
        match self.log_level {
            Some(ref level) => level.clone(),
            None => match self.verbose {
                0 => "warn".to_string(),
                1 => "info".to_string(),
                _ => "debug".to_string(),
            },
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Distribute all regular files from the merge directory into the stores
    ///
    /// Each file goes to the store with the most free space and is replaced by
    /// a symlink pointing at its new location.
    Distribute,

    /// Add symlinks for store files that are missing from the merge directory
    Fixup,

    /// List store files that no symlink in the merge directory refers to
    Unused,

    /// Add one copy of every file that has fewer than the requested copies
    ///
    /// Each run adds at most one copy per file; repeat it to reach the target.
    Balance {
        /// Minimum number of copies (default: config `min_copies`, else 2)
        #[arg(long, short = 'c')]
        copies: Option<usize>,
    },

    /// Print how many stores hold each file
    ReportCopies {
        /// Only list files with fewer copies than this
        #[arg(long)]
        below: Option<usize>,
    },
}
