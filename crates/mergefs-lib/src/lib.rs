pub mod actions;
pub mod cli;
pub mod config;
pub mod datastore;
pub mod error;
pub mod manager;
pub mod ops;
pub mod placement;
pub mod probe;
pub mod volume;

pub use config::MergeConfig;
pub use datastore::{Datastore, Inventory};
pub use error::{ActionError, ConfigError, MergeError, ProbeError, TransferError};
pub use manager::{DatastoreManager, StoreId};
pub use volume::{Filesystem, FilesystemRegistry};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_not_empty() {
        assert!(!version().is_empty());
    }
}
