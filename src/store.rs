//! Pluggable key/value persistence.
//!
//! Every repository talks to a [`Datastore`]: a flat key→bytes mapping with
//! get/set/delete and a prefix scan. Scan order is unspecified and no
//! snapshot or transaction semantics are offered; callers that need
//! multi-key consistency serialize through [`crate::guard::Guard`].

use std::sync::Arc;

use crate::{
    config::{Config, StoreKind},
    error::Error,
};

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

pub trait Datastore: Send + Sync {
    /// Returns the stored bytes, or `None` when the key is absent.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error>;

    fn set(&self, key: &str, value: Vec<u8>) -> Result<(), Error>;

    /// Removes the key. Returns `false` when the key was absent; callers
    /// translate that into the not-found kind of their own entity.
    fn delete(&self, key: &str) -> Result<bool, Error>;

    /// All entries whose key starts with `prefix`, in unspecified order.
    fn scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, Error>;
}

/// Opens the backend selected by the configuration.
pub fn open(config: &Config) -> Result<Arc<dyn Datastore>, Error> {
    match config.store_kind() {
        StoreKind::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreKind::File => Ok(Arc::new(FileStore::open(config.store_path())?)),
    }
}
