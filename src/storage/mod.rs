//! # Versioned Storage
//!
//! The registrar persists its [`Registry`] through a [`VersionedStorage`]
//! backend offering fetch and compare-and-swap store on a single key.
//! A store that loses the race returns `Ok(None)`.

pub mod memory;

pub use memory::InMemoryStorage;

use crate::model::Registry;
use async_trait::async_trait;

/// Storage error types.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Storage operation discarded")]
    Discarded,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A snapshot of a stored value together with the version it was read at.
///
/// Handles are never changed in place: [`VersionedHandle::mutate`] returns a
/// new handle with the same version and a new value, and a successful store
/// returns a handle carrying the next version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedHandle<T> {
    key: String,
    version: u64,
    value: T,
}

impl<T> VersionedHandle<T> {
    pub fn new(key: impl Into<String>, version: u64, value: T) -> Self {
        Self {
            key: key.into(),
            version,
            value,
        }
    }

    /// Handle for a key that has never been written.
    pub fn absent(key: impl Into<String>, value: T) -> Self {
        Self::new(key, 0, value)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn into_inner(self) -> T {
        self.value
    }

    /// New handle for writing `value` over the version this one was read at.
    pub fn mutate(&self, value: T) -> Self {
        Self {
            key: self.key.clone(),
            version: self.version,
            value,
        }
    }
}

/// Storage backend trait
///
/// Implementations serialize concurrent writers with their own
/// compare-and-swap; the registrar never retries a lost race.
#[async_trait]
pub trait VersionedStorage: Send + Sync {
    /// Read the registry stored under `key`, or `None` if it was never written.
    async fn fetch(&self, key: &str) -> Result<Option<VersionedHandle<Registry>>, StorageError>;

    /// Write `handle`'s value if the stored version still equals `handle`'s.
    ///
    /// Returns the handle for the newly written version, or `None` on a
    /// version mismatch.
    async fn store(
        &self,
        handle: VersionedHandle<Registry>,
    ) -> Result<Option<VersionedHandle<Registry>>, StorageError>;
}
