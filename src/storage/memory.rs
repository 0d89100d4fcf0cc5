//! In-process versioned store.

use super::{StorageError, VersionedHandle, VersionedStorage};
use crate::model::Registry;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

struct Entry {
    version: u64,
    bytes: Vec<u8>,
}

/// A [`VersionedStorage`] keeping JSON-encoded snapshots in memory.
///
/// Share one instance (behind an `Arc`) between registrars to model several
/// writers racing on the same key.
#[derive(Default)]
pub struct InMemoryStorage {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current version of `key`, `None` if never written.
    pub async fn version(&self, key: &str) -> Option<u64> {
        self.entries.lock().await.get(key).map(|entry| entry.version)
    }
}

#[async_trait]
impl VersionedStorage for InMemoryStorage {
    async fn fetch(&self, key: &str) -> Result<Option<VersionedHandle<Registry>>, StorageError> {
        let entries = self.entries.lock().await;
        let Some(entry) = entries.get(key) else {
            debug!(key, "Fetch miss");
            return Ok(None);
        };

        let registry: Registry = serde_json::from_slice(&entry.bytes)?;
        debug!(key, version = entry.version, size = registry.len(), "Fetch");
        Ok(Some(VersionedHandle::new(key, entry.version, registry)))
    }

    async fn store(
        &self,
        handle: VersionedHandle<Registry>,
    ) -> Result<Option<VersionedHandle<Registry>>, StorageError> {
        let mut entries = self.entries.lock().await;
        let current = entries.get(handle.key()).map_or(0, |entry| entry.version);

        if current != handle.version() {
            debug!(
                key = handle.key(),
                expected = handle.version(),
                current,
                "Store rejected"
            );
            return Ok(None);
        }

        let bytes = serde_json::to_vec(handle.get())?;
        let version = current + 1;
        entries.insert(handle.key().to_string(), Entry { version, bytes });
        debug!(key = handle.key(), version, "Stored");

        let key = handle.key().to_string();
        Ok(Some(VersionedHandle::new(key, version, handle.into_inner())))
    }
}
