//! # Test Doubles
//!
//! [`MockStorage`] scripts a [`VersionedStorage`] backend call by call, which
//! makes storage failures and in-flight stores easy to stage.
//! [`MockMasterRegistrar`] is a minimal master that commits each mutation
//! immediately.
//!
//! | Situation | Double |
//! |-----------|--------|
//! | Version conflict, backend error, discarded store | `MockStorage` |
//! | Several operations queued behind an in-flight store | `MockStorage` + `hold_until` |
//! | Real compare-and-swap between two registrars | [`InMemoryStorage`](crate::storage::InMemoryStorage) |
//! | Delegation to a master registrar | `MockMasterRegistrar` |
//!
//! ```rust,ignore
//! let storage = Arc::new(MockStorage::new());
//! storage.expect_fetch().return_ok(None);
//! storage.expect_store().return_conflict();
//!
//! let registrar = Registrar::with_storage(storage.clone(), &RegistrarConfig::default());
//! registrar.recover().await?;
//! assert!(registrar.apply(AdmitResourceProvider::new("rp_1")).await.is_err());
//!
//! storage.verify(); // every scripted call happened
//! ```

use crate::master::{MasterError, MasterReceipt, MasterRegistrar, MasterRegistry, RegistryMutation};
use crate::model::Registry;
use crate::storage::{StorageError, VersionedHandle, VersionedStorage};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// VERSIONED STORAGE
// =============================================================================

enum StoreResponse {
    Commit,
    Conflict,
    Error(StorageError),
}

enum Expectation {
    Fetch {
        response: Result<Option<VersionedHandle<Registry>>, StorageError>,
        gate: Option<oneshot::Receiver<()>>,
    },
    Store {
        response: StoreResponse,
        gate: Option<oneshot::Receiver<()>>,
    },
}

#[derive(Default)]
struct Calls {
    fetches: usize,
    stored: Vec<Registry>,
}

/// A scripted storage backend.
///
/// Each call consumes the next expectation in the order they were declared.
/// A call that does not match the next expectation panics inside the
/// storage task, which the registrar reports as a discarded operation.
#[derive(Default)]
pub struct MockStorage {
    expectations: Arc<Mutex<VecDeque<Expectation>>>,
    calls: Arc<Mutex<Calls>>,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expects a `fetch` call.
    pub fn expect_fetch(&self) -> FetchExpectationBuilder {
        FetchExpectationBuilder {
            expectations: self.expectations.clone(),
            gate: None,
        }
    }

    /// Expects a `store` call.
    pub fn expect_store(&self) -> StoreExpectationBuilder {
        StoreExpectationBuilder {
            expectations: self.expectations.clone(),
            gate: None,
        }
    }

    pub fn fetch_calls(&self) -> usize {
        lock(&self.calls).fetches
    }

    pub fn store_calls(&self) -> usize {
        lock(&self.calls).stored.len()
    }

    /// Registries passed to `store`, in call order.
    pub fn stored(&self) -> Vec<Registry> {
        lock(&self.calls).stored.clone()
    }

    /// Verifies that all expectations were met.
    pub fn verify(&self) {
        let remaining = lock(&self.expectations).len();
        if remaining != 0 {
            panic!("Not all expectations were met. {} remaining", remaining);
        }
    }

    fn next(&self) -> Option<Expectation> {
        lock(&self.expectations).pop_front()
    }
}

#[async_trait]
impl VersionedStorage for MockStorage {
    async fn fetch(&self, key: &str) -> Result<Option<VersionedHandle<Registry>>, StorageError> {
        lock(&self.calls).fetches += 1;

        match self.next() {
            Some(Expectation::Fetch { response, gate }) => {
                if let Some(gate) = gate {
                    let _ = gate.await;
                }
                response
            }
            _ => panic!("Unexpected fetch of {key}"),
        }
    }

    async fn store(
        &self,
        handle: VersionedHandle<Registry>,
    ) -> Result<Option<VersionedHandle<Registry>>, StorageError> {
        lock(&self.calls).stored.push(handle.get().clone());

        match self.next() {
            Some(Expectation::Store { response, gate }) => {
                if let Some(gate) = gate {
                    let _ = gate.await;
                }
                match response {
                    StoreResponse::Commit => Ok(Some(VersionedHandle::new(
                        handle.key().to_string(),
                        handle.version() + 1,
                        handle.into_inner(),
                    ))),
                    StoreResponse::Conflict => Ok(None),
                    StoreResponse::Error(error) => Err(error),
                }
            }
            _ => panic!("Unexpected store of {}", handle.key()),
        }
    }
}

/// Builder for `fetch` expectations.
pub struct FetchExpectationBuilder {
    expectations: Arc<Mutex<VecDeque<Expectation>>>,
    gate: Option<oneshot::Receiver<()>>,
}

impl FetchExpectationBuilder {
    /// Keeps the call pending until `gate` fires or its sender is dropped.
    pub fn hold_until(mut self, gate: oneshot::Receiver<()>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Sets the expectation to return a stored registry, or `None` for a missing key.
    pub fn return_ok(self, value: Option<VersionedHandle<Registry>>) {
        self.push(Ok(value));
    }

    /// Sets the expectation to return an error.
    pub fn return_err(self, error: StorageError) {
        self.push(Err(error));
    }

    fn push(self, response: Result<Option<VersionedHandle<Registry>>, StorageError>) {
        lock(&self.expectations).push_back(Expectation::Fetch {
            response,
            gate: self.gate,
        });
    }
}

/// Builder for `store` expectations.
pub struct StoreExpectationBuilder {
    expectations: Arc<Mutex<VecDeque<Expectation>>>,
    gate: Option<oneshot::Receiver<()>>,
}

impl StoreExpectationBuilder {
    /// Keeps the call pending until `gate` fires or its sender is dropped.
    pub fn hold_until(mut self, gate: oneshot::Receiver<()>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Accepts the write and bumps the version.
    pub fn return_ok(self) {
        self.push(StoreResponse::Commit);
    }

    /// Rejects the write as a version mismatch.
    pub fn return_conflict(self) {
        self.push(StoreResponse::Conflict);
    }

    /// Sets the expectation to return an error.
    pub fn return_err(self, error: StorageError) {
        self.push(StoreResponse::Error(error));
    }

    fn push(self, response: StoreResponse) {
        lock(&self.expectations).push_back(Expectation::Store {
            response,
            gate: self.gate,
        });
    }
}

// =============================================================================
// MASTER REGISTRAR
// =============================================================================

#[derive(Default)]
struct MasterState {
    registry: MasterRegistry,
    failures: VecDeque<String>,
    applied: usize,
}

/// A master registrar that commits every mutation on its own, in call order.
#[derive(Default)]
pub struct MockMasterRegistrar {
    state: Mutex<MasterState>,
}

impl MockMasterRegistrar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(registry: MasterRegistry) -> Self {
        Self {
            state: Mutex::new(MasterState {
                registry,
                ..Default::default()
            }),
        }
    }

    /// Makes the next commit fail with `reason` without touching the document.
    pub fn fail_next(&self, reason: impl Into<String>) {
        lock(&self.state).failures.push_back(reason.into());
    }

    /// The committed document.
    pub fn registry(&self) -> MasterRegistry {
        lock(&self.state).registry.clone()
    }

    /// Number of mutations received.
    pub fn applied(&self) -> usize {
        lock(&self.state).applied
    }
}

impl MasterRegistrar for MockMasterRegistrar {
    fn apply(&self, mut mutation: Box<dyn RegistryMutation>) -> MasterReceipt {
        let (respond_to, receipt) = oneshot::channel();
        let mut state = lock(&self.state);
        state.applied += 1;

        let result = match state.failures.pop_front() {
            Some(reason) => Err(MasterError::Failed(reason)),
            None => {
                let mut updated = state.registry.clone();
                match mutation.perform(&mut updated) {
                    Ok(mutated) => {
                        state.registry = updated;
                        Ok(mutated)
                    }
                    Err(error) => Err(MasterError::Rejected(error)),
                }
            }
        };

        let _ = respond_to.send(result);
        receipt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::OperationError;

    struct Admit(&'static str);

    impl RegistryMutation for Admit {
        fn perform(&mut self, registry: &mut MasterRegistry) -> Result<bool, OperationError> {
            crate::operation::AdmitResourceProvider::new(self.0)
                .perform(&mut registry.resource_provider_registry)
        }
    }

    #[tokio::test]
    async fn test_mock_storage_follows_script() {
        let storage = MockStorage::new();
        storage.expect_fetch().return_ok(None);
        storage.expect_store().return_ok();
        storage.expect_store().return_conflict();

        assert!(storage.fetch("key").await.unwrap().is_none());

        let handle = VersionedHandle::absent("key", Registry::new());
        let stored = storage.store(handle.clone()).await.unwrap().unwrap();
        assert_eq!(stored.version(), 1);
        assert!(storage.store(handle).await.unwrap().is_none());

        assert_eq!(storage.fetch_calls(), 1);
        assert_eq!(storage.store_calls(), 2);
        storage.verify();
    }

    #[tokio::test]
    async fn test_mock_master_failure_leaves_document_untouched() {
        let master = MockMasterRegistrar::new();
        master.fail_next("replicated log unavailable");

        let receipt = master.apply(Box::new(Admit("rp_1")));
        assert_eq!(
            receipt.await.unwrap(),
            Err(MasterError::Failed("replicated log unavailable".to_string()))
        );
        assert!(master.registry().resource_provider_registry.is_empty());

        let receipt = master.apply(Box::new(Admit("rp_1")));
        assert_eq!(receipt.await.unwrap(), Ok(true));
        assert_eq!(master.applied(), 2);
    }
}
