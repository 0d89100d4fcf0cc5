//! # Master Registry Boundary
//!
//! A master registrar owns a larger registry document of which the resource
//! provider registry is one section. It batches, persists and versions that
//! document itself; callers hand it [`RegistryMutation`]s.

use crate::framework::OperationError;
use crate::model::Registry;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

/// The master's registry document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterRegistry {
    /// Agents admitted by the master. Opaque to this crate.
    #[serde(default)]
    pub agents: Vec<String>,
    #[serde(default)]
    pub resource_provider_registry: Registry,
}

/// Errors reported by a master registrar for a submitted mutation.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum MasterError {
    #[error(transparent)]
    Rejected(#[from] OperationError),
    #[error("{0}")]
    Failed(String),
}

/// A change to the master document, run by the master's commit machinery.
pub trait RegistryMutation: Send {
    fn perform(&mut self, registry: &mut MasterRegistry) -> Result<bool, OperationError>;
}

/// Resolves with the master's verdict on a mutation.
pub type MasterReceipt = oneshot::Receiver<Result<bool, MasterError>>;

/// An external registrar that accepts [`RegistryMutation`]s.
///
/// `apply` must enqueue the mutation before returning so that mutations are
/// committed in submission order; the receipt only waits for the outcome.
pub trait MasterRegistrar: Send + Sync {
    fn apply(&self, mutation: Box<dyn RegistryMutation>) -> MasterReceipt;
}
