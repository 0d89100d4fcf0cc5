//! # Registrar Errors
//!
//! Domain rejections ([`OperationError`]) are local to the operation that
//! raised them. Everything else surfaces as a [`RegistrarError`].

use crate::model::ResourceProviderId;

/// Why an operation refused to mutate the registry.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum OperationError {
    #[error("Resource provider already admitted: {0}")]
    AlreadyAdmitted(ResourceProviderId),
    #[error("Attempted to remove an unknown resource provider: {0}")]
    UnknownResourceProvider(ResourceProviderId),
}

/// Errors returned to callers of the [`Registrar`](crate::registrar::Registrar).
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum RegistrarError {
    /// `apply` was called before `recover`.
    #[error("Attempted to apply the operation before recovering")]
    NotRecovered,
    #[error("Failed to recover registry: {0}")]
    RecoveryFailed(String),
    /// The operation itself was rejected; the rest of its batch is unaffected.
    #[error(transparent)]
    Rejected(#[from] OperationError),
    /// A commit failed. The registrar stays failed from here on.
    #[error("Failed to update registry: {0}")]
    UpdateFailed(String),
    #[error("Master registrar error: {0}")]
    Master(String),
    #[error("Actor closed")]
    ActorClosed,
    #[error("Actor dropped response channel")]
    ActorDropped,
}

impl RegistrarError {
    /// True for failures that disable the registrar permanently.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RegistrarError::UpdateFailed(_) | RegistrarError::RecoveryFailed(_)
        )
    }
}
