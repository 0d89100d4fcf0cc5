//! # Registry Operations
//!
//! An [`Operation`] is the unit of work handed to a registrar: a
//! [`RegistryOperation`] (what to change) plus the reply slot of the caller
//! waiting on it. The caller keeps the matching [`Completion`].
//!
//! The set of mutations is closed. Adding a kind means adding a
//! [`RegistryOperation`] variant, which keeps every batch loop exhaustive.

mod actions;

pub use actions::*;

use crate::framework::{OperationError, RegistrarError, Response};
use crate::model::Registry;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Every mutation a registrar knows how to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryOperation {
    Admit(AdmitResourceProvider),
    Remove(RemoveResourceProvider),
}

impl RegistryOperation {
    /// Applies the mutation to `registry` in place.
    ///
    /// Returns `Ok(true)` when the registry changed. On error the registry is
    /// left untouched.
    pub fn perform(&self, registry: &mut Registry) -> Result<bool, OperationError> {
        match self {
            RegistryOperation::Admit(admit) => admit.perform(registry),
            RegistryOperation::Remove(remove) => remove.perform(registry),
        }
    }
}

impl From<AdmitResourceProvider> for RegistryOperation {
    fn from(operation: AdmitResourceProvider) -> Self {
        RegistryOperation::Admit(operation)
    }
}

impl From<RemoveResourceProvider> for RegistryOperation {
    fn from(operation: RemoveResourceProvider) -> Self {
        RegistryOperation::Remove(operation)
    }
}

/// A queued mutation together with the reply slot of its issuer.
///
/// `apply` runs at most once, and exactly one of `mark_succeeded` or `fail`
/// consumes the operation afterwards.
#[derive(Debug)]
pub struct Operation {
    mutation: RegistryOperation,
    outcome: Option<Result<bool, OperationError>>,
    respond_to: Response<bool>,
}

impl Operation {
    pub fn new(mutation: impl Into<RegistryOperation>) -> (Self, Completion) {
        let (respond_to, response) = oneshot::channel();
        let operation = Self {
            mutation: mutation.into(),
            outcome: None,
            respond_to,
        };
        (operation, Completion { response })
    }

    pub fn mutation(&self) -> &RegistryOperation {
        &self.mutation
    }

    /// Applies the mutation to a working snapshot and remembers the outcome.
    pub fn apply(&mut self, registry: &mut Registry) -> Result<bool, OperationError> {
        debug_assert!(self.outcome.is_none(), "operation applied twice");
        let result = self.mutation.perform(registry);
        self.outcome = Some(result.clone());
        result
    }

    /// Whether the last `apply` went through.
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, Some(Ok(_)))
    }

    /// Resolves the completion from the `apply` outcome, once the snapshot
    /// it was applied to has been committed.
    pub fn mark_succeeded(self) {
        let result = match self.outcome {
            Some(Ok(mutated)) => Ok(mutated),
            Some(Err(error)) => Err(RegistrarError::Rejected(error)),
            None => Ok(false),
        };
        let _ = self.respond_to.send(result);
    }

    /// Resolves the completion with `error`, regardless of the `apply` outcome.
    pub fn fail(self, error: RegistrarError) {
        let _ = self.respond_to.send(Err(error));
    }

    /// Splits the mutation from its reply slot, for backends that report
    /// results on their own.
    pub fn into_parts(self) -> (RegistryOperation, Response<bool>) {
        (self.mutation, self.respond_to)
    }
}

/// Resolves once the registrar has committed or failed the operation.
///
/// Resolves to [`RegistrarError::ActorDropped`] if the registrar went away
/// without answering.
#[derive(Debug)]
pub struct Completion {
    response: oneshot::Receiver<Result<bool, RegistrarError>>,
}

impl Future for Completion {
    type Output = Result<bool, RegistrarError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.response)
            .poll(cx)
            .map(|result| result.unwrap_or(Err(RegistrarError::ActorDropped)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mark_succeeded_reports_mutation() {
        let mut registry = Registry::new();
        let (mut operation, completion) = Operation::new(AdmitResourceProvider::new("pv1"));

        assert_eq!(operation.apply(&mut registry), Ok(true));
        assert!(operation.succeeded());
        operation.mark_succeeded();

        assert_eq!(completion.await, Ok(true));
    }

    #[tokio::test]
    async fn test_mark_succeeded_reports_rejection() {
        let mut registry = Registry::new();
        let (mut operation, completion) = Operation::new(RemoveResourceProvider::new("pv1"));

        assert!(operation.apply(&mut registry).is_err());
        assert!(!operation.succeeded());
        operation.mark_succeeded();

        assert_eq!(
            completion.await,
            Err(RegistrarError::Rejected(
                OperationError::UnknownResourceProvider("pv1".into())
            ))
        );
    }

    #[tokio::test]
    async fn test_fail_overrides_apply_outcome() {
        let mut registry = Registry::new();
        let (mut operation, completion) = Operation::new(AdmitResourceProvider::new("pv1"));
        operation.apply(&mut registry).unwrap();

        operation.fail(RegistrarError::UpdateFailed("discarded".to_string()));
        assert_eq!(
            completion.await,
            Err(RegistrarError::UpdateFailed("discarded".to_string()))
        );
    }

    #[tokio::test]
    async fn test_dropped_operation_resolves_as_actor_dropped() {
        let (operation, completion) = Operation::new(AdmitResourceProvider::new("pv1"));
        drop(operation);
        assert_eq!(completion.await, Err(RegistrarError::ActorDropped));
    }
}
