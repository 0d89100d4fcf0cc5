//! # Registrar Facade
//!
//! [`Registrar`] is the only entry point callers use. It owns one actor task
//! and exposes `recover` and `apply`; which actor runs behind it is decided
//! at construction:
//!
//! - [`Registrar::with_storage`] spawns a [`VersionedRegistrarActor`].
//! - [`Registrar::with_master`] spawns a [`MasterRegistrarActor`].
//!
//! Both actors accept the same [`RegistrarRequest`]s, so the facade does not
//! care which one it talks to.
//!
//! ```rust,ignore
//! let registrar = Registrar::with_storage(storage, &RegistrarConfig::default());
//! registrar.recover().await?;
//!
//! assert!(registrar.apply(AdmitResourceProvider::new("rp_1")).await?);
//! ```

pub mod master;
pub mod versioned;

pub use master::MasterRegistrarActor;
pub use versioned::VersionedRegistrarActor;

use crate::framework::{RegistrarError, RegistrarRequest};
use crate::lifecycle::RegistrarConfig;
use crate::master::MasterRegistrar;
use crate::operation::{Completion, Operation, RegistryOperation};
use crate::storage::VersionedStorage;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

/// Handle to a running registrar actor.
///
/// Dropping the `Registrar` aborts its actor. Operations still in flight are
/// abandoned and their [`Completion`]s resolve to
/// [`RegistrarError::ActorDropped`]. Use [`shutdown`](Self::shutdown) to let
/// the actor exit on its own instead.
pub struct Registrar {
    sender: mpsc::Sender<RegistrarRequest>,
    handle: Option<JoinHandle<()>>,
}

impl Registrar {
    /// Starts a registrar persisting to `storage` under `config.registry_key`.
    pub fn with_storage(storage: Arc<dyn VersionedStorage>, config: &RegistrarConfig) -> Self {
        let (actor, sender) = VersionedRegistrarActor::new(
            storage,
            config.registry_key.clone(),
            config.buffer_size.max(1),
        );
        Self {
            sender,
            handle: Some(tokio::spawn(actor.run())),
        }
    }

    /// Starts a registrar delegating to an existing master registrar.
    pub fn with_master(master: Arc<dyn MasterRegistrar>, config: &RegistrarConfig) -> Self {
        let (actor, sender) = MasterRegistrarActor::new(master, config.buffer_size.max(1));
        Self {
            sender,
            handle: Some(tokio::spawn(actor.run())),
        }
    }

    /// Loads the registry. Must be called before the first `apply`.
    ///
    /// Calling it again returns the outcome of the first call.
    #[instrument(skip(self))]
    pub async fn recover(&self) -> Result<(), RegistrarError> {
        debug!("Sending request");
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(RegistrarRequest::Recover { respond_to })
            .await
            .map_err(|_| RegistrarError::ActorClosed)?;
        response.await.map_err(|_| RegistrarError::ActorDropped)?
    }

    /// Hands an operation to the actor and returns without waiting for it.
    ///
    /// Operations are applied in the order they are submitted.
    #[instrument(skip(self, operation))]
    pub async fn submit(
        &self,
        operation: impl Into<RegistryOperation>,
    ) -> Result<Completion, RegistrarError> {
        let operation = operation.into();
        debug!(?operation, "Sending request");
        let (operation, completion) = Operation::new(operation);
        self.sender
            .send(RegistrarRequest::Apply { operation })
            .await
            .map_err(|_| RegistrarError::ActorClosed)?;
        Ok(completion)
    }

    /// Applies an operation and waits until it is committed.
    ///
    /// Resolves to `true` if the registry changed. Domain rejections come
    /// back as [`RegistrarError::Rejected`]; commit failures as
    /// [`RegistrarError::UpdateFailed`].
    pub async fn apply(
        &self,
        operation: impl Into<RegistryOperation>,
    ) -> Result<bool, RegistrarError> {
        self.submit(operation).await?.await.inspect_err(|error| {
            if error.is_terminal() {
                warn!(%error, "Registrar disabled; build a new one and recover to continue");
            }
        })
    }

    /// Closes the inbox and waits for the actor to exit.
    pub async fn shutdown(mut self) -> Result<(), RegistrarError> {
        let handle = self.handle.take();
        drop(self);

        if let Some(handle) = handle {
            handle.await.map_err(|_| RegistrarError::ActorDropped)?;
        }
        Ok(())
    }
}

impl Drop for Registrar {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
