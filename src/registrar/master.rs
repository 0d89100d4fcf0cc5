//! # Master Registrar Actor
//!
//! Delegates persistence to a [`MasterRegistrar`] that already batches and
//! versions its own registry document. This actor keeps no pending batch and
//! no registry copy; it only translates an [`Operation`] into the master's
//! [`RegistryMutation`] protocol and forwards the verdict back.

use crate::framework::{OperationError, RegistrarError, RegistrarRequest, Response};
use crate::master::{MasterError, MasterReceipt, MasterRegistrar, MasterRegistry, RegistryMutation};
use crate::operation::{Operation, RegistryOperation};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Runs a resource provider mutation against the resource provider section
/// of the master document.
struct AdaptedOperation {
    mutation: RegistryOperation,
}

impl RegistryMutation for AdaptedOperation {
    fn perform(&mut self, registry: &mut MasterRegistry) -> Result<bool, OperationError> {
        self.mutation.perform(&mut registry.resource_provider_registry)
    }
}

type Forward = (MasterReceipt, Response<bool>);

/// The registrar actor that delegates to a master registrar.
///
/// The master may settle mutations in any order. Receipts are handed to a
/// single forwarder task that awaits them one by one, so callers are answered
/// in submission order.
pub struct MasterRegistrarActor {
    receiver: mpsc::Receiver<RegistrarRequest>,
    master: Arc<dyn MasterRegistrar>,
    buffer_size: usize,
}

impl MasterRegistrarActor {
    pub fn new(
        master: Arc<dyn MasterRegistrar>,
        buffer_size: usize,
    ) -> (Self, mpsc::Sender<RegistrarRequest>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            receiver,
            master,
            buffer_size,
        };
        (actor, sender)
    }

    pub async fn run(mut self) {
        info!("Master registrar started");

        let (forward, receipts) = mpsc::channel(self.buffer_size);
        let forwarder = tokio::spawn(forward_receipts(receipts));

        while let Some(request) = self.receiver.recv().await {
            match request {
                // The master recovers its own document.
                RegistrarRequest::Recover { respond_to } => {
                    debug!("Recover");
                    let _ = respond_to.send(Ok(()));
                }
                RegistrarRequest::Apply { operation } => self.apply(operation, &forward).await,
            }
        }

        // Let the forwarder answer everything already handed to the master.
        drop(forward);
        if forwarder.await.is_err() {
            warn!("Receipt forwarder aborted");
        }
        info!("Shutdown");
    }

    async fn apply(&self, operation: Operation, forward: &mpsc::Sender<Forward>) {
        let (mutation, respond_to) = operation.into_parts();
        debug!(?mutation, "Apply");

        let receipt = self.master.apply(Box::new(AdaptedOperation { mutation }));
        if let Err(mpsc::error::SendError((_, respond_to))) =
            forward.send((receipt, respond_to)).await
        {
            let _ = respond_to.send(Err(RegistrarError::Master("discarded".to_string())));
        }
    }
}

async fn forward_receipts(mut receipts: mpsc::Receiver<Forward>) {
    while let Some((receipt, respond_to)) = receipts.recv().await {
        let result = match receipt.await {
            Ok(Ok(mutated)) => Ok(mutated),
            Ok(Err(MasterError::Rejected(error))) => Err(RegistrarError::Rejected(error)),
            Ok(Err(MasterError::Failed(message))) => Err(RegistrarError::Master(message)),
            Err(_) => Err(RegistrarError::Master("discarded".to_string())),
        };
        let _ = respond_to.send(result);
    }
}
