//! # Registrar Messages
//!
//! Requests sent from the [`Registrar`](crate::registrar::Registrar) facade
//! into whichever actor backs it. Both actor strategies consume the same
//! request type.

use crate::framework::RegistrarError;
use crate::operation::Operation;
use tokio::sync::oneshot;

/// Type alias for the one-shot response channel used by actors.
pub type Response<T> = oneshot::Sender<Result<T, RegistrarError>>;

#[derive(Debug)]
pub enum RegistrarRequest {
    Recover { respond_to: Response<()> },
    /// The operation carries its own reply slot.
    Apply { operation: Operation },
}
