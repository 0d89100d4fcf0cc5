//! Plumbing shared by both registrar actors.
//!
//! # Main Components
//!
//! - [`RegistrarRequest`] - Messages accepted by a registrar actor
//! - [`RegistrarError`] / [`OperationError`] - Error types
//!
//! # Testing
//!
//! See [`mock`] for storage and master registrar doubles.

pub mod error;
pub mod message;
pub mod mock;

pub use error::{OperationError, RegistrarError};
pub use message::{RegistrarRequest, Response};
