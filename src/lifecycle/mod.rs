//! # Runtime Setup
//!
//! Everything a process needs before it constructs a
//! [`Registrar`](crate::registrar::Registrar):
//!
//! - [`RegistrarConfig`] - storage key and inbox capacity, from defaults or the environment
//! - [`setup_tracing`] - structured logging controlled by `RUST_LOG`

pub mod config;
pub mod tracing;

pub use self::config::*;
pub use self::tracing::*;
