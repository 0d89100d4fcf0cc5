//! Pure data structures persisted by the registrar.

pub mod registry;

pub use registry::*;
