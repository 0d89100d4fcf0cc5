//! # Resource Provider Registrar
//!
//! > **An actor that keeps the resource provider registry consistent with its storage.**
//!
//! Every admission or removal of a resource provider goes through a single
//! [`Registrar`](registrar::Registrar). Behind it, one Tokio task owns the
//! registry and serializes all mutations, so the persisted registry only ever
//! moves forward one consistent snapshot at a time.
//!
//! ## 🏗️ Two Backing Strategies
//!
//! - **Versioned store**: the registrar recovers the registry from a
//!   [`VersionedStorage`](storage::VersionedStorage) backend, batches queued
//!   operations, and writes each batch with one compare-and-swap. A failed or
//!   conflicting write disables the registrar for good; build a new one (and
//!   recover again) to continue.
//! - **Master delegation**: the registrar hands operations to an existing
//!   [`MasterRegistrar`](master::MasterRegistrar), which owns batching,
//!   persistence and versioning of a larger document.
//!
//! The strategy is picked at construction and callers only ever see
//! `recover()` and `apply()`.
//!
//! ## 👩‍💻 Architecture Notes
//!
//! ### 1. Operations
//! [`RegistryOperation`](operation::RegistryOperation) is a closed set of
//! mutations ([`AdmitResourceProvider`](operation::AdmitResourceProvider),
//! [`RemoveResourceProvider`](operation::RemoveResourceProvider)). A rejected
//! operation fails only its own caller; the rest of its batch still commits.
//!
//! ### 2. Concurrency Model
//! Each registrar actor runs in its own task and processes its inbox
//! sequentially (no locks needed for its state). Storage calls run in
//! spawned tasks, so requests keep arriving while a write is in flight and
//! form the next batch.
//!
//! ### 3. Observability
//! `tracing` everywhere with structured fields. See [`lifecycle::tracing`].
//!
//! ## 🗺️ Module Tour
//!
//! - [`model`]: [`Registry`](model::Registry) and [`ResourceProvider`](model::ResourceProvider).
//! - [`operation`]: the mutations and their completion handles.
//! - [`registrar`]: the facade and both actors.
//! - [`storage`] / [`master`]: the collaborator interfaces, plus an in-memory store.
//! - [`framework`]: messages, errors and test doubles.
//! - [`lifecycle`]: configuration and tracing setup.
//!
//! ## 🚀 Quick Start
//!
//! ```rust,ignore
//! let storage = Arc::new(InMemoryStorage::new());
//! let registrar = Registrar::with_storage(storage, &RegistrarConfig::default());
//!
//! registrar.recover().await?;
//! registrar.apply(AdmitResourceProvider::new("rp_1")).await?;
//! registrar.apply(RemoveResourceProvider::new("rp_1")).await?;
//! ```
//!
//! ```bash
//! RUST_LOG=info cargo run
//! ```

pub mod framework;
pub mod lifecycle;
pub mod master;
pub mod model;
pub mod operation;
pub mod registrar;
pub mod storage;
