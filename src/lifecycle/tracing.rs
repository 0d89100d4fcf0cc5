//! # Observability & Tracing
//!
//! [`setup_tracing`] installs a compact `tracing-subscriber` formatter filtered
//! by `RUST_LOG`.
//!
//! ```bash
//! RUST_LOG=info cargo run     # recoveries, commits, shutdown
//! RUST_LOG=debug cargo run    # every request with its mutation
//! ```
//!
//! With `RUST_LOG=info` a short session looks like:
//!
//! ```text
//! INFO Registrar started key=RESOURCE_PROVIDER_REGISTRAR
//! INFO Recovered key=RESOURCE_PROVIDER_REGISTRAR version=0 size=0
//! INFO Committed key=RESOURCE_PROVIDER_REGISTRAR version=1 size=2 batch=2
//! WARN Failed to apply operation on resource provider registry key=... error=Resource provider already admitted: rp_1
//! ```
//!
//! Commit failures log `Registrar aborting` at `ERROR` with the cause.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
