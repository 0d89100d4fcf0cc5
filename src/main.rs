//! Runs a short registrar session against the in-memory store.

use resource_provider_registrar::lifecycle::{setup_tracing, RegistrarConfig};
use resource_provider_registrar::operation::{AdmitResourceProvider, RemoveResourceProvider};
use resource_provider_registrar::registrar::Registrar;
use resource_provider_registrar::storage::{InMemoryStorage, VersionedStorage};
use std::sync::Arc;
use tracing::{error, info, Instrument};

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();

    let config = RegistrarConfig::from_env().map_err(|e| e.to_string())?;
    let storage = Arc::new(InMemoryStorage::new());
    let registrar = Registrar::with_storage(storage.clone(), &config);

    registrar.recover().await.map_err(|e| e.to_string())?;

    let span = tracing::info_span!("admission");
    async {
        // Submitted back to back; both land in the registry.
        let first = registrar.submit(AdmitResourceProvider::new("rp_1")).await;
        let second = registrar.submit(AdmitResourceProvider::new("rp_2")).await;
        for completion in [first, second] {
            match completion.map_err(|e| e.to_string())?.await {
                Ok(mutated) => info!(mutated, "Admitted"),
                Err(e) => error!(error = %e, "Admission failed"),
            }
        }

        if let Err(e) = registrar.apply(AdmitResourceProvider::new("rp_1")).await {
            info!(error = %e, "Duplicate admission rejected");
        }
        Ok::<_, String>(())
    }
    .instrument(span)
    .await?;

    let span = tracing::info_span!("removal");
    async {
        match registrar.apply(RemoveResourceProvider::new("rp_1")).await {
            Ok(mutated) => info!(mutated, "Removed"),
            Err(e) => error!(error = %e, "Removal failed"),
        }
    }
    .instrument(span)
    .await;

    if let Some(snapshot) = storage
        .fetch(&config.registry_key)
        .await
        .map_err(|e| e.to_string())?
    {
        let ids: Vec<String> = snapshot.get().ids().map(ToString::to_string).collect();
        info!(version = snapshot.version(), ?ids, "Persisted registry");
    }

    registrar.shutdown().await.map_err(|e| e.to_string())?;
    info!("Application completed successfully");
    Ok(())
}
