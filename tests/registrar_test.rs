use resource_provider_registrar::framework::{OperationError, RegistrarError};
use resource_provider_registrar::lifecycle::RegistrarConfig;
use resource_provider_registrar::model::{Registry, ResourceProviderId};
use resource_provider_registrar::operation::{
    AdmitResourceProvider, RegistryOperation, RemoveResourceProvider,
};
use resource_provider_registrar::registrar::Registrar;
use resource_provider_registrar::storage::{InMemoryStorage, VersionedStorage};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn config() -> RegistrarConfig {
    RegistrarConfig::default()
}

async fn persisted(storage: &InMemoryStorage) -> Registry {
    storage
        .fetch(&config().registry_key)
        .await
        .expect("fetch failed")
        .map(|snapshot| snapshot.into_inner())
        .unwrap_or_default()
}

fn ids(registry: &Registry) -> Vec<&str> {
    registry.ids().map(ResourceProviderId::as_str).collect()
}

/// Admit and remove the same provider twice each, checking the stored
/// registry after every step.
#[tokio::test]
async fn test_admit_remove_scenario() {
    let storage = Arc::new(InMemoryStorage::new());
    let registrar = Registrar::with_storage(storage.clone(), &config());
    registrar.recover().await.expect("recover failed");

    assert_eq!(registrar.apply(AdmitResourceProvider::new("pv1")).await, Ok(true));
    assert_eq!(ids(&persisted(&storage).await), vec!["pv1"]);

    let duplicate = registrar.apply(AdmitResourceProvider::new("pv1")).await;
    assert_eq!(
        duplicate,
        Err(RegistrarError::Rejected(OperationError::AlreadyAdmitted("pv1".into())))
    );
    assert_eq!(ids(&persisted(&storage).await), vec!["pv1"]);

    assert_eq!(registrar.apply(RemoveResourceProvider::new("pv1")).await, Ok(true));
    assert!(persisted(&storage).await.is_empty());

    let unknown = registrar.apply(RemoveResourceProvider::new("pv1")).await;
    assert_eq!(
        unknown,
        Err(RegistrarError::Rejected(OperationError::UnknownResourceProvider(
            "pv1".into()
        )))
    );
    assert!(persisted(&storage).await.is_empty());

    registrar.shutdown().await.expect("shutdown failed");
}

#[tokio::test]
async fn test_apply_before_recover_is_rejected() {
    let storage = Arc::new(InMemoryStorage::new());
    let registrar = Registrar::with_storage(storage.clone(), &config());

    let result = registrar.apply(AdmitResourceProvider::new("pv1")).await;
    assert_eq!(result, Err(RegistrarError::NotRecovered));
    assert_eq!(storage.version(&config().registry_key).await, None);

    registrar.recover().await.unwrap();
    assert_eq!(registrar.apply(AdmitResourceProvider::new("pv1")).await, Ok(true));
}

#[tokio::test]
async fn test_back_to_back_submissions_both_commit() {
    let storage = Arc::new(InMemoryStorage::new());
    let registrar = Registrar::with_storage(storage.clone(), &config());
    registrar.recover().await.unwrap();

    // Neither completion is awaited before both are submitted.
    let first = registrar.submit(AdmitResourceProvider::new("A")).await.unwrap();
    let second = registrar.submit(AdmitResourceProvider::new("B")).await.unwrap();

    assert_eq!(first.await, Ok(true));
    assert_eq!(second.await, Ok(true));
    assert_eq!(ids(&persisted(&storage).await), vec!["A", "B"]);
}

/// Replaying a sequence through the registrar matches replaying it against a
/// plain set, with rejected operations leaving the set alone.
#[tokio::test]
async fn test_replayed_sequence_matches_set_model() {
    let sequence: Vec<RegistryOperation> = vec![
        AdmitResourceProvider::new("a").into(),
        AdmitResourceProvider::new("b").into(),
        AdmitResourceProvider::new("a").into(),
        RemoveResourceProvider::new("c").into(),
        AdmitResourceProvider::new("c").into(),
        RemoveResourceProvider::new("a").into(),
        AdmitResourceProvider::new("d").into(),
        RemoveResourceProvider::new("a").into(),
        AdmitResourceProvider::new("a").into(),
        RemoveResourceProvider::new("b").into(),
    ];

    let storage = Arc::new(InMemoryStorage::new());
    let registrar = Registrar::with_storage(storage.clone(), &config());
    registrar.recover().await.unwrap();

    let mut model: BTreeSet<String> = BTreeSet::new();
    for operation in sequence {
        let expected = match &operation {
            RegistryOperation::Admit(admit) => model.insert(admit.provider.id.to_string()),
            RegistryOperation::Remove(remove) => model.remove(remove.id.as_str()),
        };

        let result = registrar.apply(operation).await;
        assert_eq!(result.is_ok(), expected, "unexpected outcome {result:?}");

        let stored: BTreeSet<String> = persisted(&storage)
            .await
            .ids()
            .map(ToString::to_string)
            .collect();
        assert_eq!(stored, model);
    }
}

#[tokio::test]
async fn test_new_registrar_recovers_persisted_registry() {
    let storage = Arc::new(InMemoryStorage::new());

    let registrar = Registrar::with_storage(storage.clone(), &config());
    registrar.recover().await.unwrap();
    registrar.apply(AdmitResourceProvider::new("pv1")).await.unwrap();
    registrar.apply(AdmitResourceProvider::new("pv2")).await.unwrap();
    registrar.shutdown().await.unwrap();

    let restarted = Registrar::with_storage(storage.clone(), &config());
    restarted.recover().await.unwrap();

    let duplicate = restarted.apply(AdmitResourceProvider::new("pv2")).await;
    assert!(matches!(
        duplicate,
        Err(RegistrarError::Rejected(OperationError::AlreadyAdmitted(_)))
    ));
    assert_eq!(restarted.apply(RemoveResourceProvider::new("pv1")).await, Ok(true));
    assert_eq!(ids(&persisted(&storage).await), vec!["pv2"]);
}

#[tokio::test]
async fn test_recover_is_idempotent() {
    let storage = Arc::new(InMemoryStorage::new());
    let registrar = Registrar::with_storage(storage, &config());

    registrar.recover().await.unwrap();
    registrar.recover().await.unwrap();
    assert_eq!(registrar.apply(AdmitResourceProvider::new("pv1")).await, Ok(true));
    registrar.recover().await.unwrap();
}

/// Two registrars on one key: the one that writes second loses the race and
/// stays failed.
#[tokio::test]
async fn test_concurrent_writer_poisons_stale_registrar() {
    let storage = Arc::new(InMemoryStorage::new());
    let winner = Registrar::with_storage(storage.clone(), &config());
    let loser = Registrar::with_storage(storage.clone(), &config());
    winner.recover().await.unwrap();
    loser.recover().await.unwrap();

    assert_eq!(winner.apply(AdmitResourceProvider::new("A")).await, Ok(true));

    let conflict = RegistrarError::UpdateFailed("version mismatch".to_string());
    assert_eq!(loser.apply(AdmitResourceProvider::new("B")).await, Err(conflict.clone()));
    assert_eq!(loser.apply(AdmitResourceProvider::new("C")).await, Err(conflict));
    assert_eq!(
        loser.apply(AdmitResourceProvider::new("C")).await.unwrap_err().to_string(),
        "Failed to update registry: version mismatch"
    );

    // The winner is unaffected and the loser never wrote.
    assert_eq!(winner.apply(AdmitResourceProvider::new("D")).await, Ok(true));
    assert_eq!(ids(&persisted(&storage).await), vec!["A", "D"]);
    assert_eq!(storage.version(&config().registry_key).await, Some(2));

    // A fresh registrar picks up where the winner left off.
    drop(loser);
    let replacement = Registrar::with_storage(storage.clone(), &config());
    replacement.recover().await.unwrap();
    assert_eq!(replacement.apply(AdmitResourceProvider::new("B")).await, Ok(true));
}

#[tokio::test]
async fn test_separate_keys_do_not_conflict() {
    let storage = Arc::new(InMemoryStorage::new());
    let first = Registrar::with_storage(storage.clone(), &config().with_registry_key("one"));
    let second = Registrar::with_storage(storage.clone(), &config().with_registry_key("two"));
    first.recover().await.unwrap();
    second.recover().await.unwrap();

    assert_eq!(first.apply(AdmitResourceProvider::new("A")).await, Ok(true));
    assert_eq!(second.apply(AdmitResourceProvider::new("A")).await, Ok(true));
    assert_eq!(storage.version("one").await, Some(1));
    assert_eq!(storage.version("two").await, Some(1));
}

/// A producer keeping the inbox busy must not hold back the commit of an
/// operation that was submitted before it.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_commit_lands_while_inbox_stays_busy() {
    let storage = Arc::new(InMemoryStorage::new());
    let registrar = Arc::new(Registrar::with_storage(storage, &config()));
    registrar.recover().await.unwrap();

    let first = registrar.submit(AdmitResourceProvider::new("first")).await.unwrap();

    let stop = Arc::new(AtomicBool::new(false));
    let producer = tokio::spawn({
        let registrar = registrar.clone();
        let stop = stop.clone();
        async move {
            let mut submitted = 0usize;
            while submitted < 2_000 && !stop.load(Ordering::SeqCst) {
                let id = format!("rp_{submitted}");
                if registrar.submit(AdmitResourceProvider::new(id)).await.is_err() {
                    break;
                }
                submitted += 1;
            }
            submitted
        }
    });

    let result = tokio::time::timeout(Duration::from_secs(5), first)
        .await
        .expect("first commit never landed");
    stop.store(true, Ordering::SeqCst);
    producer.await.unwrap();

    assert_eq!(result, Ok(true));
}
