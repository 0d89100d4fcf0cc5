//! # Versioned-Store Registrar Actor
//!
//! Keeps the resource provider [`Registry`] in a [`VersionedStorage`] backend.
//!
//! ## Lifecycle
//!
//! ```text
//! NotStarted --recover--> Recovering --fetch ok--> Recovered
//!                              \--fetch failed--> Failed (sticky)
//! ```
//!
//! Once recovered, the commit [`Phase`] cycles `Active -> Committing -> Active`
//! for as long as stores succeed. The first failed store moves it to
//! `Failed`, and it never leaves that state.
//!
//! ## Batching
//!
//! Operations accepted while a store is in flight wait in `pending`. When the
//! store lands, the whole queue is taken at once, applied in arrival order to a
//! copy of the registry, and written with a single compare-and-swap. Storage
//! calls run in spawned tasks; the actor keeps reading its inbox while they
//! are outstanding.

use crate::framework::{RegistrarError, RegistrarRequest, Response};
use crate::model::Registry;
use crate::operation::Operation;
use crate::storage::{StorageError, VersionedHandle, VersionedStorage};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};

type StorageResult = Result<Option<VersionedHandle<Registry>>, StorageError>;

enum Recovery {
    NotStarted,
    Recovering {
        fetch: JoinHandle<StorageResult>,
        waiters: Vec<Response<()>>,
    },
    Recovered {
        snapshot: VersionedHandle<Registry>,
    },
    Failed(String),
}

enum Phase {
    Active,
    Committing {
        store: JoinHandle<StorageResult>,
        applied: VecDeque<Operation>,
    },
    Failed(String),
}

/// The registrar actor backed by a private versioned store.
///
/// ## Concurrency Model
///
/// The actor task is the only owner of the recovered snapshot, the commit
/// phase and the pending queue, so none of them sit behind a lock. Callers
/// reach it only through the inbox.
///
/// Storage calls never run on the actor task. `fetch` and `store` are spawned,
/// and their `JoinHandle`s live inside `Recovery` and `Phase`; the event
/// loop waits on them next to the inbox. A slow backend therefore delays
/// commits but never stops the actor from accepting and queueing requests.
///
/// The loop polls storage completions before the inbox. A landed commit is
/// what moves the queue forward, so a busy inbox cannot hold it back. Before
/// building the next batch, the actor pulls in the requests already waiting in
/// the inbox so they join that batch.
///
/// ## Usage
///
/// 1. Create it with [`new`](Self::new), keeping the returned sender.
/// 2. Spawn [`run`](Self::run) on the runtime.
/// 3. Send [`RegistrarRequest`]s; the [`Registrar`](crate::registrar::Registrar)
///    facade does all three.
pub struct VersionedRegistrarActor {
    receiver: mpsc::Receiver<RegistrarRequest>,
    storage: Arc<dyn VersionedStorage>,
    key: String,
    recovery: Recovery,
    phase: Phase,
    pending: VecDeque<Operation>,
}

impl VersionedRegistrarActor {
    /// Creates the actor and the sender half of its inbox.
    ///
    /// The actor does nothing until [`run`](Self::run) is spawned.
    pub fn new(
        storage: Arc<dyn VersionedStorage>,
        key: impl Into<String>,
        buffer_size: usize,
    ) -> (Self, mpsc::Sender<RegistrarRequest>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            receiver,
            storage,
            key: key.into(),
            recovery: Recovery::NotStarted,
            phase: Phase::Active,
            pending: VecDeque::new(),
        };
        (actor, sender)
    }

    /// Runs the actor's event loop until every sender is dropped.
    pub async fn run(mut self) {
        info!(key = %self.key, "Registrar started");

        loop {
            tokio::select! {
                biased;
                fetched = fetch_completed(&mut self.recovery) => self.recovered(fetched),
                stored = store_completed(&mut self.phase) => self.updated(stored),
                request = self.receiver.recv() => match request {
                    Some(request) => self.handle(request),
                    None => break,
                },
            }
        }

        info!(key = %self.key, pending = self.pending.len(), "Shutdown");
    }

    fn handle(&mut self, request: RegistrarRequest) {
        match request {
            RegistrarRequest::Recover { respond_to } => self.recover(respond_to),
            RegistrarRequest::Apply { operation } => self.apply(operation),
        }
    }

    /// Handles the requests already buffered in the inbox, without waiting for
    /// more. Called while a fetch or store has just landed, so operations
    /// among them are queued for the next batch.
    fn absorb_inbox(&mut self) {
        for _ in 0..self.receiver.len() {
            match self.receiver.try_recv() {
                Ok(request) => self.handle(request),
                Err(_) => break,
            }
        }
    }

    fn recover(&mut self, respond_to: Response<()>) {
        match &mut self.recovery {
            Recovery::NotStarted => {
                debug!(key = %self.key, "Recover");
                let storage = Arc::clone(&self.storage);
                let key = self.key.clone();
                let fetch = tokio::spawn(async move { storage.fetch(&key).await });
                self.recovery = Recovery::Recovering {
                    fetch,
                    waiters: vec![respond_to],
                };
            }
            Recovery::Recovering { waiters, .. } => waiters.push(respond_to),
            Recovery::Recovered { .. } => {
                let _ = respond_to.send(Ok(()));
            }
            Recovery::Failed(message) => {
                let _ = respond_to.send(Err(RegistrarError::RecoveryFailed(message.clone())));
            }
        }
    }

    fn apply(&mut self, operation: Operation) {
        debug!(key = %self.key, mutation = ?operation.mutation(), "Apply");

        match &self.recovery {
            Recovery::NotStarted => {
                warn!(key = %self.key, "Apply before recover");
                operation.fail(RegistrarError::NotRecovered);
            }
            Recovery::Failed(message) => {
                operation.fail(RegistrarError::RecoveryFailed(message.clone()));
            }
            // Picked up by the first batch after recovery.
            Recovery::Recovering { .. } => self.pending.push_back(operation),
            Recovery::Recovered { .. } => {
                if let Phase::Failed(cause) = &self.phase {
                    operation.fail(RegistrarError::UpdateFailed(cause.clone()));
                    return;
                }

                self.pending.push_back(operation);
                if matches!(self.phase, Phase::Active) {
                    self.update();
                }
            }
        }
    }

    fn recovered(&mut self, fetched: Result<StorageResult, JoinError>) {
        self.absorb_inbox();

        let waiters = match std::mem::replace(&mut self.recovery, Recovery::NotStarted) {
            Recovery::Recovering { waiters, .. } => waiters,
            other => {
                self.recovery = other;
                return;
            }
        };

        let message = match fetched {
            Ok(Ok(snapshot)) => {
                let snapshot = snapshot
                    .unwrap_or_else(|| VersionedHandle::absent(self.key.clone(), Registry::new()));
                info!(
                    key = %self.key,
                    version = snapshot.version(),
                    size = snapshot.get().len(),
                    "Recovered"
                );
                self.recovery = Recovery::Recovered { snapshot };
                for waiter in waiters {
                    let _ = waiter.send(Ok(()));
                }
                self.update();
                return;
            }
            Ok(Err(StorageError::Discarded)) | Err(_) => "discarded".to_string(),
            Ok(Err(error)) => error.to_string(),
        };

        error!(key = %self.key, error = %message, "Recovery failed");
        let error = RegistrarError::RecoveryFailed(message.clone());
        for waiter in waiters {
            let _ = waiter.send(Err(error.clone()));
        }
        for operation in self.pending.drain(..) {
            operation.fail(error.clone());
        }
        self.recovery = Recovery::Failed(message);
    }

    /// Starts a batch commit if one can run.
    fn update(&mut self) {
        if !matches!(self.phase, Phase::Active) || self.pending.is_empty() {
            return;
        }
        let Recovery::Recovered { snapshot } = &self.recovery else {
            return;
        };

        let mut updated = snapshot.get().clone();
        let mut applied = std::mem::take(&mut self.pending);

        for operation in applied.iter_mut() {
            if let Err(error) = operation.apply(&mut updated) {
                warn!(
                    key = %self.key,
                    mutation = ?operation.mutation(),
                    %error,
                    "Failed to apply operation on resource provider registry"
                );
            }
        }

        let handle = snapshot.mutate(updated);
        let rejected = applied.iter().filter(|operation| !operation.succeeded()).count();
        debug!(
            key = %self.key,
            version = handle.version(),
            batch = applied.len(),
            rejected,
            "Storing registry"
        );

        let storage = Arc::clone(&self.storage);
        let store = tokio::spawn(async move { storage.store(handle).await });
        self.phase = Phase::Committing { store, applied };
    }

    fn updated(&mut self, stored: Result<StorageResult, JoinError>) {
        self.absorb_inbox();

        let applied = match std::mem::replace(&mut self.phase, Phase::Active) {
            Phase::Committing { applied, .. } => applied,
            other => {
                self.phase = other;
                return;
            }
        };

        let cause = match stored {
            Ok(Ok(Some(snapshot))) => {
                info!(
                    key = %self.key,
                    version = snapshot.version(),
                    size = snapshot.get().len(),
                    batch = applied.len(),
                    "Committed"
                );
                self.recovery = Recovery::Recovered { snapshot };
                for operation in applied {
                    operation.mark_succeeded();
                }
                self.update();
                return;
            }
            Ok(Ok(None)) => "version mismatch".to_string(),
            Ok(Err(StorageError::Discarded)) | Err(_) => "discarded".to_string(),
            Ok(Err(error)) => error.to_string(),
        };

        error!(key = %self.key, %cause, "Registrar aborting");
        let error = RegistrarError::UpdateFailed(cause.clone());
        for operation in applied.into_iter().chain(self.pending.drain(..)) {
            operation.fail(error.clone());
        }
        self.phase = Phase::Failed(cause);
    }
}

async fn fetch_completed(recovery: &mut Recovery) -> Result<StorageResult, JoinError> {
    match recovery {
        Recovery::Recovering { fetch, .. } => fetch.await,
        _ => std::future::pending().await,
    }
}

async fn store_completed(phase: &mut Phase) -> Result<StorageResult, JoinError> {
    match phase {
        Phase::Committing { store, .. } => store.await,
        _ => std::future::pending().await,
    }
}
