//! Optimistic synchronization with the remote authority
//!
//! Every mutation lands in the [`OverlayStore`] first and is visible
//! immediately. The matching remote call is spawned afterwards and nobody
//! waits for it: failures are logged and counted, never rolled back, never
//! retried.
//!
//! Creates go out under a provisional `local-` id. While a create is in
//! flight, updates and deletes for that overlay are held back locally; once
//! the authoritative id arrives the engine swaps it in and, if the overlay
//! changed or was deleted in the meantime, sends one catch-up request.
//!
//! Remote updates carry the overlay's local revision so the authority can
//! discard writes that arrive out of order.

use futures_util::future::join_all;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::error::{SyncError, ValidationError};
use crate::overlay::model::{is_local_id, Overlay};
use crate::overlay::store::{OverlayMutations, OverlayStore};
use crate::protocol::{OverlayDraft, OverlayPatch, Settings, SettingsPatch};
use crate::sync::remote::RemoteApi;

/// Bookkeeping for a create whose response has not arrived yet
#[derive(Debug, Clone, Copy)]
struct PendingCreate {
    /// Revision the remote will know about once the create lands
    base_revision: u64,
    /// Deleted locally before the create resolved
    deleted: bool,
}

/// What to do once a create resolves
enum Reconcile {
    /// Local copy carries the authoritative id; push changes made since
    Confirmed { id: String, base_revision: u64 },
    /// Deleted locally while the create was in flight
    DeleteRemote { id: String },
    /// Gone locally without a user delete (collection replaced)
    Orphaned,
}

/// Counters for remote traffic
#[derive(Default)]
struct SyncCounters {
    creates_confirmed: AtomicU64,
    updates_sent: AtomicU64,
    deletes_sent: AtomicU64,
    remote_failures: AtomicU64,
}

/// Snapshot of sync statistics
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct SyncStats {
    pub creates_confirmed: u64,
    pub updates_sent: u64,
    pub deletes_sent: u64,
    pub remote_failures: u64,
    pub pending_creates: usize,
}

/// Store wrapper that mirrors mutations to the remote authority
pub struct SyncEngine {
    store: Arc<OverlayStore>,
    remote: Arc<dyn RemoteApi>,
    pending: Arc<Mutex<HashMap<String, PendingCreate>>>,
    in_flight: Mutex<Vec<JoinHandle<()>>>,
    counters: Arc<SyncCounters>,
}

impl SyncEngine {
    pub fn new(store: Arc<OverlayStore>, remote: Arc<dyn RemoteApi>) -> Self {
        Self {
            store,
            remote,
            pending: Arc::new(Mutex::new(HashMap::new())),
            in_flight: Mutex::new(Vec::new()),
            counters: Arc::new(SyncCounters::default()),
        }
    }

    pub fn store(&self) -> &Arc<OverlayStore> {
        &self.store
    }

    pub fn remote(&self) -> &Arc<dyn RemoteApi> {
        &self.remote
    }

    pub fn stats(&self) -> SyncStats {
        SyncStats {
            creates_confirmed: self.counters.creates_confirmed.load(Ordering::Relaxed),
            updates_sent: self.counters.updates_sent.load(Ordering::Relaxed),
            deletes_sent: self.counters.deletes_sent.load(Ordering::Relaxed),
            remote_failures: self.counters.remote_failures.load(Ordering::Relaxed),
            pending_creates: self.pending.lock().len(),
        }
    }

    /// Whether a create for `id` is still awaiting its response
    pub fn is_pending(&self, id: &str) -> bool {
        self.pending.lock().contains_key(id)
    }

    /// Wait for every remote call issued so far to finish.
    ///
    /// Mutations never need this; it exists for shutdown and tests.
    pub async fn flush(&self) {
        loop {
            let handles = std::mem::take(&mut *self.in_flight.lock());
            if handles.is_empty() {
                break;
            }
            for result in join_all(handles).await {
                if let Err(e) = result {
                    tracing::warn!("Remote sync task ended abnormally: {}", e);
                }
            }
        }
    }

    /// Replace the local collection with the remote one.
    ///
    /// Destructive: local-only overlays and unsynced edits are discarded. On
    /// failure the local collection is left as it was.
    pub async fn refresh(&self) -> Result<usize, SyncError> {
        let overlays = self.remote.list_overlays().await?;
        let count = overlays.len();
        self.store.replace_all(overlays);
        tracing::info!("Refreshed {} overlays from remote", count);
        Ok(count)
    }

    /// Re-fetch one overlay and overwrite the local copy
    pub async fn reload(&self, id: &str) -> Result<bool, SyncError> {
        let overlay = self.remote.get_overlay(id).await?;
        Ok(self.store.replace_one(overlay))
    }

    pub async fn fetch_settings(&self) -> Result<Settings, SyncError> {
        self.remote.get_settings().await
    }

    pub async fn save_settings(&self, patch: &SettingsPatch) -> Result<Settings, SyncError> {
        self.remote.update_settings(patch).await
    }

    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime.spawn(task),
            Err(_) => {
                tracing::warn!("No async runtime available; remote call skipped");
                return;
            }
        };
        let mut in_flight = self.in_flight.lock();
        in_flight.retain(|h| !h.is_finished());
        in_flight.push(handle);
    }

    fn spawn_create(&self, provisional: String, snapshot: Overlay) {
        let store = self.store.clone();
        let remote = self.remote.clone();
        let pending = self.pending.clone();
        let counters = self.counters.clone();

        self.spawn(async move {
            let created = match remote.create_overlay(&snapshot).await {
                Ok(created) => created,
                Err(e) => {
                    pending.lock().remove(&provisional);
                    counters.remote_failures.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(
                        "Failed to create overlay {}; keeping local copy: {}",
                        provisional,
                        e
                    );
                    return;
                }
            };
            counters.creates_confirmed.fetch_add(1, Ordering::Relaxed);

            // Resolve under the pending lock so a concurrent delete sees
            // either the provisional id or the final one, never neither.
            let reconcile = {
                let mut pending = pending.lock();
                let entry = pending.remove(&provisional);
                match entry {
                    Some(PendingCreate { deleted: true, .. }) => Reconcile::DeleteRemote {
                        id: created.id.clone(),
                    },
                    entry => {
                        let base_revision = entry.map_or(0, |p| p.base_revision);
                        if created.id == provisional
                            || store.reassign_id(&provisional, &created.id)
                        {
                            Reconcile::Confirmed {
                                id: created.id.clone(),
                                base_revision,
                            }
                        } else {
                            Reconcile::Orphaned
                        }
                    }
                }
            };

            match reconcile {
                Reconcile::Confirmed { id, base_revision } => {
                    tracing::info!("Overlay {} confirmed as {}", provisional, id);
                    let Some(current) = store.get(&id) else {
                        return;
                    };
                    if current.revision <= base_revision {
                        return;
                    }
                    let patch = OverlayPatch::from(&current);
                    match remote.update_overlay(&id, &patch).await {
                        Ok(_) => {
                            counters.updates_sent.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(e) => {
                            counters.remote_failures.fetch_add(1, Ordering::Relaxed);
                            tracing::warn!("Failed to push catch-up update for {}: {}", id, e);
                        }
                    }
                }
                Reconcile::DeleteRemote { id } => {
                    tracing::debug!("Overlay {} deleted before create resolved", provisional);
                    match remote.delete_overlay(&id).await {
                        Ok(()) => {
                            counters.deletes_sent.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(e) => {
                            counters.remote_failures.fetch_add(1, Ordering::Relaxed);
                            tracing::warn!("Failed to delete overlay {}: {}", id, e);
                        }
                    }
                }
                Reconcile::Orphaned => {
                    tracing::warn!(
                        "Overlay {} created remotely as {} but no longer present locally",
                        provisional,
                        created.id
                    );
                }
            }
        });
    }
}

impl OverlayMutations for SyncEngine {
    fn overlay(&self, id: &str) -> Option<Overlay> {
        self.store.get(id)
    }

    fn selected_id(&self) -> Option<String> {
        self.store.selected_id()
    }

    fn add(&self, draft: OverlayDraft) -> Result<String, ValidationError> {
        let (id, snapshot) = {
            let mut pending = self.pending.lock();
            let id = self.store.add(draft)?;
            let Some(snapshot) = self.store.get(&id) else {
                return Ok(id);
            };
            pending.insert(
                id.clone(),
                PendingCreate {
                    base_revision: snapshot.revision,
                    deleted: false,
                },
            );
            (id, snapshot)
        };

        self.spawn_create(id.clone(), snapshot);
        Ok(id)
    }

    fn update(&self, id: &str, patch: OverlayPatch) -> Option<u64> {
        let (revision, deferred) = {
            let pending = self.pending.lock();
            let revision = self.store.update(id, patch.clone())?;
            (revision, pending.contains_key(id))
        };

        if deferred {
            tracing::debug!("Update to {} held until its create resolves", id);
            return Some(revision);
        }
        if is_local_id(id) {
            tracing::debug!("Overlay {} is local-only; update not sent", id);
            return Some(revision);
        }

        let mut patch = patch;
        patch.revision = Some(revision);
        let id = id.to_string();
        let remote = self.remote.clone();
        let counters = self.counters.clone();
        self.spawn(async move {
            match remote.update_overlay(&id, &patch).await {
                Ok(_) => {
                    counters.updates_sent.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    counters.remote_failures.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!("Failed to update overlay {}: {}", id, e);
                }
            }
        });

        Some(revision)
    }

    fn remove(&self, id: &str) -> Option<Overlay> {
        let (removed, was_pending) = {
            let mut pending = self.pending.lock();
            let removed = self.store.remove(id)?;
            let was_pending = match pending.get_mut(id) {
                Some(entry) => {
                    entry.deleted = true;
                    true
                }
                None => false,
            };
            (removed, was_pending)
        };

        if was_pending || is_local_id(id) {
            return Some(removed);
        }

        let id = id.to_string();
        let remote = self.remote.clone();
        let counters = self.counters.clone();
        self.spawn(async move {
            match remote.delete_overlay(&id).await {
                Ok(()) => {
                    counters.deletes_sent.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    counters.remote_failures.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!("Failed to delete overlay {}: {}", id, e);
                }
            }
        });

        Some(removed)
    }

    fn select(&self, id: Option<&str>) -> bool {
        self.store.select(id)
    }
}
