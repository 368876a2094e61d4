use super::{CollectionDiff, IdentifiedVec, Keyed, UNASSIGNED_KEY};
use crate::config::SyncConfig;
use crate::key::{identity_eq, KeyIdentity, PersistenceKey, SyncKind};
use crate::state::{Ledger, SyncStats, WriteKind};
use kvmirror_storage::{CollectionPath, StoragePort, Subscription, TypedStorage};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, trace};

/// Synchronizes a collection whose items carry their own remote key.
///
/// A local save is diffed against the last applied state and only the
/// difference is written. Items keyed with [`super::UNASSIGNED_KEY`] are
/// added under a backend-generated key, which arrives with the next remote
/// snapshot. Until then such an item has no address: removing or changing
/// it is reported as unmappable instead of written.
pub struct KeyedSync<T> {
    storage: Arc<dyn StoragePort>,
    path: CollectionPath<T>,
    mirror: Arc<Mutex<IdentifiedVec<Keyed<T>>>>,
    ledger: Arc<Ledger>,
}

impl<T> KeyedSync<T> {
    /// Creates a synchronizer for `path` on `storage`.
    pub fn new(storage: Arc<dyn StoragePort>, path: CollectionPath<T>, config: SyncConfig) -> Self {
        Self {
            storage,
            path,
            mirror: Arc::new(Mutex::new(IdentifiedVec::new())),
            ledger: Arc::new(Ledger::new(&config)),
        }
    }

    /// Returns the address and storage identity of this synchronizer.
    pub fn identity(&self) -> KeyIdentity {
        KeyIdentity::new(self.path.raw(), &self.storage)
    }

    /// Returns a snapshot of the statistics.
    pub fn stats(&self) -> SyncStats {
        self.ledger.stats()
    }
}

impl<T> PersistenceKey for KeyedSync<T>
where
    T: Serialize + DeserializeOwned + PartialEq + Clone + Send + Sync + 'static,
{
    type Value = IdentifiedVec<Keyed<T>>;

    fn kind(&self) -> SyncKind {
        SyncKind::NaturallyKeyed
    }

    fn identity(&self) -> KeyIdentity {
        KeyedSync::identity(self)
    }

    fn load(&self, fallback: Option<Self::Value>) -> Option<Self::Value> {
        fallback
    }

    fn save(&self, new: Self::Value) {
        // The mirror moves first so the echo of our own writes is suppressed.
        let diff = {
            let mut mirror = self.mirror.lock();
            let diff = (*mirror != new).then(|| CollectionDiff::between(&*mirror, &new));
            *mirror = new.clone();
            diff
        };
        let diff = match diff {
            Some(diff) if !diff.is_empty() => diff,
            _ => {
                trace!(path = %self.path, "collection unchanged, nothing to write");
                self.ledger.record_skipped();
                return;
            }
        };

        for id in &diff.added {
            let Some(item) = new.get(id) else { continue };
            if item.is_unassigned() {
                let result = self.storage.add_value(&self.path, &item.value);
                self.ledger
                    .record_write(WriteKind::Add, &self.path.rendered(), result);
            } else {
                let child = self.path.child(id);
                let result = self.storage.save_value(&child, &item.value);
                self.ledger.record_write(WriteKind::Save, &child.rendered(), result);
            }
        }
        for id in &diff.removed {
            if id == UNASSIGNED_KEY {
                self.ledger.record_unmappable(&self.path.rendered(), format!("{id:?}"));
                continue;
            }
            let child = self.path.child(id);
            let result = self.storage.remove_value(&child);
            self.ledger.record_write(WriteKind::Remove, &child.rendered(), result);
        }
        for id in &diff.updated {
            let Some(item) = new.get(id) else { continue };
            // Still waiting for the backend key of its add.
            if item.is_unassigned() {
                self.ledger.record_unmappable(&self.path.rendered(), format!("{id:?}"));
                continue;
            }
            let child = self.path.child(id);
            let result = self.storage.save_value(&child, &item.value);
            self.ledger.record_write(WriteKind::Save, &child.rendered(), result);
        }

        debug!(
            path = %self.path,
            added = diff.added.len(),
            removed = diff.removed.len(),
            updated = diff.updated.len(),
            "applied collection diff"
        );
    }

    fn subscribe<F>(&self, _fallback: Option<Self::Value>, on_change: F) -> Subscription
    where
        F: Fn(Self::Value) + Send + Sync + 'static,
    {
        let mirror = Arc::clone(&self.mirror);
        let ledger = Arc::clone(&self.ledger);
        self.storage.listen_collection(&self.path, move |records: Vec<(String, T)>| {
            let snapshot: IdentifiedVec<Keyed<T>> = records
                .into_iter()
                .map(|(key, value)| Keyed::new(key, value))
                .collect();
            let changed = {
                let mut mirror = mirror.lock();
                if *mirror == snapshot {
                    false
                } else {
                    *mirror = snapshot.clone();
                    true
                }
            };
            ledger.record_remote(changed);
            if changed {
                on_change(snapshot);
            }
        })
    }
}

identity_eq!(KeyedSync<T>);
