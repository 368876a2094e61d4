use super::{CollectionDiff, IdentifiedVec, Identifiable};
use crate::config::SyncConfig;
use crate::key::{identity_eq, KeyIdentity, PersistenceKey, SyncKind};
use crate::state::{Ledger, SyncStats, WriteKind};
use kvmirror_storage::{CollectionPath, StoragePort, Subscription, TypedStorage};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// Synchronizes a collection of identifiable items whose remote keys are
/// generated by the backend.
///
/// New items are always added. Removals and updates need the remote key of
/// the item, which is learned from the most recent remote snapshot; items
/// without one are skipped and reported as unmappable.
pub struct IdentifiedSync<T: Identifiable> {
    storage: Arc<dyn StoragePort>,
    path: CollectionPath<T>,
    mirror: Arc<Mutex<IdentifiedVec<T>>>,
    remote_keys: Arc<Mutex<HashMap<T::Id, String>>>,
    ledger: Arc<Ledger>,
}

impl<T: Identifiable> IdentifiedSync<T> {
    /// Creates a synchronizer for `path` on `storage`.
    pub fn new(storage: Arc<dyn StoragePort>, path: CollectionPath<T>, config: SyncConfig) -> Self {
        Self {
            storage,
            path,
            mirror: Arc::new(Mutex::new(IdentifiedVec::new())),
            remote_keys: Arc::new(Mutex::new(HashMap::new())),
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

    /// Returns the remote key last seen for `id`.
    pub fn remote_key(&self, id: &T::Id) -> Option<String> {
        self.remote_keys.lock().get(id).cloned()
    }
}

impl<T> PersistenceKey for IdentifiedSync<T>
where
    T: Identifiable + Serialize + DeserializeOwned + PartialEq + Clone + Send + Sync + 'static,
{
    type Value = IdentifiedVec<T>;

    fn kind(&self) -> SyncKind {
        SyncKind::SyntheticallyKeyed
    }

    fn identity(&self) -> KeyIdentity {
        IdentifiedSync::identity(self)
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
        let rendered = self.path.rendered();

        for id in &diff.added {
            let Some(item) = new.get(id) else { continue };
            let result = self.storage.add_value(&self.path, item);
            self.ledger.record_write(WriteKind::Add, &rendered, result);
        }

        let keys = self.remote_keys.lock().clone();
        for id in &diff.removed {
            match keys.get(id) {
                Some(key) => {
                    let child = self.path.child(key);
                    let result = self.storage.remove_value(&child);
                    self.ledger.record_write(WriteKind::Remove, &child.rendered(), result);
                }
                None => self.ledger.record_unmappable(&rendered, format!("{id:?}")),
            }
        }
        for id in &diff.updated {
            let Some(item) = new.get(id) else { continue };
            match keys.get(id) {
                Some(key) => {
                    let child = self.path.child(key);
                    let result = self.storage.save_value(&child, item);
                    self.ledger.record_write(WriteKind::Save, &child.rendered(), result);
                }
                None => self.ledger.record_unmappable(&rendered, format!("{id:?}")),
            }
        }

        debug!(
            path = %rendered,
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
        let remote_keys = Arc::clone(&self.remote_keys);
        let ledger = Arc::clone(&self.ledger);
        self.storage.listen_collection(&self.path, move |records: Vec<(String, T)>| {
            let keys: HashMap<T::Id, String> = records
                .iter()
                .map(|(key, value)| (value.id(), key.clone()))
                .collect();
            *remote_keys.lock() = keys;

            let snapshot: IdentifiedVec<T> = records.into_iter().map(|(_, value)| value).collect();
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

identity_eq!(IdentifiedSync<T: Identifiable>);
