use crate::config::SyncConfig;
use crate::key::{identity_eq, KeyIdentity, PersistenceKey, SyncKind};
use crate::state::{Ledger, SyncStats};
use kvmirror_storage::{CollectionPath, StoragePort, Subscription, TypedStorage};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::debug;

/// Read-only projection of a collection to its values.
///
/// Remote keys are discarded and local saves are never pushed.
pub struct ListSync<T> {
    storage: Arc<dyn StoragePort>,
    path: CollectionPath<T>,
    ledger: Arc<Ledger>,
}

impl<T> ListSync<T> {
    /// Creates a projection of `path` on `storage`.
    pub fn new(storage: Arc<dyn StoragePort>, path: CollectionPath<T>, config: SyncConfig) -> Self {
        Self {
            storage,
            path,
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

impl<T> PersistenceKey for ListSync<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    type Value = Vec<T>;

    fn kind(&self) -> SyncKind {
        SyncKind::ReadOnlyList
    }

    fn identity(&self) -> KeyIdentity {
        ListSync::identity(self)
    }

    fn load(&self, fallback: Option<Vec<T>>) -> Option<Vec<T>> {
        fallback
    }

    fn save(&self, _value: Vec<T>) {
        debug!(path = %self.path, "read-only collection, ignoring save");
        self.ledger.record_skipped();
    }

    fn subscribe<F>(&self, _fallback: Option<Vec<T>>, on_change: F) -> Subscription
    where
        F: Fn(Vec<T>) + Send + Sync + 'static,
    {
        let ledger = Arc::clone(&self.ledger);
        self.storage.listen_collection(&self.path, move |records: Vec<(String, T)>| {
            ledger.record_remote(true);
            on_change(records.into_iter().map(|(_, value)| value).collect());
        })
    }
}

identity_eq!(ListSync<T>);

#[cfg(test)]
mod tests {
    use super::*;
    use kvmirror_storage::{EphemeralStorage, Path, TreeStorage};
    use parking_lot::Mutex;

    #[test]
    fn forwards_values_in_remote_order() {
        let storage = Arc::new(TreeStorage::new());
        let path = Path::root().collection::<String>("tags");
        let sync = ListSync::new(storage.clone(), path.clone(), SyncConfig::new());

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _subscription = sync.subscribe(None, move |values| *sink.lock() = values);

        storage.save_value(&path.child("b"), &"second".to_string()).unwrap();
        storage.save_value(&path.child("1"), &"first".to_string()).unwrap();
        assert_eq!(*seen.lock(), vec!["first", "second"]);
    }

    #[test]
    fn save_is_a_no_op() {
        let storage = Arc::new(EphemeralStorage::new());
        let sync = ListSync::new(
            storage.clone(),
            Path::root().collection::<String>("tags"),
            SyncConfig::new(),
        );
        sync.save(vec!["x".to_string()]);

        assert!(storage.is_empty());
        assert_eq!(sync.stats().skipped, 1);
        assert_eq!(sync.kind(), SyncKind::ReadOnlyList);
    }

    #[test]
    fn load_returns_fallback() {
        let sync = ListSync::new(
            Arc::new(EphemeralStorage::new()),
            Path::root().collection::<u8>("bytes"),
            SyncConfig::new(),
        );
        assert_eq!(sync.load(Some(vec![1, 2])), Some(vec![1, 2]));
        assert_eq!(sync.load(None), None);
    }
}
