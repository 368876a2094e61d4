//! Single-document synchronizer.

use crate::coalescer::WriteCoalescer;
use crate::config::SyncConfig;
use crate::error::SyncResult;
use crate::key::{identity_eq, KeyIdentity, PersistenceKey, SyncKind};
use crate::state::{Ledger, SyncState, SyncStats};
use kvmirror_storage::{DocumentPath, StoragePort, Subscription, TypedStorage};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Keeps one document in sync.
///
/// Writes go through a [`WriteCoalescer`]; every decodable remote value is
/// forwarded to the observer as is.
pub struct RecordSync<T> {
    storage: Arc<dyn StoragePort>,
    path: DocumentPath<T>,
    coalescer: WriteCoalescer<T>,
    ledger: Arc<Ledger>,
}

impl<T> RecordSync<T> {
    /// Returns the address and storage identity of this synchronizer.
    pub fn identity(&self) -> KeyIdentity {
        KeyIdentity::new(self.path.raw(), &self.storage)
    }

    /// Returns the synchronized path.
    pub fn path(&self) -> &DocumentPath<T> {
        &self.path
    }

    /// Returns a snapshot of the statistics.
    pub fn stats(&self) -> SyncStats {
        self.ledger.stats()
    }
}

impl<T> RecordSync<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Creates a synchronizer for `path` on `storage`.
    pub fn new(storage: Arc<dyn StoragePort>, path: DocumentPath<T>, config: SyncConfig) -> Self {
        let ledger = Arc::new(Ledger::new(&config));
        let coalescer =
            WriteCoalescer::with_ledger(Arc::clone(&storage), path.clone(), &config, Arc::clone(&ledger));
        Self {
            storage,
            path,
            coalescer,
            ledger,
        }
    }

    /// Reads the cached remote value.
    ///
    /// # Errors
    ///
    /// Returns the storage error when nothing usable is cached or the
    /// backend has no cache-only read.
    pub fn try_load(&self) -> SyncResult<T> {
        Ok(self.storage.load_value(&self.path)?)
    }

    /// Returns whether a coalesced write is waiting to be flushed.
    pub fn state(&self) -> SyncState {
        self.coalescer.state()
    }
}

impl<T> PersistenceKey for RecordSync<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    type Value = T;

    fn kind(&self) -> SyncKind {
        SyncKind::Record
    }

    fn identity(&self) -> KeyIdentity {
        RecordSync::identity(self)
    }

    fn load(&self, fallback: Option<T>) -> Option<T> {
        match self.try_load() {
            Ok(value) => Some(value),
            Err(err) => {
                debug!(path = %self.path, error = %err, "load failed, using fallback");
                fallback
            }
        }
    }

    fn save(&self, value: T) {
        self.coalescer.save(value);
    }

    fn subscribe<F>(&self, _fallback: Option<T>, on_change: F) -> Subscription
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        let ledger = Arc::clone(&self.ledger);
        self.storage.listen_document(&self.path, move |value| {
            ledger.record_remote(true);
            on_change(value);
        })
    }
}

identity_eq!(RecordSync<T>);
