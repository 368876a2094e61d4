//! Trailing-edge write coalescing for a single document.
//!
//! Saves replace the pending value; only the first save of a cycle
//! schedules a flush. The flush takes whatever value is pending at the time
//! it runs, so N saves before the flush produce one remote write carrying
//! the last value.

use crate::config::SyncConfig;
use crate::state::{Ledger, SyncState, WriteKind};
use kvmirror_storage::{DocumentPath, StoragePort, TypedStorage};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

struct PendingWrite<T> {
    value: Option<T>,
    scheduled: bool,
}

struct Shared<T> {
    storage: Arc<dyn StoragePort>,
    path: DocumentPath<T>,
    pending: Mutex<PendingWrite<T>>,
    ledger: Arc<Ledger>,
}

/// Debounces writes to one document path.
pub struct WriteCoalescer<T> {
    shared: Arc<Shared<T>>,
    flush_delay: Option<Duration>,
}

impl<T> WriteCoalescer<T>
where
    T: Serialize + Send + 'static,
{
    pub(crate) fn with_ledger(
        storage: Arc<dyn StoragePort>,
        path: DocumentPath<T>,
        config: &SyncConfig,
        ledger: Arc<Ledger>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                storage,
                path,
                pending: Mutex::new(PendingWrite {
                    value: None,
                    scheduled: false,
                }),
                ledger,
            }),
            flush_delay: config.flush_delay,
        }
    }

    /// Creates a coalescer for `path`.
    pub fn new(storage: Arc<dyn StoragePort>, path: DocumentPath<T>, config: &SyncConfig) -> Self {
        let ledger = Arc::new(Ledger::new(config));
        Self::with_ledger(storage, path, config, ledger)
    }

    /// Replaces the pending value, scheduling a flush if none is scheduled.
    pub fn save(&self, value: T) {
        let schedule = {
            let mut pending = self.shared.pending.lock();
            pending.value = Some(value);
            !std::mem::replace(&mut pending.scheduled, true)
        };
        if !schedule {
            trace!(path = %self.shared.path, "coalesced into pending write");
            return;
        }

        let shared = Arc::clone(&self.shared);
        let flush = Box::new(move || shared.flush());
        match self.flush_delay {
            Some(delay) => self.shared.storage.schedule_after(delay, flush),
            None => self.shared.storage.schedule(flush),
        }
    }

    /// Returns whether a flush is scheduled.
    pub fn state(&self) -> SyncState {
        if self.shared.pending.lock().scheduled {
            SyncState::Pending
        } else {
            SyncState::Idle
        }
    }

    /// Returns the path this coalescer writes to.
    pub fn path(&self) -> &DocumentPath<T> {
        &self.shared.path
    }
}

impl<T: Serialize> Shared<T> {
    fn flush(&self) {
        let value = {
            let mut pending = self.pending.lock();
            pending.scheduled = false;
            pending.value.take()
        };
        if let Some(value) = value {
            let result = self.storage.save_value(&self.path, &value);
            self.ledger
                .record_write(WriteKind::Save, &self.path.rendered(), result);
        }
    }
}
