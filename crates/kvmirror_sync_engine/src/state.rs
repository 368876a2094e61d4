//! Synchronizer state, statistics and the error side channel.

use crate::config::{ErrorSink, SyncConfig};
use crate::error::SyncError;
use kvmirror_storage::StorageResult;
use parking_lot::RwLock;
use tracing::{trace, warn};

/// Write state of a record synchronizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No local write is waiting to be flushed.
    Idle,
    /// One coalesced write is scheduled.
    Pending,
}

impl SyncState {
    /// Returns true if a write is scheduled.
    pub fn is_pending(&self) -> bool {
        matches!(self, SyncState::Pending)
    }
}

/// Statistics about a synchronizer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Remote saves that the port accepted.
    pub saves: u64,
    /// Remote removes that the port accepted.
    pub removes: u64,
    /// Remote adds that the port accepted.
    pub adds: u64,
    /// Local saves that issued no remote operation.
    pub skipped: u64,
    /// Remote writes the port rejected.
    pub failed_writes: u64,
    /// Items that could not be addressed remotely.
    pub unmappable: u64,
    /// Remote snapshots forwarded to the observer.
    pub remote_updates_applied: u64,
    /// Remote snapshots dropped because they matched the local mirror.
    pub remote_updates_suppressed: u64,
}

impl SyncStats {
    /// Total remote operations the port accepted.
    pub fn remote_writes(&self) -> u64 {
        self.saves + self.removes + self.adds
    }
}

/// Kind of remote write, for accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WriteKind {
    Save,
    Remove,
    Add,
}

impl WriteKind {
    fn as_str(self) -> &'static str {
        match self {
            WriteKind::Save => "save",
            WriteKind::Remove => "remove",
            WriteKind::Add => "add",
        }
    }
}

/// Counts outcomes and forwards swallowed errors to the side channel.
pub(crate) struct Ledger {
    stats: RwLock<SyncStats>,
    sink: Option<ErrorSink>,
}

impl Ledger {
    pub(crate) fn new(config: &SyncConfig) -> Self {
        Self {
            stats: RwLock::new(SyncStats::default()),
            sink: config.error_sink.clone(),
        }
    }

    pub(crate) fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    pub(crate) fn record_write(&self, kind: WriteKind, path: &str, result: StorageResult<()>) {
        match result {
            Ok(()) => {
                trace!(path, op = kind.as_str(), "remote write issued");
                let mut stats = self.stats.write();
                match kind {
                    WriteKind::Save => stats.saves += 1,
                    WriteKind::Remove => stats.removes += 1,
                    WriteKind::Add => stats.adds += 1,
                }
            }
            Err(err) => {
                warn!(path, op = kind.as_str(), error = %err, "remote write failed");
                self.stats.write().failed_writes += 1;
                self.report(&SyncError::Storage(err));
            }
        }
    }

    pub(crate) fn record_unmappable(&self, path: &str, id: String) {
        warn!(path, id = %id, "item has no remote key, skipping");
        self.stats.write().unmappable += 1;
        self.report(&SyncError::AddressUnmappable {
            path: path.to_string(),
            id,
        });
    }

    pub(crate) fn record_skipped(&self) {
        self.stats.write().skipped += 1;
    }

    pub(crate) fn record_remote(&self, applied: bool) {
        let mut stats = self.stats.write();
        if applied {
            stats.remote_updates_applied += 1;
        } else {
            stats.remote_updates_suppressed += 1;
        }
    }

    fn report(&self, err: &SyncError) {
        if let Some(sink) = &self.sink {
            sink(err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvmirror_storage::StorageError;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn writes_are_counted_by_kind() {
        let ledger = Ledger::new(&SyncConfig::new());
        ledger.record_write(WriteKind::Save, "a", Ok(()));
        ledger.record_write(WriteKind::Save, "a", Ok(()));
        ledger.record_write(WriteKind::Remove, "b", Ok(()));
        ledger.record_write(WriteKind::Add, "c", Ok(()));

        let stats = ledger.stats();
        assert_eq!(stats.saves, 2);
        assert_eq!(stats.removes, 1);
        assert_eq!(stats.adds, 1);
        assert_eq!(stats.remote_writes(), 4);
    }

    #[test]
    fn failures_reach_the_sink() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let config = SyncConfig::new().with_error_sink(move |err| sink.lock().push(err.clone()));
        let ledger = Ledger::new(&config);

        ledger.record_write(WriteKind::Save, "a", Err(StorageError::not_found("a")));
        ledger.record_unmappable("todos", "42".into());

        let stats = ledger.stats();
        assert_eq!(stats.failed_writes, 1);
        assert_eq!(stats.unmappable, 1);
        assert_eq!(stats.remote_writes(), 0);

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].is_not_found());
        assert!(seen[1].is_unmappable());
    }

    #[test]
    fn remote_updates_are_split() {
        let ledger = Ledger::new(&SyncConfig::new());
        ledger.record_remote(true);
        ledger.record_remote(false);
        ledger.record_remote(false);
        let stats = ledger.stats();
        assert_eq!(stats.remote_updates_applied, 1);
        assert_eq!(stats.remote_updates_suppressed, 2);
    }

    #[test]
    fn sync_state_pending() {
        assert!(SyncState::Pending.is_pending());
        assert!(!SyncState::Idle.is_pending());
    }
}
