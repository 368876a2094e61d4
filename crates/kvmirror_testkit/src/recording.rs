//! A storage port that records every call it forwards.
//!
//! Wrap any port to assert the exact remote operations a synchronizer
//! issued, in order.

use kvmirror_codec::{to_payload, EncodingOptions};
use kvmirror_storage::{
    CollectionHandler, DocumentHandler, EphemeralStorage, RawPath, Scheduler, StorageError,
    StoragePort, StorageResult, Subscription, Task,
};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// One call observed by [`RecordingStorage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageCall {
    /// A cache read.
    Load {
        /// Rendered address.
        path: String,
    },
    /// A document write.
    Save {
        /// Rendered address.
        path: String,
        /// Encoded value.
        payload: Vec<u8>,
    },
    /// A document delete.
    Remove {
        /// Rendered address.
        path: String,
    },
    /// An insert under a generated key.
    Add {
        /// Rendered collection address.
        path: String,
        /// Encoded value.
        payload: Vec<u8>,
    },
    /// A document listener registration.
    DocumentListener {
        /// Rendered address.
        path: String,
    },
    /// A collection listener registration.
    CollectionListener {
        /// Rendered address.
        path: String,
    },
}

impl StorageCall {
    /// Expected save of `value` at `path` with default codec options.
    pub fn save(path: &str, value: &impl Serialize) -> Self {
        Self::Save {
            path: path.to_string(),
            payload: encode(value),
        }
    }

    /// Expected add of `value` under `path` with default codec options.
    pub fn add(path: &str, value: &impl Serialize) -> Self {
        Self::Add {
            path: path.to_string(),
            payload: encode(value),
        }
    }

    /// Expected remove at `path`.
    pub fn remove(path: &str) -> Self {
        Self::Remove {
            path: path.to_string(),
        }
    }

    /// Returns the rendered address of the call.
    pub fn path(&self) -> &str {
        match self {
            StorageCall::Load { path }
            | StorageCall::Save { path, .. }
            | StorageCall::Remove { path }
            | StorageCall::Add { path, .. }
            | StorageCall::DocumentListener { path }
            | StorageCall::CollectionListener { path } => path,
        }
    }

    /// Returns true for saves, removes and adds.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            StorageCall::Save { .. } | StorageCall::Remove { .. } | StorageCall::Add { .. }
        )
    }
}

fn encode(value: &impl Serialize) -> Vec<u8> {
    to_payload(value, &EncodingOptions::default()).unwrap_or_default()
}

/// Forwards to an inner port and records each call.
///
/// Writes can be made to fail with [`RecordingStorage::reject_writes`]; a
/// rejected write is still recorded but never reaches the inner port.
pub struct RecordingStorage {
    inner: Arc<dyn StoragePort>,
    calls: Mutex<Vec<StorageCall>>,
    rejection: Mutex<Option<StorageError>>,
}

impl RecordingStorage {
    /// Wraps `inner`.
    pub fn new(inner: Arc<dyn StoragePort>) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
            rejection: Mutex::new(None),
        }
    }

    /// Wraps a fresh [`EphemeralStorage`] using `scheduler`.
    pub fn ephemeral(scheduler: Arc<dyn Scheduler>) -> Self {
        Self::new(Arc::new(EphemeralStorage::with_scheduler(scheduler)))
    }

    /// Returns every recorded call.
    pub fn calls(&self) -> Vec<StorageCall> {
        self.calls.lock().clone()
    }

    /// Returns the recorded writes.
    pub fn writes(&self) -> Vec<StorageCall> {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.is_write())
            .cloned()
            .collect()
    }

    /// Returns and clears the recorded writes, keeping other calls.
    pub fn take_writes(&self) -> Vec<StorageCall> {
        let mut calls = self.calls.lock();
        let (writes, rest): (Vec<_>, Vec<_>) = calls.drain(..).partition(StorageCall::is_write);
        *calls = rest;
        writes
    }

    /// Forgets every recorded call.
    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    /// Makes every following write fail with `error`, or succeed again
    /// when `None`.
    pub fn reject_writes(&self, error: Option<StorageError>) {
        *self.rejection.lock() = error;
    }

    fn record(&self, call: StorageCall) {
        self.calls.lock().push(call);
    }

    fn record_write(&self, call: StorageCall) -> StorageResult<()> {
        self.record(call);
        match self.rejection.lock().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl StoragePort for RecordingStorage {
    fn schedule(&self, task: Task) {
        self.inner.schedule(task);
    }

    fn schedule_after(&self, delay: Duration, task: Task) {
        self.inner.schedule_after(delay, task);
    }

    fn document_listener(&self, path: &RawPath, handler: DocumentHandler) -> Subscription {
        self.record(StorageCall::DocumentListener {
            path: path.rendered(),
        });
        self.inner.document_listener(path, handler)
    }

    fn collection_listener(&self, path: &RawPath, handler: CollectionHandler) -> Subscription {
        self.record(StorageCall::CollectionListener {
            path: path.rendered(),
        });
        self.inner.collection_listener(path, handler)
    }

    fn load(&self, path: &RawPath) -> StorageResult<Vec<u8>> {
        self.record(StorageCall::Load {
            path: path.rendered(),
        });
        self.inner.load(path)
    }

    fn save(&self, path: &RawPath, payload: &[u8]) -> StorageResult<()> {
        self.record_write(StorageCall::Save {
            path: path.rendered(),
            payload: payload.to_vec(),
        })?;
        self.inner.save(path, payload)
    }

    fn remove(&self, path: &RawPath) -> StorageResult<()> {
        self.record_write(StorageCall::Remove {
            path: path.rendered(),
        })?;
        self.inner.remove(path)
    }

    fn add(&self, path: &RawPath, payload: &[u8]) -> StorageResult<()> {
        self.record_write(StorageCall::Add {
            path: path.rendered(),
            payload: payload.to_vec(),
        })?;
        self.inner.add(path, payload)
    }
}
