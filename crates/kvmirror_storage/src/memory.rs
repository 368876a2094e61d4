//! In-process storage port for tests and previews.

use crate::error::{StorageError, StorageResult};
use crate::path::RawPath;
use crate::port::{CollectionHandler, DocumentHandler, RemoteRecord, StoragePort, Subscription};
use crate::revision::{DeliveryGate, Revision};
use crate::scheduler::{ImmediateScheduler, Scheduler, Task};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// An in-memory storage port.
///
/// Documents are kept by rendered path; every document also appears as a
/// member of its parent collection, in insertion order. Listeners are
/// notified synchronously from inside the write call, after all locks have
/// been released. A listener never receives a state older than one it has
/// already received, even when a handler writes while being notified.
///
/// # Example
///
/// ```rust
/// use kvmirror_storage::{EphemeralStorage, Path, TypedStorage};
///
/// let storage = EphemeralStorage::new();
/// let name = Path::root().collection::<String>("names").child("1");
/// storage.save_value(&name, &"ada".to_string()).unwrap();
/// assert_eq!(storage.load_value(&name).unwrap(), "ada");
/// ```
pub struct EphemeralStorage {
    inner: Arc<Inner>,
    scheduler: Arc<dyn Scheduler>,
}

#[derive(Default)]
struct Inner {
    documents: RwLock<HashMap<String, Vec<u8>>>,
    collections: RwLock<HashMap<String, Vec<RemoteRecord>>>,
    document_listeners: Mutex<HashMap<String, BTreeMap<u64, DocumentListener>>>,
    collection_listeners: Mutex<HashMap<String, BTreeMap<u64, CollectionListener>>>,
    next_listener_id: AtomicU64,
    revision: Revision,
}

#[derive(Clone)]
struct DocumentListener {
    gate: Arc<DeliveryGate>,
    handler: DocumentHandler,
}

impl DocumentListener {
    fn deliver(&self, revision: u64, payload: &[u8]) {
        if self.gate.claim(revision) {
            (self.handler)(payload);
        }
    }
}

#[derive(Clone)]
struct CollectionListener {
    limit: Option<usize>,
    gate: Arc<DeliveryGate>,
    handler: CollectionHandler,
}

impl CollectionListener {
    fn deliver(&self, revision: u64, records: &[RemoteRecord]) {
        if self.gate.claim(revision) {
            (self.handler)(limited(records, self.limit));
        }
    }
}

impl EphemeralStorage {
    /// Creates an empty store that runs scheduled work inline.
    #[must_use]
    pub fn new() -> Self {
        Self::with_scheduler(Arc::new(ImmediateScheduler))
    }

    /// Creates an empty store using the given scheduler.
    #[must_use]
    pub fn with_scheduler(scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            inner: Arc::new(Inner::default()),
            scheduler,
        }
    }

    /// Returns the stored payload at a rendered path.
    #[must_use]
    pub fn document(&self, rendered: &str) -> Option<Vec<u8>> {
        self.inner.documents.read().get(rendered).cloned()
    }

    /// Returns the members of the collection at a rendered path.
    #[must_use]
    pub fn collection(&self, rendered: &str) -> Vec<RemoteRecord> {
        self.inner
            .collections
            .read()
            .get(rendered)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns the number of stored documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.documents.read().len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of document listeners registered at a rendered
    /// path.
    #[must_use]
    pub fn document_listener_count(&self, rendered: &str) -> usize {
        self.inner
            .document_listeners
            .lock()
            .get(rendered)
            .map_or(0, BTreeMap::len)
    }

    /// Returns the number of collection listeners registered at a rendered
    /// path.
    #[must_use]
    pub fn collection_listener_count(&self, rendered: &str) -> usize {
        self.inner
            .collection_listeners
            .lock()
            .get(rendered)
            .map_or(0, BTreeMap::len)
    }
}

impl Default for EphemeralStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EphemeralStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EphemeralStorage")
            .field("documents", &self.len())
            .finish()
    }
}

/// Splits a path into its parent collection and member key.
fn parent_and_key(path: &RawPath) -> Option<(String, String)> {
    let (key, parent) = path.components().split_last()?;
    Some((parent.join("/"), key.clone()))
}

fn limited(records: &[RemoteRecord], limit: Option<usize>) -> &[RemoteRecord] {
    match limit {
        Some(limit) if limit < records.len() => &records[..limit],
        _ => records,
    }
}

impl Inner {
    fn next_id(&self) -> u64 {
        self.next_listener_id.fetch_add(1, Ordering::Relaxed)
    }

    fn notify_document(&self, rendered: &str, revision: u64, payload: &[u8]) {
        let listeners: Vec<DocumentListener> = self
            .document_listeners
            .lock()
            .get(rendered)
            .map(|entries| entries.values().cloned().collect())
            .unwrap_or_default();
        for listener in listeners {
            listener.deliver(revision, payload);
        }
    }

    fn notify_collection(&self, parent: &str) {
        let listeners: Vec<CollectionListener> = self
            .collection_listeners
            .lock()
            .get(parent)
            .map(|entries| entries.values().cloned().collect())
            .unwrap_or_default();
        if listeners.is_empty() {
            return;
        }
        let (revision, records) = self.read_collection(parent);
        for listener in listeners {
            listener.deliver(revision, &records);
        }
    }

    fn read_collection(&self, rendered: &str) -> (u64, Vec<RemoteRecord>) {
        let collections = self.collections.read();
        let records = collections.get(rendered).cloned().unwrap_or_default();
        (self.revision.current(), records)
    }
}

impl StoragePort for EphemeralStorage {
    fn schedule(&self, task: Task) {
        self.scheduler.schedule(task);
    }

    fn schedule_after(&self, delay: Duration, task: Task) {
        self.scheduler.schedule_after(delay, task);
    }

    fn document_listener(&self, path: &RawPath, handler: DocumentHandler) -> Subscription {
        let rendered = path.rendered();
        let id = self.inner.next_id();
        let listener = DocumentListener {
            gate: Arc::default(),
            handler,
        };
        self.inner
            .document_listeners
            .lock()
            .entry(rendered.clone())
            .or_default()
            .insert(id, listener.clone());

        let current = {
            let documents = self.inner.documents.read();
            documents
                .get(&rendered)
                .cloned()
                .map(|payload| (self.inner.revision.current(), payload))
        };
        if let Some((revision, payload)) = current {
            listener.deliver(revision, &payload);
        }

        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = inner.upgrade() {
                let mut listeners = inner.document_listeners.lock();
                if let Some(entries) = listeners.get_mut(&rendered) {
                    entries.remove(&id);
                    if entries.is_empty() {
                        listeners.remove(&rendered);
                    }
                }
            }
        })
    }

    fn collection_listener(&self, path: &RawPath, handler: CollectionHandler) -> Subscription {
        let rendered = path.rendered();
        let id = self.inner.next_id();
        let listener = CollectionListener {
            limit: path.limit(),
            gate: Arc::default(),
            handler,
        };
        self.inner
            .collection_listeners
            .lock()
            .entry(rendered.clone())
            .or_default()
            .insert(id, listener.clone());

        let (revision, records) = self.inner.read_collection(&rendered);
        if !records.is_empty() {
            listener.deliver(revision, &records);
        }

        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = inner.upgrade() {
                let mut listeners = inner.collection_listeners.lock();
                if let Some(entries) = listeners.get_mut(&rendered) {
                    entries.remove(&id);
                    if entries.is_empty() {
                        listeners.remove(&rendered);
                    }
                }
            }
        })
    }

    fn load(&self, path: &RawPath) -> StorageResult<Vec<u8>> {
        let rendered = path.rendered();
        self.document(&rendered)
            .ok_or(StorageError::NotFound { path: rendered })
    }

    fn save(&self, path: &RawPath, payload: &[u8]) -> StorageResult<()> {
        let rendered = path.rendered();
        debug!(path = %rendered, bytes = payload.len(), "ephemeral save");
        let revision = {
            let mut documents = self.inner.documents.write();
            documents.insert(rendered.clone(), payload.to_vec());
            self.inner.revision.bump()
        };

        let parent = parent_and_key(path).map(|(parent, key)| {
            let mut collections = self.inner.collections.write();
            let members = collections.entry(parent.clone()).or_default();
            match members.iter_mut().find(|record| record.key == key) {
                Some(record) => record.payload = payload.to_vec(),
                None => members.push(RemoteRecord::new(key, payload.to_vec())),
            }
            self.inner.revision.bump();
            parent
        });

        self.inner.notify_document(&rendered, revision, payload);
        if let Some(parent) = parent {
            self.inner.notify_collection(&parent);
        }
        Ok(())
    }

    fn remove(&self, path: &RawPath) -> StorageResult<()> {
        let rendered = path.rendered();
        debug!(path = %rendered, "ephemeral remove");
        {
            let mut documents = self.inner.documents.write();
            documents.remove(&rendered);
            self.inner.revision.bump();
        }
        self.inner.document_listeners.lock().remove(&rendered);

        if let Some((parent, key)) = parent_and_key(path) {
            let changed = {
                let mut collections = self.inner.collections.write();
                match collections.get_mut(&parent) {
                    Some(members) => {
                        let before = members.len();
                        members.retain(|record| record.key != key);
                        let changed = members.len() != before;
                        if members.is_empty() {
                            collections.remove(&parent);
                        }
                        if changed {
                            self.inner.revision.bump();
                        }
                        changed
                    }
                    None => false,
                }
            };
            if changed {
                self.inner.notify_collection(&parent);
            }
        }
        Ok(())
    }

    fn add(&self, path: &RawPath, payload: &[u8]) -> StorageResult<()> {
        let key = Uuid::new_v4().to_string();
        self.save(&path.child(&key), payload)
    }
}
