//! In-process emulation of the tree store.
//!
//! The whole database is one JSON tree. Writes replace a subtree; `null` and
//! empty objects delete, and emptied parents are pruned. Listeners observe a
//! path and fire whenever a write touches it, an ancestor or a descendant,
//! but only if what they observe actually changed. Each delivery is stamped
//! with the tree revision it was read at; a listener skips stamps older than
//! the last one it saw, so reentrant writes cannot be overtaken.
//!
//! Collection snapshots are ordered with [`crate::tree_key_cmp`] and cut to
//! the path's query limit, the same way the hosted store materializes them.
//! JSON arrays are stored as leaf values and have no addressable children.

use crate::error::{StorageError, StorageResult};
use crate::ordering::sort_records;
use crate::path::{BackendKind, RawPath};
use crate::port::{CollectionHandler, DocumentHandler, RemoteRecord, StoragePort, Subscription};
use crate::push_id::PushIdGenerator;
use crate::revision::{DeliveryGate, Revision};
use crate::scheduler::{ImmediateScheduler, Scheduler, Task};
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, trace};

/// A storage port with tree-store semantics.
pub struct TreeStorage {
    inner: Arc<Inner>,
    scheduler: Arc<dyn Scheduler>,
    push_ids: PushIdGenerator,
}

struct Inner {
    root: RwLock<Value>,
    listeners: Mutex<BTreeMap<u64, TreeListener>>,
    next_listener_id: AtomicU64,
    revision: Revision,
}

#[derive(Clone)]
struct TreeListener {
    components: Vec<String>,
    gate: Arc<DeliveryGate>,
    kind: ListenerKind,
}

#[derive(Clone)]
enum ListenerKind {
    Document(DocumentHandler),
    Collection {
        limit: Option<usize>,
        handler: CollectionHandler,
    },
}

#[derive(Debug, PartialEq)]
enum Snapshot {
    Document(Value),
    Collection(Vec<RemoteRecord>),
}

impl TreeStorage {
    /// Creates an empty tree that runs scheduled work inline.
    #[must_use]
    pub fn new() -> Self {
        Self::with_scheduler(Arc::new(ImmediateScheduler))
    }

    /// Creates an empty tree using the given scheduler.
    #[must_use]
    pub fn with_scheduler(scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            inner: Arc::new(Inner {
                root: RwLock::new(Value::Null),
                listeners: Mutex::new(BTreeMap::new()),
                next_listener_id: AtomicU64::new(0),
                revision: Revision::default(),
            }),
            scheduler,
            push_ids: PushIdGenerator::new(),
        }
    }

    /// Returns a copy of the whole tree.
    #[must_use]
    pub fn snapshot(&self) -> Value {
        self.inner.root.read().clone()
    }

    /// Returns the subtree at `path`, if any.
    #[must_use]
    pub fn value_at(&self, path: &RawPath) -> Option<Value> {
        node_at(&self.inner.root.read(), path.components()).cloned()
    }

    /// Returns the number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().len()
    }

    fn register(&self, listener: TreeListener) -> Subscription {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.inner.listeners.lock().insert(id, listener.clone());

        let (revision, initial) = {
            let root = self.inner.root.read();
            (self.inner.revision.current(), snapshot_for(&root, &listener))
        };
        deliver(&listener, revision, initial);

        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner.listeners.lock().remove(&id);
            }
        })
    }

    fn write(&self, components: &[String], value: Value) {
        let affected: Vec<TreeListener> = self
            .inner
            .listeners
            .lock()
            .values()
            .filter(|listener| related(&listener.components, components))
            .cloned()
            .collect();

        let (revision, deliveries) = {
            let mut root = self.inner.root.write();
            let before: Vec<Snapshot> = affected
                .iter()
                .map(|listener| snapshot_for(&root, listener))
                .collect();
            set_node(&mut root, components, normalize(value));
            let deliveries: Vec<(TreeListener, Snapshot)> = affected
                .into_iter()
                .zip(before)
                .filter_map(|(listener, old)| {
                    let new = snapshot_for(&root, &listener);
                    (new != old).then_some((listener, new))
                })
                .collect();
            (self.inner.revision.bump(), deliveries)
        };

        trace!(revision, listeners = deliveries.len(), "tree write delivered");
        for (listener, snapshot) in deliveries {
            deliver(&listener, revision, snapshot);
        }
    }
}

impl Default for TreeStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TreeStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeStorage")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// True when one component sequence is a prefix of the other.
fn related(a: &[String], b: &[String]) -> bool {
    a.iter().zip(b).all(|(x, y)| x == y)
}

fn node_at<'a>(root: &'a Value, components: &[String]) -> Option<&'a Value> {
    components
        .iter()
        .try_fold(root, |node, component| node.as_object()?.get(component))
        .filter(|node| !node.is_null())
}

/// Strips nulls and empty objects; an object left empty becomes null.
fn normalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let map: Map<String, Value> = map
                .into_iter()
                .map(|(key, child)| (key, normalize(child)))
                .filter(|(_, child)| !child.is_null())
                .collect();
            if map.is_empty() {
                Value::Null
            } else {
                Value::Object(map)
            }
        }
        other => other,
    }
}

fn set_node(root: &mut Value, components: &[String], value: Value) {
    if value.is_null() {
        delete_node(root, components);
        return;
    }
    let mut node = root;
    for component in components {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        let Value::Object(map) = node else {
            return;
        };
        node = map.entry(component.clone()).or_insert(Value::Null);
    }
    *node = value;
}

fn delete_node(node: &mut Value, components: &[String]) {
    let Some((head, rest)) = components.split_first() else {
        *node = Value::Null;
        return;
    };
    let emptied = match node {
        Value::Object(map) => {
            if let Some(child) = map.get_mut(head) {
                delete_node(child, rest);
                if child.is_null() {
                    map.remove(head);
                }
            }
            map.is_empty()
        }
        _ => false,
    };
    if emptied {
        *node = Value::Null;
    }
}

fn encode_value(value: &Value) -> Vec<u8> {
    serde_json::to_vec(value).unwrap_or_else(|_| b"null".to_vec())
}

fn snapshot_for(root: &Value, listener: &TreeListener) -> Snapshot {
    let node = node_at(root, &listener.components);
    match &listener.kind {
        ListenerKind::Document(_) => Snapshot::Document(node.cloned().unwrap_or(Value::Null)),
        ListenerKind::Collection { limit, .. } => {
            let mut records: Vec<RemoteRecord> = node
                .and_then(Value::as_object)
                .map(|children| {
                    children
                        .iter()
                        .map(|(key, child)| RemoteRecord::new(key.clone(), encode_value(child)))
                        .collect()
                })
                .unwrap_or_default();
            sort_records(&mut records);
            if let Some(limit) = limit {
                records.truncate(*limit);
            }
            Snapshot::Collection(records)
        }
    }
}

fn deliver(listener: &TreeListener, revision: u64, snapshot: Snapshot) {
    if !listener.gate.claim(revision) {
        trace!(revision, "skipping superseded tree snapshot");
        return;
    }
    match (&listener.kind, snapshot) {
        (ListenerKind::Document(handler), Snapshot::Document(value)) => handler(&encode_value(&value)),
        (ListenerKind::Collection { handler, .. }, Snapshot::Collection(records)) => handler(&records),
        _ => {}
    }
}

impl StoragePort for TreeStorage {
    fn schedule(&self, task: Task) {
        self.scheduler.schedule(task);
    }

    fn schedule_after(&self, delay: Duration, task: Task) {
        self.scheduler.schedule_after(delay, task);
    }

    fn document_listener(&self, path: &RawPath, handler: DocumentHandler) -> Subscription {
        self.register(TreeListener {
            components: path.components().to_vec(),
            gate: Arc::default(),
            kind: ListenerKind::Document(handler),
        })
    }

    fn collection_listener(&self, path: &RawPath, handler: CollectionHandler) -> Subscription {
        self.register(TreeListener {
            components: path.components().to_vec(),
            gate: Arc::default(),
            kind: ListenerKind::Collection {
                limit: path.limit(),
                handler,
            },
        })
    }

    fn load(&self, _path: &RawPath) -> StorageResult<Vec<u8>> {
        Err(StorageError::BackendUnsupported {
            operation: "load",
            backend: BackendKind::TreeStore,
        })
    }

    fn save(&self, path: &RawPath, payload: &[u8]) -> StorageResult<()> {
        let value: Value = serde_json::from_slice(payload).map_err(|err| StorageError::EncodeFailed {
            path: path.rendered(),
            message: err.to_string(),
        })?;
        debug!(path = %path, "tree save");
        self.write(path.components(), value);
        Ok(())
    }

    fn remove(&self, path: &RawPath) -> StorageResult<()> {
        debug!(path = %path, "tree remove");
        self.write(path.components(), Value::Null);
        Ok(())
    }

    fn add(&self, path: &RawPath, payload: &[u8]) -> StorageResult<()> {
        let key = self.push_ids.generate();
        self.save(&path.child(&key), payload)
    }
}
