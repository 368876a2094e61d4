//! Dispatch by path configuration.

use crate::error::StorageResult;
use crate::path::{BackendKind, RawPath};
use crate::port::{CollectionHandler, DocumentHandler, StoragePort, Subscription};
use crate::scheduler::Task;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// A storage port that forwards each call to the backend named by the
/// path's [`crate::PathConfig`].
///
/// Scheduling always goes to the document-store port.
#[derive(Clone)]
pub struct RoutedStorage {
    document_store: Arc<dyn StoragePort>,
    tree_store: Arc<dyn StoragePort>,
}

impl RoutedStorage {
    /// Creates a router over the two backends.
    pub fn new(document_store: Arc<dyn StoragePort>, tree_store: Arc<dyn StoragePort>) -> Self {
        Self {
            document_store,
            tree_store,
        }
    }

    fn route(&self, path: &RawPath) -> &dyn StoragePort {
        match path.config().backend() {
            BackendKind::DocumentStore => self.document_store.as_ref(),
            BackendKind::TreeStore => self.tree_store.as_ref(),
        }
    }
}

impl fmt::Debug for RoutedStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutedStorage").finish_non_exhaustive()
    }
}

impl StoragePort for RoutedStorage {
    fn schedule(&self, task: Task) {
        self.document_store.schedule(task);
    }

    fn schedule_after(&self, delay: Duration, task: Task) {
        self.document_store.schedule_after(delay, task);
    }

    fn document_listener(&self, path: &RawPath, handler: DocumentHandler) -> Subscription {
        self.route(path).document_listener(path, handler)
    }

    fn collection_listener(&self, path: &RawPath, handler: CollectionHandler) -> Subscription {
        self.route(path).collection_listener(path, handler)
    }

    fn load(&self, path: &RawPath) -> StorageResult<Vec<u8>> {
        self.route(path).load(path)
    }

    fn save(&self, path: &RawPath, payload: &[u8]) -> StorageResult<()> {
        self.route(path).save(path, payload)
    }

    fn remove(&self, path: &RawPath) -> StorageResult<()> {
        self.route(path).remove(path)
    }

    fn add(&self, path: &RawPath, payload: &[u8]) -> StorageResult<()> {
        self.route(path).add(path, payload)
    }
}
