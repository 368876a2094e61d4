//! The storage port: the boundary between the sync engine and a backend.

use crate::error::{StorageError, StorageResult};
use crate::path::{CollectionPath, DocumentPath, RawPath};
use crate::scheduler::Task;
use kvmirror_codec::{from_payload, to_payload};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// One member of a collection snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRecord {
    /// Key of the member under its parent collection.
    pub key: String,
    /// Encoded value.
    pub payload: Vec<u8>,
}

impl RemoteRecord {
    /// Creates a record.
    pub fn new(key: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            key: key.into(),
            payload,
        }
    }
}

/// Callback receiving the payload of a document on every change.
pub type DocumentHandler = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// Callback receiving the full ordered snapshot of a collection.
pub type CollectionHandler = Arc<dyn Fn(&[RemoteRecord]) + Send + Sync>;

/// Handle to an active listener registration.
///
/// The registration is removed when the handle is cancelled or dropped,
/// which also releases the handler closure held by the backend.
#[must_use = "dropping a Subscription stops delivery immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Creates a subscription that runs `cancel` once when released.
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A subscription with nothing to release.
    pub fn empty() -> Self {
        Self { cancel: None }
    }

    /// Returns true until the subscription is cancelled.
    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }

    /// Stops delivery.
    pub fn cancel(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// A remote key-value store as seen by the sync engine.
///
/// Ports are **byte-level**: they move encoded payloads and never interpret
/// them. Typed access goes through [`TypedStorage`], which every port gets
/// for free.
///
/// # Invariants
///
/// - Handlers are never invoked while the port holds an internal lock
/// - A document handler fires once promptly after registration when a value
///   already exists at the path
/// - Collection snapshots honour the path's query limit
///
/// # Implementors
///
/// - [`super::EphemeralStorage`] - in-process, insertion ordered
/// - [`super::TreeStorage`] - tree-store emulation with native key ordering
/// - [`super::RoutedStorage`] - dispatches by path configuration
pub trait StoragePort: Send + Sync {
    /// Runs `task` on the port's execution context.
    fn schedule(&self, task: Task);

    /// Runs `task` on the port's execution context after `delay`.
    fn schedule_after(&self, delay: Duration, task: Task);

    /// Registers a handler for changes to the document at `path`.
    fn document_listener(&self, path: &RawPath, handler: DocumentHandler) -> Subscription;

    /// Registers a handler for changes to any member of the collection at
    /// `path`.
    fn collection_listener(&self, path: &RawPath, handler: CollectionHandler) -> Subscription;

    /// Reads the cached value of the document at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Nothing is cached at the path
    /// - The backend offers no cache-only read
    fn load(&self, path: &RawPath) -> StorageResult<Vec<u8>>;

    /// Replaces the document at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the payload.
    fn save(&self, path: &RawPath, payload: &[u8]) -> StorageResult<()>;

    /// Deletes the document at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the delete.
    fn remove(&self, path: &RawPath) -> StorageResult<()>;

    /// Inserts a new member under a backend-generated key.
    ///
    /// The generated key is not returned; it shows up in the next collection
    /// snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the payload.
    fn add(&self, path: &RawPath, payload: &[u8]) -> StorageResult<()>;
}

/// Typed access to any [`StoragePort`].
///
/// Values are encoded and decoded with the codec options of the path's
/// configuration. Listener payloads that fail to decode are dropped.
pub trait TypedStorage: StoragePort {
    /// Calls `on_value` with every decodable value of the document at `path`.
    fn listen_document<T, F>(&self, path: &DocumentPath<T>, on_value: F) -> Subscription
    where
        T: DeserializeOwned + 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        let options = path.config().codec().decoding.clone();
        let rendered = path.rendered();
        self.document_listener(
            path.raw(),
            Arc::new(move |payload: &[u8]| match from_payload::<T>(payload, &options) {
                Ok(value) => on_value(value),
                Err(err) => trace!(path = %rendered, error = %err, "dropping undecodable document"),
            }),
        )
    }

    /// Calls `on_records` with the decodable members of the collection at
    /// `path`, in backend order.
    fn listen_collection<T, F>(&self, path: &CollectionPath<T>, on_records: F) -> Subscription
    where
        T: DeserializeOwned + 'static,
        F: Fn(Vec<(String, T)>) + Send + Sync + 'static,
    {
        let options = path.config().codec().decoding.clone();
        let rendered = path.rendered();
        self.collection_listener(
            path.raw(),
            Arc::new(move |records: &[RemoteRecord]| {
                let decoded = records
                    .iter()
                    .filter_map(|record| match from_payload::<T>(&record.payload, &options) {
                        Ok(value) => Some((record.key.clone(), value)),
                        Err(err) => {
                            trace!(
                                path = %rendered,
                                key = %record.key,
                                error = %err,
                                "dropping undecodable member"
                            );
                            None
                        }
                    })
                    .collect();
                on_records(decoded);
            }),
        )
    }

    /// Reads and decodes the cached value at `path`.
    ///
    /// # Errors
    ///
    /// Returns the port's load error, or [`StorageError::DecodeFailed`].
    fn load_value<T>(&self, path: &DocumentPath<T>) -> StorageResult<T>
    where
        T: DeserializeOwned,
    {
        let payload = self.load(path.raw())?;
        from_payload(&payload, &path.config().codec().decoding).map_err(|err| {
            StorageError::DecodeFailed {
                path: path.rendered(),
                message: err.to_string(),
            }
        })
    }

    /// Encodes `value` and saves it at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::EncodeFailed`] or the port's save error.
    fn save_value<T>(&self, path: &DocumentPath<T>, value: &T) -> StorageResult<()>
    where
        T: Serialize,
    {
        let payload = encode(path.rendered(), value, path.config().codec())?;
        self.save(path.raw(), &payload)
    }

    /// Deletes the document at `path`.
    ///
    /// # Errors
    ///
    /// Returns the port's remove error.
    fn remove_value<T>(&self, path: &DocumentPath<T>) -> StorageResult<()> {
        self.remove(path.raw())
    }

    /// Encodes `value` and adds it under a generated key.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::EncodeFailed`] or the port's add error.
    fn add_value<T>(&self, path: &CollectionPath<T>, value: &T) -> StorageResult<()>
    where
        T: Serialize,
    {
        let payload = encode(path.rendered(), value, path.config().codec())?;
        self.add(path.raw(), &payload)
    }
}

impl<S: StoragePort + ?Sized> TypedStorage for S {}

fn encode<T: Serialize>(
    rendered: String,
    value: &T,
    codec: &kvmirror_codec::CodecOptions,
) -> StorageResult<Vec<u8>> {
    to_payload(value, &codec.encoding).map_err(|err| StorageError::EncodeFailed {
        path: rendered,
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn subscription_cancels_once() {
        let count = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&count);
        let subscription = Subscription::new(move || *counter.lock() += 1);
        assert!(subscription.is_active());
        subscription.cancel();
        assert_eq!(*count.lock(), 1);
    }

    #[test]
    fn subscription_cancels_on_drop() {
        let count = Arc::new(Mutex::new(0));
        {
            let counter = Arc::clone(&count);
            let _subscription = Subscription::new(move || *counter.lock() += 1);
        }
        assert_eq!(*count.lock(), 1);
    }

    #[test]
    fn empty_subscription_is_inactive() {
        let subscription = Subscription::empty();
        assert!(!subscription.is_active());
        assert_eq!(format!("{subscription:?}"), "Subscription { active: false }");
    }
}
