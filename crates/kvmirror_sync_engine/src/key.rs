//! The persistence key surface exposed to host integrations.

use kvmirror_storage::{BackendKind, PathConfig, RawPath, StoragePort, Subscription};
use std::sync::Arc;

/// Synchronization strategy of a persistence key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncKind {
    /// A single document with coalesced writes.
    Record,
    /// A collection projected to its values; never written.
    ReadOnlyList,
    /// A collection whose items carry their remote key.
    NaturallyKeyed,
    /// A collection of identifiable items whose remote keys are learned
    /// from snapshots.
    SyntheticallyKeyed,
}

impl SyncKind {
    /// Returns true if local saves can issue remote writes.
    pub fn is_writable(&self) -> bool {
        !matches!(self, SyncKind::ReadOnlyList)
    }
}

/// What makes two persistence keys equal: the address, the backend it is
/// rendered for, and the storage port instance behind it.
///
/// Codec options are not part of the identity; two keys that read the same
/// record with different options are the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyIdentity {
    rendered: String,
    backend: BackendKind,
    instance: Option<String>,
    region: Option<String>,
    storage: usize,
}

impl KeyIdentity {
    /// Creates the identity of `path` on `storage`.
    pub fn new(path: &RawPath, storage: &Arc<dyn StoragePort>) -> Self {
        let (instance, region) = match path.config() {
            PathConfig::DocumentStore(config) => (config.database.clone(), None),
            PathConfig::TreeStore(config) => (config.instance.clone(), config.region.clone()),
        };
        Self {
            rendered: path.rendered(),
            backend: path.config().backend(),
            instance,
            region,
            storage: Arc::as_ptr(storage) as *const () as usize,
        }
    }

    /// Returns the rendered address.
    pub fn rendered(&self) -> &str {
        &self.rendered
    }
}

/// A durable reactive value.
///
/// This is the surface a state-management integration needs: an initial
/// read, a write, and a change stream.
pub trait PersistenceKey: Send + Sync {
    /// The locally observed value.
    type Value;

    /// Returns the synchronization strategy.
    fn kind(&self) -> SyncKind;

    /// Returns the identity used for equality and hashing.
    fn identity(&self) -> KeyIdentity;

    /// Reads the current value, or returns `fallback` when none is
    /// available.
    fn load(&self, fallback: Option<Self::Value>) -> Option<Self::Value>;

    /// Pushes a local value to the remote store.
    ///
    /// Remote failures are not returned; they go to the configured side
    /// channel.
    fn save(&self, value: Self::Value);

    /// Calls `on_change` with every accepted remote update until the returned
    /// subscription is dropped.
    fn subscribe<F>(&self, fallback: Option<Self::Value>, on_change: F) -> Subscription
    where
        F: Fn(Self::Value) + Send + Sync + 'static;
}

/// Implements equality and hashing through `identity()`.
macro_rules! identity_eq {
    ($($ty:ident < $t:ident $(: $bound:path)? >),* $(,)?) => {
        $(
            impl<$t $(: $bound)?> PartialEq for $ty<$t> {
                fn eq(&self, other: &Self) -> bool {
                    self.identity() == other.identity()
                }
            }

            impl<$t $(: $bound)?> Eq for $ty<$t> {}

            impl<$t $(: $bound)?> std::hash::Hash for $ty<$t> {
                fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
                    self.identity().hash(state);
                }
            }
        )*
    };
}

pub(crate) use identity_eq;
