//! # kvmirror Storage
//!
//! Addresses, key ordering and storage ports for kvmirror.
//!
//! This crate is the boundary between the sync engine and a remote key-value
//! store. Ports are **byte-level**: they move encoded payloads, deliver
//! change notifications and schedule work, but never interpret a payload.
//!
//! ## Design Principles
//!
//! - One logical [`Path`] renders differently per backend
//! - Ports are object safe and shared as `Arc<dyn StoragePort>`
//! - Handlers are invoked after internal locks are released, and never see
//!   an older state after a newer one
//! - Writes are best-effort; only `load` surfaces a failure to callers
//!
//! ## Available Ports
//!
//! - [`EphemeralStorage`] - in-process, insertion ordered
//! - [`TreeStorage`] - tree-store emulation with native key ordering
//! - [`RoutedStorage`] - dispatches by [`PathConfig`]
//!
//! ## Example
//!
//! ```rust
//! use kvmirror_storage::{Path, TreeStorage, TypedStorage};
//!
//! let storage = TreeStorage::new();
//! let scores = Path::root().collection::<u32>("scores");
//! storage.save_value(&scores.child("10"), &1).unwrap();
//! storage.save_value(&scores.child("9"), &2).unwrap();
//!
//! let _subscription = storage.listen_collection(&scores, |records| {
//!     let keys: Vec<&str> = records.iter().map(|(key, _)| key.as_str()).collect();
//!     assert_eq!(keys, vec!["9", "10"]);
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod memory;
mod ordering;
mod path;
mod port;
mod push_id;
mod revision;
mod routed;
mod scheduler;
mod tree;

pub use error::{StorageError, StorageResult};
pub use memory::EphemeralStorage;
pub use ordering::{sort_records, sort_tree_keys, tree_key_cmp, tree_key_is_less_than, try_int_key};
pub use path::{
    BackendKind, Collection, CollectionPath, Document, DocumentPath, DocumentStoreConfig, Path,
    PathConfig, Query, RawPath, Root, TreeStoreConfig,
};
pub use port::{
    CollectionHandler, DocumentHandler, RemoteRecord, StoragePort, Subscription, TypedStorage,
};
pub use push_id::{PushIdGenerator, PUSH_ID_LEN};
pub use routed::RoutedStorage;
pub use scheduler::{ImmediateScheduler, ManualScheduler, Scheduler, Task, TokioScheduler};
pub use tree::TreeStorage;
