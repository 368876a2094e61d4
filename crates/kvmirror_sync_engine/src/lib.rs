//! # kvmirror Sync Engine
//!
//! Keeps locally observed values in sync with a remote key-value store.
//!
//! This crate provides:
//! - Trailing-edge write coalescing for single documents
//! - A record synchronizer built on the coalescer
//! - Three collection synchronizers: a read-only value list, a collection
//!   keyed by remote key, and a collection of identifiable items whose
//!   remote keys are learned from snapshots
//! - The persistence key surface shared by all four
//!
//! ## Reconciliation
//!
//! Collection saves are diffed against the last applied state by id:
//! 1. Added ids are saved under their key, or added when unassigned
//! 2. Removed ids are removed
//! 3. Common ids are saved only when their value changed
//!
//! Remote snapshots that match the last applied state are not forwarded, so
//! a local write echoed back by the listener does not loop.
//!
//! ## Key Invariants
//!
//! - At most one pending write per document path
//! - Locks are never held across a storage call
//! - Writes are fire-and-forget; failures go to the side channel
//! - Only `load` reports failure, and callers substitute a fallback
//!
//! ## Example
//!
//! ```rust
//! use kvmirror_storage::{EphemeralStorage, Path};
//! use kvmirror_sync_engine::{IdentifiedVec, Keyed, KeyedSync, PersistenceKey, SyncConfig};
//! use std::sync::Arc;
//!
//! let storage = Arc::new(EphemeralStorage::new());
//! let path = Path::root().collection::<String>("notes");
//! let notes = KeyedSync::new(storage.clone(), path, SyncConfig::new());
//!
//! let state: IdentifiedVec<Keyed<String>> =
//!     [Keyed::new("1", "milk".to_string())].into_iter().collect();
//! notes.save(state.clone());
//! notes.save(state);
//! assert_eq!(notes.stats().saves, 1);
//! assert_eq!(storage.document("notes/1"), Some(b"\"milk\"".to_vec()));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod coalescer;
mod collection;
mod config;
mod error;
mod key;
mod record;
mod state;

pub use coalescer::WriteCoalescer;
pub use collection::{
    CollectionDiff, IdentifiedSync, IdentifiedVec, Identifiable, Keyed, KeyedSync, ListSync,
    UNASSIGNED_KEY,
};
pub use config::{ErrorSink, SyncConfig};
pub use error::{SyncError, SyncResult};
pub use key::{KeyIdentity, PersistenceKey, SyncKind};
pub use record::RecordSync;
pub use state::{SyncState, SyncStats};
