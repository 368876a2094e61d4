//! Simulate command implementation.
//!
//! Replays a sequence of collection states through a [`KeyedSync`] and
//! reports what the remote ended up holding.

use crate::Backend;
use kvmirror_storage::{EphemeralStorage, Path, PathConfig, StoragePort, TreeStorage, TypedStorage};
use kvmirror_sync_engine::{IdentifiedVec, Keyed, KeyedSync, PersistenceKey, SyncConfig, SyncStats};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::sync::Arc;
use tracing::{debug, info};

/// One remote member after the simulation.
#[derive(Debug, Serialize, PartialEq)]
pub struct RemoteMember {
    /// Remote key.
    pub key: String,
    /// Decoded value.
    pub value: Value,
}

/// Simulation result.
#[derive(Debug, Serialize)]
pub struct SimulationReport {
    /// Backend the states were written to.
    pub backend: String,
    /// Rendered collection address.
    pub collection: String,
    /// Number of states replayed.
    pub states: usize,
    /// Last remote snapshot, in delivery order.
    pub snapshot: Vec<RemoteMember>,
    /// Remote saves issued.
    pub saves: u64,
    /// Remote removes issued.
    pub removes: u64,
    /// Remote adds issued.
    pub adds: u64,
    /// States that needed no remote operation.
    pub skipped: u64,
    /// Writes the backend rejected.
    pub failed_writes: u64,
}

impl SimulationReport {
    fn new(
        backend: Backend,
        collection: String,
        states: usize,
        snapshot: Vec<RemoteMember>,
        stats: &SyncStats,
    ) -> Self {
        Self {
            backend: format!("{backend:?}").to_lowercase(),
            collection,
            states,
            snapshot,
            saves: stats.saves,
            removes: stats.removes,
            adds: stats.adds,
            skipped: stats.skipped,
            failed_writes: stats.failed_writes,
        }
    }
}

/// Parses the input: a JSON array whose elements are objects mapping remote
/// keys to values. An empty key marks an item the backend should key.
pub fn parse_states(
    text: &str,
) -> Result<Vec<IdentifiedVec<Keyed<Value>>>, Box<dyn std::error::Error>> {
    let document: Value = serde_json::from_str(text)?;
    let Value::Array(states) = document else {
        return Err("Expected a JSON array of collection states".into());
    };

    states
        .into_iter()
        .enumerate()
        .map(|(index, state)| match state {
            Value::Object(members) => Ok(members
                .into_iter()
                .map(|(key, value)| Keyed::new(key, value))
                .collect()),
            other => Err(format!("State {index} is not an object: {other}").into()),
        })
        .collect()
}

/// Replays `states` against a fresh backend.
pub fn simulate(
    states: Vec<IdentifiedVec<Keyed<Value>>>,
    backend: Backend,
    collection: &str,
) -> SimulationReport {
    let (storage, config): (Arc<dyn StoragePort>, PathConfig) = match backend {
        Backend::Tree => (Arc::new(TreeStorage::new()), PathConfig::tree_store()),
        Backend::Document => (Arc::new(EphemeralStorage::new()), PathConfig::document_store()),
    };
    let path = Path::root().with_config(config).collection::<Value>(collection);

    let snapshot = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&snapshot);
    let _remote = storage.listen_collection(&path, move |records: Vec<(String, Value)>| {
        *sink.lock() = records;
    });

    let sync = KeyedSync::new(
        Arc::clone(&storage),
        path.clone(),
        SyncConfig::new().with_error_sink(|err| debug!(error = %err, "simulated write failed")),
    );

    let count = states.len();
    for (index, state) in states.into_iter().enumerate() {
        debug!(index, items = state.len(), "replaying state");
        sync.save(state);
    }

    let stats = sync.stats();
    info!(
        path = %path,
        writes = stats.remote_writes(),
        skipped = stats.skipped,
        "simulation finished"
    );

    let members = snapshot
        .lock()
        .iter()
        .map(|(key, value)| RemoteMember {
            key: key.clone(),
            value: value.clone(),
        })
        .collect();
    SimulationReport::new(backend, path.rendered(), count, members, &stats)
}

/// Runs the simulate command.
pub fn run(
    file: &std::path::Path,
    backend: Backend,
    collection: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let text = fs::read_to_string(file)
        .map_err(|err| format!("Failed to read {}: {err}", file.display()))?;
    let states = parse_states(&text)?;
    let report = simulate(states, backend, collection);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
