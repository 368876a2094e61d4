//! Collection synchronizers observed through a recording port.

use kvmirror_storage::{Path, PathConfig, TypedStorage};
use kvmirror_sync_engine::{
    CollectionDiff, IdentifiedSync, IdentifiedVec, Identifiable, Keyed, KeyedSync, ListSync,
    PersistenceKey, SyncConfig, SyncError,
};
use kvmirror_testkit::prelude::*;
use parking_lot::Mutex;
use proptest::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

fn keyed(pairs: &[(&str, &str)]) -> IdentifiedVec<Keyed<String>> {
    pairs
        .iter()
        .map(|(key, value)| Keyed::new(*key, value.to_string()))
        .collect()
}

fn notes(fixture: &ManualFixture) -> KeyedSync<String> {
    KeyedSync::new(fixture.port(), Path::root().collection("notes"), SyncConfig::new())
}

#[test]
fn keyed_diff_issues_minimal_writes() {
    let fixture = ManualFixture::ephemeral();
    let sync = notes(&fixture);
    sync.save(keyed(&[("1", "x"), ("2", "y")]));
    fixture.storage.clear();

    sync.save(keyed(&[("2", "y"), ("3", "z")]));
    assert_eq!(
        fixture.storage.writes(),
        vec![StorageCall::save("notes/3", &"z"), StorageCall::remove("notes/1")]
    );
}

#[test]
fn keyed_update_saves_only_changed_item() {
    let fixture = ManualFixture::ephemeral();
    let sync = notes(&fixture);
    sync.save(keyed(&[("1", "x"), ("2", "y")]));
    fixture.storage.clear();

    sync.save(keyed(&[("1", "x"), ("2", "changed")]));
    assert_eq!(
        fixture.storage.writes(),
        vec![StorageCall::save("notes/2", &"changed")]
    );
}

#[test]
fn unassigned_item_is_added_under_collection() {
    let fixture = ManualFixture::ephemeral();
    let sync = notes(&fixture);
    let mut state = keyed(&[("1", "x")]);
    state.upsert(Keyed::unassigned("draft".to_string()));

    sync.save(state);
    assert_eq!(
        fixture.storage.writes(),
        vec![StorageCall::save("notes/1", &"x"), StorageCall::add("notes", &"draft")]
    );
}

#[test]
fn unassigned_item_is_never_addressed_by_empty_key() {
    let fixture = ManualFixture::ephemeral();
    let errors = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&errors);
    let sync = KeyedSync::new(
        fixture.port(),
        Path::root().collection("notes"),
        SyncConfig::new().with_error_sink(move |err: &SyncError| sink.lock().push(err.clone())),
    );
    let mut state = keyed(&[("1", "x")]);
    state.upsert(Keyed::unassigned("draft".to_string()));
    sync.save(state);
    fixture.storage.clear();

    let mut edited = keyed(&[("1", "x")]);
    edited.upsert(Keyed::unassigned("edited draft".to_string()));
    sync.save(edited);
    sync.save(keyed(&[("1", "x")]));

    assert!(fixture.storage.writes().is_empty());
    assert_eq!(sync.stats().unmappable, 2);
    let errors = errors.lock();
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(SyncError::is_unmappable));
}

#[test]
fn repeated_save_is_idempotent() {
    let fixture = ManualFixture::ephemeral();
    let sync = notes(&fixture);
    let state = keyed(&[("1", "x"), ("2", "y")]);

    sync.save(state.clone());
    let first = fixture.storage.take_writes();
    sync.save(state);

    assert_eq!(first.len(), 2);
    assert!(fixture.storage.writes().is_empty());
    assert_eq!(sync.stats().skipped, 1);
}

#[test]
fn echo_of_local_write_is_not_forwarded() {
    let fixture = ManualFixture::ephemeral();
    let sync = notes(&fixture);
    let seen = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&seen);
    let _subscription = sync.subscribe(None, move |_| *counter.lock() += 1);

    sync.save(keyed(&[("1", "x")]));
    assert_eq!(*seen.lock(), 0);
    assert_eq!(sync.stats().remote_updates_suppressed, 1);
}

#[test]
fn tree_order_reaches_list_observer() {
    let fixture = ManualFixture::tree();
    let path = Path::root()
        .with_config(PathConfig::tree_store())
        .collection::<String>("scores");
    let list = ListSync::new(fixture.port(), path.clone(), SyncConfig::new());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _subscription = list.subscribe(None, move |values| *sink.lock() = values);

    for (key, value) in [("b", "beta"), ("10", "ten"), ("2", "two"), ("-5", "neg"), ("010", "padded")] {
        fixture
            .storage
            .save_value(&path.child(key), &value.to_string())
            .unwrap();
    }

    assert_eq!(*seen.lock(), vec!["neg", "two", "ten", "padded", "beta"]);
}

#[test]
fn tree_limit_truncates_keyed_snapshot() {
    let fixture = ManualFixture::tree();
    let path = Path::root()
        .with_config(PathConfig::tree_store())
        .collection::<u32>("events")
        .limit(2);
    let sync = KeyedSync::new(fixture.port(), path.clone(), SyncConfig::new());
    let seen = Arc::new(Mutex::new(IdentifiedVec::new()));
    let sink = Arc::clone(&seen);
    let _subscription = sync.subscribe(None, move |value| *sink.lock() = value);

    for n in [3u32, 1, 2] {
        fixture
            .storage
            .save_value(&path.child(&n.to_string()), &n)
            .unwrap();
    }

    let keys: Vec<String> = seen.lock().ids().collect();
    assert_eq!(keys, vec!["1", "2"]);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Task {
    id: u32,
    done: bool,
}

impl Identifiable for Task {
    type Id = u32;

    fn id(&self) -> u32 {
        self.id
    }
}

#[test]
fn identified_items_without_key_are_reported() {
    let fixture = ManualFixture::ephemeral();
    let errors = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&errors);
    let sync = IdentifiedSync::new(
        fixture.port(),
        Path::root().collection("tasks"),
        SyncConfig::new().with_error_sink(move |err: &SyncError| sink.lock().push(err.clone())),
    );

    sync.save([Task { id: 1, done: false }].into_iter().collect());
    sync.save([Task { id: 1, done: true }].into_iter().collect());

    assert_eq!(
        fixture.storage.writes(),
        vec![StorageCall::add("tasks", &Task { id: 1, done: false })]
    );
    let errors = errors.lock();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].is_unmappable());
}

#[test]
fn identified_items_use_learned_keys() {
    let fixture = ManualFixture::ephemeral();
    let sync = IdentifiedSync::new(fixture.port(), Path::root().collection("tasks"), SyncConfig::new());
    let _subscription = sync.subscribe(None, |_| {});

    sync.save([Task { id: 1, done: false }].into_iter().collect());
    let key = sync.remote_key(&1).unwrap();
    fixture.storage.clear();

    sync.save([Task { id: 1, done: true }].into_iter().collect());
    assert_eq!(
        fixture.storage.writes(),
        vec![StorageCall::save(&format!("tasks/{key}"), &Task { id: 1, done: true })]
    );
}

fn to_state(map: &BTreeMap<String, u8>) -> IdentifiedVec<Keyed<u8>> {
    map.iter().map(|(key, value)| Keyed::new(key.clone(), *value)).collect()
}

proptest! {
    #[test]
    fn keyed_sync_converges_to_last_state((before, after) in collection_transition_strategy()) {
        let storage = immediate_ephemeral();
        let sync = KeyedSync::new(storage.clone(), Path::root().collection("items"), SyncConfig::new());

        sync.save(to_state(&before));
        let writes_before = sync.stats().remote_writes();
        sync.save(to_state(&after));
        let second_round = sync.stats().remote_writes() - writes_before;

        let remote: BTreeMap<String, u8> = storage
            .collection("items")
            .into_iter()
            .map(|record| (record.key, serde_json::from_slice(&record.payload).unwrap()))
            .collect();
        prop_assert_eq!(&remote, &after);

        let diff = CollectionDiff::between(&to_state(&before), &to_state(&after));
        prop_assert_eq!(second_round, diff.operation_count() as u64);
    }
}
