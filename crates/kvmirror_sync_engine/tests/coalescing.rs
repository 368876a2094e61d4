//! Record synchronizer behavior observed through a recording port.

use kvmirror_storage::{
    EphemeralStorage, Path, PathConfig, StorageError, TokioScheduler, TreeStorage,
};
use kvmirror_sync_engine::{PersistenceKey, RecordSync, SyncConfig, SyncError, SyncState};
use kvmirror_testkit::prelude::*;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Profile {
    name: String,
    visits: u32,
}

fn profile(visits: u32) -> Profile {
    Profile {
        name: "ada".into(),
        visits,
    }
}

#[test]
fn burst_of_saves_produces_one_write_with_last_value() {
    let fixture = ManualFixture::ephemeral();
    let sync = RecordSync::new(
        fixture.port(),
        Path::root().document("profile"),
        SyncConfig::new().with_flush_delay(Duration::from_millis(250)),
    );

    for visits in 1..=5 {
        sync.save(profile(visits));
    }
    assert!(sync.state().is_pending());
    assert!(fixture.storage.writes().is_empty());

    fixture.advance(Duration::from_millis(249));
    assert!(fixture.storage.writes().is_empty());

    fixture.advance(Duration::from_millis(1));
    assert_eq!(
        fixture.storage.writes(),
        vec![StorageCall::save("profile", &profile(5))]
    );
    assert_eq!(sync.state(), SyncState::Idle);
    assert_eq!(sync.stats().saves, 1);
}

#[test]
fn save_after_flush_starts_a_new_cycle() {
    let fixture = ManualFixture::ephemeral();
    let sync = RecordSync::new(fixture.port(), Path::root().document("count"), SyncConfig::new());

    sync.save(1u32);
    fixture.run();
    sync.save(2u32);
    sync.save(3u32);
    fixture.run();

    assert_eq!(
        fixture.storage.writes(),
        vec![StorageCall::save("count", &1u32), StorageCall::save("count", &3u32)]
    );
}

#[test]
fn pending_write_survives_dropping_the_synchronizer() {
    let fixture = ManualFixture::ephemeral();
    let sync = RecordSync::new(fixture.port(), Path::root().document("count"), SyncConfig::new());
    sync.save(9u32);
    drop(sync);

    fixture.run();
    assert_eq!(fixture.storage.writes(), vec![StorageCall::save("count", &9u32)]);
}

#[test]
fn failed_write_reaches_error_sink() {
    let fixture = ManualFixture::ephemeral();
    let errors = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&errors);
    let sync = RecordSync::new(
        fixture.port(),
        Path::root().document("count"),
        SyncConfig::new().with_error_sink(move |err: &SyncError| sink.lock().push(err.clone())),
    );

    fixture
        .storage
        .reject_writes(Some(StorageError::not_found("count")));
    sync.save(1u32);
    fixture.run();

    assert_eq!(
        *errors.lock(),
        vec![SyncError::Storage(StorageError::not_found("count"))]
    );
    let stats = sync.stats();
    assert_eq!(stats.failed_writes, 1);
    assert_eq!(stats.saves, 0);
}

#[test]
fn non_finite_value_is_reported_not_written() {
    let fixture = ManualFixture::ephemeral();
    let errors = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&errors);
    let sync = RecordSync::new(
        fixture.port(),
        Path::root().document::<f64>("temperature"),
        SyncConfig::new().with_error_sink(move |err: &SyncError| sink.lock().push(err.clone())),
    );

    sync.save(21.5);
    fixture.run();
    sync.save(f64::NAN);
    fixture.run();

    assert_eq!(fixture.storage.writes(), vec![StorageCall::save("temperature", &21.5)]);
    let errors = errors.lock();
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        errors[0],
        SyncError::Storage(StorageError::EncodeFailed { .. })
    ));
    assert_eq!(sync.stats().failed_writes, 1);
}

#[test]
fn load_falls_back_on_tree_store() {
    let storage = Arc::new(TreeStorage::new());
    let path = Path::root()
        .with_config(PathConfig::tree_store())
        .document::<u32>("count");
    let sync = RecordSync::new(storage, path, SyncConfig::new());

    assert_eq!(sync.load(Some(4)), Some(4));
    assert!(sync.try_load().is_err());
}

#[test]
fn load_reads_cached_document() {
    let fixture = ManualFixture::ephemeral();
    let sync = RecordSync::new(fixture.port(), Path::root().document("count"), SyncConfig::new());
    assert_eq!(sync.load(Some(0u32)), Some(0));

    sync.save(12u32);
    fixture.run();
    assert_eq!(sync.load(Some(0)), Some(12));
}

#[test]
fn identity_is_path_and_storage() {
    let storage = immediate_ephemeral();
    let other = immediate_ephemeral();
    let a = RecordSync::<u32>::new(storage.clone(), Path::root().document("x"), SyncConfig::new());
    let b = RecordSync::<u32>::new(storage, Path::root().document("x"), SyncConfig::new());
    let c = RecordSync::<u32>::new(other, Path::root().document("x"), SyncConfig::new());

    assert!(a == b);
    assert!(a != c);

    let set: HashSet<_> = [a, b, c].into_iter().collect();
    assert_eq!(set.len(), 2);
}

#[tokio::test]
async fn tokio_scheduler_flushes_after_delay() {
    let scheduler = Arc::new(TokioScheduler::new(tokio::runtime::Handle::current()));
    let storage = Arc::new(EphemeralStorage::with_scheduler(scheduler));
    let sync = RecordSync::new(
        storage.clone(),
        Path::root().document("profile"),
        SyncConfig::new().with_flush_delay(Duration::from_millis(20)),
    );

    sync.save(profile(1));
    sync.save(profile(2));
    assert!(storage.document("profile").is_none());

    tokio::time::sleep(Duration::from_millis(200)).await;
    let stored: Profile = serde_json::from_slice(&storage.document("profile").unwrap()).unwrap();
    assert_eq!(stored, profile(2));
    assert_eq!(sync.stats().saves, 1);
}
