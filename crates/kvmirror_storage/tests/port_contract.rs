//! Behaviour every storage port shares.

use kvmirror_codec::CodecOptions;
use kvmirror_storage::{
    CollectionPath, EphemeralStorage, Path, PathConfig, RoutedStorage, StorageError, StoragePort,
    TreeStorage, TreeStoreConfig, TypedStorage,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Todo {
    title: String,
    done: bool,
}

fn todo(title: &str) -> Todo {
    Todo {
        title: title.to_string(),
        done: false,
    }
}

fn ports() -> Vec<(&'static str, Arc<dyn StoragePort>)> {
    vec![
        ("ephemeral", Arc::new(EphemeralStorage::new())),
        ("tree", Arc::new(TreeStorage::new())),
        (
            "routed",
            Arc::new(RoutedStorage::new(
                Arc::new(EphemeralStorage::new()),
                Arc::new(TreeStorage::new()),
            )),
        ),
    ]
}

fn todos() -> CollectionPath<Todo> {
    Path::root().collection("todos")
}

fn watch(port: &Arc<dyn StoragePort>) -> (Arc<Mutex<Vec<Vec<(String, Todo)>>>>, kvmirror_storage::Subscription) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let subscription = port.listen_collection(&todos(), move |records| sink.lock().push(records));
    (seen, subscription)
}

#[test]
fn save_notifies_collection_listener() {
    for (name, port) in ports() {
        let (seen, _subscription) = watch(&port);
        port.save_value(&todos().child("1"), &todo("milk")).unwrap();

        let seen = seen.lock();
        let last = seen.last().unwrap_or_else(|| panic!("{name}: no snapshot"));
        assert_eq!(last, &vec![("1".to_string(), todo("milk"))], "{name}");
    }
}

#[test]
fn remove_notifies_collection_listener() {
    for (name, port) in ports() {
        port.save_value(&todos().child("1"), &todo("milk")).unwrap();
        port.save_value(&todos().child("2"), &todo("eggs")).unwrap();
        let (seen, _subscription) = watch(&port);

        port.remove_value(&todos().child("1")).unwrap();
        let seen = seen.lock();
        assert_eq!(
            seen.last().unwrap(),
            &vec![("2".to_string(), todo("eggs"))],
            "{name}"
        );
    }
}

#[test]
fn add_creates_a_member() {
    for (name, port) in ports() {
        let (seen, _subscription) = watch(&port);
        port.add_value(&todos(), &todo("bread")).unwrap();

        let seen = seen.lock();
        let last = seen.last().unwrap();
        assert_eq!(last.len(), 1, "{name}");
        assert!(!last[0].0.is_empty(), "{name}");
        assert_eq!(last[0].1, todo("bread"), "{name}");
    }
}

#[test]
fn cancelled_listener_goes_quiet() {
    for (name, port) in ports() {
        let (seen, subscription) = watch(&port);
        let before = seen.lock().len();
        subscription.cancel();

        port.save_value(&todos().child("1"), &todo("milk")).unwrap();
        assert_eq!(seen.lock().len(), before, "{name}");
    }
}

#[test]
fn document_store_paths_load_through_router() {
    let router = RoutedStorage::new(Arc::new(EphemeralStorage::new()), Arc::new(TreeStorage::new()));
    let path = todos()
        .with_config(PathConfig::document_store())
        .child("1");
    router.save_value(&path, &todo("tea")).unwrap();
    assert_eq!(router.load_value(&path).unwrap(), todo("tea"));
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Gauge {
    level: f64,
}

#[test]
fn nan_save_fails_and_keeps_the_stored_value() {
    for (name, port) in ports() {
        let gauges = Path::root().collection::<Gauge>("gauges");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _subscription = port.listen_collection(&gauges, move |records| sink.lock().push(records));

        port.save_value(&gauges.child("g1"), &Gauge { level: 0.5 }).unwrap();
        let before = seen.lock().len();

        let err = port
            .save_value(&gauges.child("g1"), &Gauge { level: f64::NAN })
            .unwrap_err();
        assert!(matches!(err, StorageError::EncodeFailed { .. }), "{name}: {err}");

        let seen = seen.lock();
        assert_eq!(seen.len(), before, "{name}");
        assert_eq!(
            seen.last(),
            Some(&vec![("g1".to_string(), Gauge { level: 0.5 })]),
            "{name}"
        );
    }
}

#[test]
fn string_float_paths_store_infinities() {
    let port = TreeStorage::new();
    let config = PathConfig::TreeStore(
        TreeStoreConfig::new().with_codec(CodecOptions::default().with_string_floats()),
    );
    let gauge = Path::root()
        .with_config(config)
        .collection::<Gauge>("gauges")
        .child("g1");

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _subscription = port.listen_document(&gauge, move |value: Gauge| sink.lock().push(value.level));

    port.save_value(&gauge, &Gauge { level: f64::INFINITY }).unwrap();
    assert_eq!(port.value_at(gauge.raw()), Some(serde_json::json!({"level": "+inf"})));
    assert_eq!(seen.lock().last(), Some(&f64::INFINITY));
}
