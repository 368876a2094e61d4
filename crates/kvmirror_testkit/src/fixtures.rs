//! Storage fixtures for synchronizer tests.

use crate::recording::RecordingStorage;
use kvmirror_storage::{EphemeralStorage, ManualScheduler, StoragePort, TreeStorage};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// A recording port over an ephemeral store driven by a manual clock.
pub struct ManualFixture {
    /// The clock every scheduled task runs on.
    pub scheduler: Arc<ManualScheduler>,
    /// The recording port handed to synchronizers.
    pub storage: Arc<RecordingStorage>,
}

impl ManualFixture {
    /// Creates a fixture over a fresh [`EphemeralStorage`].
    pub fn ephemeral() -> Self {
        let scheduler = Arc::new(ManualScheduler::new());
        let storage = Arc::new(RecordingStorage::ephemeral(scheduler.clone()));
        Self { scheduler, storage }
    }

    /// Creates a fixture over a fresh [`TreeStorage`].
    pub fn tree() -> Self {
        let scheduler = Arc::new(ManualScheduler::new());
        let inner = Arc::new(TreeStorage::with_scheduler(scheduler.clone()));
        let storage = Arc::new(RecordingStorage::new(inner));
        Self { scheduler, storage }
    }

    /// Returns the recording port as a trait object.
    pub fn port(&self) -> Arc<dyn StoragePort> {
        self.storage.clone()
    }

    /// Runs every task that is due now.
    pub fn run(&self) -> usize {
        self.scheduler.run()
    }

    /// Advances the clock and runs tasks that became due.
    pub fn advance(&self, by: Duration) -> usize {
        self.scheduler.advance(by)
    }
}

/// Returns an ephemeral store whose tasks run inline.
pub fn immediate_ephemeral() -> Arc<EphemeralStorage> {
    Arc::new(EphemeralStorage::new())
}

/// A JSON file in a temporary directory, removed on drop.
pub struct JsonFixture {
    /// Location of the file.
    pub path: PathBuf,
    _temp_dir: TempDir,
}

impl JsonFixture {
    /// Writes `contents` to `name` inside a fresh temporary directory.
    pub fn new(name: &str, contents: &serde_json::Value) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join(name);
        let text = serde_json::to_string_pretty(contents).expect("Failed to render JSON");
        fs::write(&path, text).expect("Failed to write fixture");
        Self {
            path,
            _temp_dir: temp_dir,
        }
    }

    /// Writes raw text, for malformed-input tests.
    pub fn raw(name: &str, text: &str) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join(name);
        fs::write(&path, text).expect("Failed to write fixture");
        Self {
            path,
            _temp_dir: temp_dir,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvmirror_storage::{Path, TypedStorage};

    #[test]
    fn manual_fixture_defers_tasks() {
        let fixture = ManualFixture::ephemeral();
        let flag = Arc::new(parking_lot::Mutex::new(false));
        let set = Arc::clone(&flag);
        fixture
            .port()
            .schedule_after(Duration::from_millis(10), Box::new(move || *set.lock() = true));

        assert_eq!(fixture.run(), 0);
        assert_eq!(fixture.advance(Duration::from_millis(10)), 1);
        assert!(*flag.lock());
    }

    #[test]
    fn tree_fixture_records_writes() {
        let fixture = ManualFixture::tree();
        let doc = Path::root().document::<u32>("counter");
        fixture.storage.save_value(&doc, &7).unwrap();
        assert_eq!(fixture.storage.writes().len(), 1);
    }

    #[test]
    fn json_fixture_roundtrips() {
        let value = serde_json::json!({"a": 1});
        let fixture = JsonFixture::new("input.json", &value);
        let text = fs::read_to_string(&fixture.path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, value);
    }
}
