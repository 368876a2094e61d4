//! Configuration for synchronizers.

use crate::error::SyncError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Callback receiving errors that are not returned to any caller.
pub type ErrorSink = Arc<dyn Fn(&SyncError) + Send + Sync>;

/// Configuration shared by every synchronizer.
#[derive(Clone, Default)]
pub struct SyncConfig {
    /// Delay before a coalesced record write is flushed.
    ///
    /// `None` flushes on the next scheduler turn.
    pub flush_delay: Option<Duration>,
    /// Receives failed writes and unaddressable items.
    pub error_sink: Option<ErrorSink>,
}

impl SyncConfig {
    /// Creates a configuration with immediate flushing and no error sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the flush delay for record writes.
    pub fn with_flush_delay(mut self, delay: Duration) -> Self {
        self.flush_delay = Some(delay);
        self
    }

    /// Sets the error sink.
    pub fn with_error_sink(mut self, sink: impl Fn(&SyncError) + Send + Sync + 'static) -> Self {
        self.error_sink = Some(Arc::new(sink));
        self
    }
}

impl fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncConfig")
            .field("flush_delay", &self.flush_delay)
            .field("error_sink", &self.error_sink.is_some())
            .finish()
    }
}
