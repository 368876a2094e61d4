//! Scheduling primitives.
//!
//! Storage ports expose `schedule`/`schedule_after` so the sync engine never
//! spawns threads itself. Tests inject [`ImmediateScheduler`] or
//! [`ManualScheduler`] for deterministic runs; production code uses
//! [`TokioScheduler`], a serial queue on a tokio runtime.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::warn;

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Executes deferred work on a single logical execution context.
pub trait Scheduler: Send + Sync {
    /// Runs `task` as soon as possible.
    fn schedule(&self, task: Task);

    /// Runs `task` once `delay` has elapsed.
    fn schedule_after(&self, delay: Duration, task: Task);
}

/// Runs every task inline, ignoring delays.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateScheduler;

impl Scheduler for ImmediateScheduler {
    fn schedule(&self, task: Task) {
        task();
    }

    fn schedule_after(&self, _delay: Duration, task: Task) {
        task();
    }
}

/// A scheduler driven by a virtual clock.
///
/// Nothing runs until [`ManualScheduler::run`] or
/// [`ManualScheduler::advance`] is called. Tasks scheduled while running are
/// picked up by the same call if they are due.
#[derive(Default)]
pub struct ManualScheduler {
    state: Mutex<ManualState>,
}

#[derive(Default)]
struct ManualState {
    now: Duration,
    next_seq: u64,
    queue: BTreeMap<(Duration, u64), Task>,
}

impl ManualScheduler {
    /// Creates a scheduler at virtual time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current virtual time.
    pub fn now(&self) -> Duration {
        self.state.lock().now
    }

    /// Returns the number of queued tasks.
    pub fn pending(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Runs every task that is due at the current virtual time.
    pub fn run(&self) -> usize {
        self.advance(Duration::ZERO)
    }

    /// Moves the clock forward by `by`, running due tasks in order.
    ///
    /// Returns the number of tasks executed.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.state.lock().now + by;
        let mut ran = 0;
        loop {
            let next = {
                let mut state = self.state.lock();
                let due = state.queue.keys().next().copied().filter(|k| k.0 <= target);
                due.and_then(|key| {
                    state.now = state.now.max(key.0);
                    state.queue.remove(&key)
                })
            };
            match next {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => break,
            }
        }
        self.state.lock().now = target;
        ran
    }

    fn enqueue(&self, delay: Duration, task: Task) {
        let mut state = self.state.lock();
        let due = state.now + delay;
        let seq = state.next_seq;
        state.next_seq += 1;
        state.queue.insert((due, seq), task);
    }
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ManualScheduler")
            .field("now", &state.now)
            .field("pending", &state.queue.len())
            .finish()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, task: Task) {
        self.enqueue(Duration::ZERO, task);
    }

    fn schedule_after(&self, delay: Duration, task: Task) {
        self.enqueue(delay, task);
    }
}

/// A serial queue on a tokio runtime.
///
/// One worker task drains the queue, so scheduled work never runs
/// concurrently with other work from the same scheduler.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    sender: mpsc::UnboundedSender<Task>,
    handle: Handle,
}

impl TokioScheduler {
    /// Creates a scheduler whose worker runs on the given runtime.
    pub fn new(handle: Handle) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Task>();
        handle.spawn(async move {
            while let Some(task) = receiver.recv().await {
                task();
            }
        });
        Self { sender, handle }
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, task: Task) {
        if self.sender.send(task).is_err() {
            warn!("scheduler worker has stopped, dropping task");
        }
    }

    fn schedule_after(&self, delay: Duration, task: Task) {
        let sender = self.sender.clone();
        self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            if sender.send(task).is_err() {
                warn!("scheduler worker has stopped, dropping delayed task");
            }
        });
    }
}
