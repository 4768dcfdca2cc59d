//! Transition task queue
//!
//! Side effects that must not compete with an in-flight transition are
//! deferred here and drained, in enqueue order, when the transition lock
//! releases. Anything enqueued while a drain is running lands in a fresh queue
//! that is consumed on the next release. A callback never runs ahead of one
//! enqueued before it: while anything is still waiting, new callbacks queue
//! behind it even if the lock is already idle.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

use crate::transition_lock::TransitionGate;

/// Task queue errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskQueueError {
    /// Drain requested while the gate still reports a transition in flight
    #[error("Cannot drain while a transition holds the lock")]
    GateLocked,

    /// Drain requested from inside a running drain
    #[error("Drain is already running")]
    ReentrantDrain,
}

/// Result type for task queue operations
pub type Result<T> = std::result::Result<T, TaskQueueError>;

/// A deferred zero-argument callback
pub type DeferredTask = Box<dyn FnOnce() -> anyhow::Result<()> + Send + 'static>;

struct QueuedTask {
    label: String,
    task: DeferredTask,
    enqueued_at: Instant,
}

/// Callbacks taken off the queue by one release, not yet run
#[must_use = "a taken batch keeps the queue draining until it is run"]
pub(crate) struct ReleaseBatch {
    tasks: VecDeque<QueuedTask>,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<QueuedTask>,
    draining: bool,
}

/// What happened to an enqueued callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    /// The gate was open; the callback already ran
    RanImmediately {
        /// Whether it completed without error or panic
        succeeded: bool,
    },
    /// The callback waits for the next release
    Deferred {
        /// Zero-based position in the queue
        position: usize,
    },
}

/// Outcome of one drain
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Labels of callbacks that completed, in execution order
    pub executed: Vec<String>,
    /// Labels of callbacks that returned an error or panicked
    pub failed: Vec<String>,
    /// Callbacks enqueued during this drain, left for the next release
    pub deferred: usize,
}

impl DrainReport {
    /// Total callbacks run by the drain
    pub fn ran(&self) -> usize {
        self.executed.len() + self.failed.len()
    }
}

/// FIFO queue of callbacks gated on the transition lock
pub struct TaskQueue {
    gate: Arc<dyn TransitionGate>,
    state: Mutex<QueueState>,
}

impl TaskQueue {
    /// Create a queue consulting the given gate
    pub fn new(gate: Arc<dyn TransitionGate>) -> Self {
        Self { gate, state: Mutex::new(QueueState::default()) }
    }

    /// Run the callback now if no transition is in flight and nothing is
    /// waiting, otherwise append it to the queue
    pub fn enqueue<F>(&self, label: impl Into<String>, task: F) -> Enqueued
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        let label = label.into();
        {
            let mut state = self.state.lock();
            if state.draining || !state.pending.is_empty() || self.gate.is_locked() {
                state.pending.push_back(QueuedTask {
                    label: label.clone(),
                    task: Box::new(task),
                    enqueued_at: Instant::now(),
                });
                let position = state.pending.len() - 1;
                tracing::trace!(label = %label, position, "task deferred");
                return Enqueued::Deferred { position };
            }
        }

        let succeeded = run_isolated(&label, Box::new(task));
        Enqueued::RanImmediately { succeeded }
    }

    /// Execute every queued callback in enqueue order, then leave the queue
    /// empty except for callbacks enqueued while this drain was running
    pub fn drain_on_release(&self) -> Result<DrainReport> {
        if self.gate.is_locked() {
            return Err(TaskQueueError::GateLocked);
        }
        let batch = self.begin_release()?;
        Ok(self.drain(batch))
    }

    /// Take every waiting callback and mark the queue draining. Called while
    /// the lock is still held, so a callback enqueued after the lock opens
    /// queues behind this batch instead of running ahead of it.
    pub(crate) fn begin_release(&self) -> Result<ReleaseBatch> {
        let mut state = self.state.lock();
        if state.draining {
            return Err(TaskQueueError::ReentrantDrain);
        }
        state.draining = true;
        Ok(ReleaseBatch { tasks: std::mem::take(&mut state.pending) })
    }

    /// Run a batch taken by [`begin_release`](Self::begin_release)
    pub(crate) fn drain(&self, batch: ReleaseBatch) -> DrainReport {
        let mut report = DrainReport::default();
        for queued in batch.tasks {
            let waited_ms = queued.enqueued_at.elapsed().as_millis() as u64;
            tracing::trace!(label = %queued.label, waited_ms, "running deferred task");
            if run_isolated(&queued.label, queued.task) {
                report.executed.push(queued.label);
            } else {
                report.failed.push(queued.label);
            }
        }

        let mut state = self.state.lock();
        state.draining = false;
        report.deferred = state.pending.len();

        tracing::debug!(
            executed = report.executed.len(),
            failed = report.failed.len(),
            deferred = report.deferred,
            "task queue drained"
        );
        report
    }

    /// Number of callbacks waiting
    pub fn len(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Whether no callbacks are waiting
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Labels of waiting callbacks, in queue order
    pub fn pending_labels(&self) -> Vec<String> {
        self.state.lock().pending.iter().map(|q| q.label.clone()).collect()
    }
}

/// Run one callback so that neither an error nor a panic escapes
fn run_isolated(label: &str, task: DeferredTask) -> bool {
    match catch_unwind(AssertUnwindSafe(task)) {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            tracing::warn!(label, error = %e, "deferred task failed");
            false
        }
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!(label, panic = %message, "deferred task panicked");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transition_lock::MockTransitionGate;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    struct FakeGate(AtomicBool);

    impl FakeGate {
        fn set(&self, locked: bool) {
            self.0.store(locked, Ordering::SeqCst);
        }
    }

    impl TransitionGate for FakeGate {
        fn is_locked(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }
    }

    fn recorder() -> Arc<Mutex<Vec<&'static str>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn record(log: &Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> impl FnOnce() -> anyhow::Result<()> {
        let log = Arc::clone(log);
        move || {
            log.lock().push(name);
            Ok(())
        }
    }

    #[test]
    fn test_enqueue_runs_immediately_when_unlocked() {
        let mut gate = MockTransitionGate::new();
        gate.expect_is_locked().return_const(false);
        let queue = TaskQueue::new(Arc::new(gate));
        let log = recorder();

        let result = queue.enqueue("write", record(&log, "write"));

        assert_eq!(result, Enqueued::RanImmediately { succeeded: true });
        assert_eq!(*log.lock(), vec!["write"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_enqueue_defers_when_locked() {
        let mut gate = MockTransitionGate::new();
        gate.expect_is_locked().return_const(true);
        let queue = TaskQueue::new(Arc::new(gate));
        let log = recorder();

        assert_eq!(queue.enqueue("a", record(&log, "a")), Enqueued::Deferred { position: 0 });
        assert_eq!(queue.enqueue("b", record(&log, "b")), Enqueued::Deferred { position: 1 });

        assert!(log.lock().is_empty());
        assert_eq!(queue.pending_labels(), vec!["a", "b"]);
        assert_eq!(queue.drain_on_release(), Err(TaskQueueError::GateLocked));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_drain_runs_in_fifo_order_exactly_once() {
        let gate = Arc::new(FakeGate::default());
        let queue = TaskQueue::new(gate.clone());
        let log = recorder();

        gate.set(true);
        queue.enqueue("A", record(&log, "A"));
        queue.enqueue("B", record(&log, "B"));
        queue.enqueue("C", record(&log, "C"));
        gate.set(false);

        let report = queue.drain_on_release().unwrap();
        assert_eq!(report.executed, vec!["A", "B", "C"]);
        assert_eq!(*log.lock(), vec!["A", "B", "C"]);

        let again = queue.drain_on_release().unwrap();
        assert_eq!(again.ran(), 0);
        assert_eq!(log.lock().len(), 3);
    }

    #[test]
    fn test_task_enqueued_during_drain_waits_for_next_release() {
        let gate = Arc::new(FakeGate::default());
        let queue = Arc::new(TaskQueue::new(gate.clone()));
        let log = recorder();

        gate.set(true);
        let inner_queue = Arc::clone(&queue);
        let inner_log = Arc::clone(&log);
        queue.enqueue("A", move || {
            inner_log.lock().push("A");
            let d = record(&inner_log, "D");
            inner_queue.enqueue("D", d);
            Ok(())
        });
        queue.enqueue("B", record(&log, "B"));
        gate.set(false);

        let report = queue.drain_on_release().unwrap();
        assert_eq!(report.executed, vec!["A", "B"]);
        assert_eq!(report.deferred, 1);
        assert_eq!(*log.lock(), vec!["A", "B"]);

        // next lock cycle
        gate.set(true);
        gate.set(false);
        let report = queue.drain_on_release().unwrap();
        assert_eq!(report.executed, vec!["D"]);
        assert_eq!(*log.lock(), vec!["A", "B", "D"]);
    }

    #[test]
    fn test_failing_tasks_are_isolated() {
        let gate = Arc::new(FakeGate::default());
        let queue = TaskQueue::new(gate.clone());
        let log = recorder();

        gate.set(true);
        queue.enqueue("first", record(&log, "first"));
        queue.enqueue("errors", || Err(anyhow::anyhow!("cache write rejected")));
        queue.enqueue("panics", || panic!("bad cache write"));
        queue.enqueue("last", record(&log, "last"));
        gate.set(false);

        let report = queue.drain_on_release().unwrap();
        assert_eq!(report.executed, vec!["first", "last"]);
        assert_eq!(report.failed, vec!["errors", "panics"]);
        assert_eq!(*log.lock(), vec!["first", "last"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_failing_immediate_task_is_reported() {
        let queue = TaskQueue::new(Arc::new(FakeGate::default()));
        let result = queue.enqueue("bad", || Err(anyhow::anyhow!("nope")));
        assert_eq!(result, Enqueued::RanImmediately { succeeded: false });
    }

    #[test]
    fn test_enqueue_after_release_queues_behind_batch() {
        let gate = Arc::new(FakeGate::default());
        let queue = TaskQueue::new(gate.clone());
        let log = recorder();

        gate.set(true);
        queue.enqueue("old", record(&log, "old"));
        let batch = queue.begin_release().unwrap();
        gate.set(false);

        // lock already open, drain not yet run
        assert_eq!(queue.enqueue("new", record(&log, "new")), Enqueued::Deferred { position: 0 });
        assert!(log.lock().is_empty());

        let report = queue.drain(batch);
        assert_eq!(report.executed, vec!["old"]);
        assert_eq!(report.deferred, 1);

        let report = queue.drain_on_release().unwrap();
        assert_eq!(report.executed, vec!["new"]);
        assert_eq!(*log.lock(), vec!["old", "new"]);
    }

    #[test]
    fn test_enqueue_waits_behind_leftover_tasks() {
        let gate = Arc::new(FakeGate::default());
        let queue = TaskQueue::new(gate.clone());
        let log = recorder();

        gate.set(true);
        queue.enqueue("leftover", record(&log, "leftover"));
        gate.set(false);

        assert_eq!(queue.enqueue("later", record(&log, "later")), Enqueued::Deferred { position: 1 });
        queue.drain_on_release().unwrap();
        assert_eq!(*log.lock(), vec!["leftover", "later"]);
        assert_eq!(
            queue.enqueue("now", record(&log, "now")),
            Enqueued::RanImmediately { succeeded: true }
        );
    }

    #[test]
    fn test_reentrant_drain_is_rejected() {
        let gate = Arc::new(FakeGate::default());
        let queue = Arc::new(TaskQueue::new(gate.clone()));
        let observed = Arc::new(Mutex::new(None));

        gate.set(true);
        let inner_queue = Arc::clone(&queue);
        let inner_observed = Arc::clone(&observed);
        queue.enqueue("drains", move || {
            *inner_observed.lock() = Some(inner_queue.drain_on_release());
            Ok(())
        });
        gate.set(false);

        queue.drain_on_release().unwrap();
        assert_eq!(*observed.lock(), Some(Err(TaskQueueError::ReentrantDrain)));
    }
}
