//! Transition coordinator
//!
//! The single injectable object that owns the transition lock, the deferred
//! task queue and the interaction tracker. One instance is created at app
//! start and shared by reference; it has no teardown.
//!
//! Ordering on settle is fixed: the lock releases, then the task queue
//! drains, then callbacks waiting for interactions (hydration gates) fire.
//! A consumer that observes a drained queue can rely on the lock being idle.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::interactions::{AfterInteractions, InteractionHandle, InteractionTracker, ScheduledId};
use crate::task_queue::{DrainReport, Enqueued, TaskQueue};
use crate::transition_lock::{
    LockState, Result, SettleOutcome, TransitionDescriptor, TransitionError, TransitionGate,
    TransitionId, TransitionLock,
};

/// Coordinator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Lock age after which `check_stuck` starts warning
    pub stuck_lock_warning_ms: u64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self { stuck_lock_warning_ms: 5_000 }
    }
}

impl CoordinatorConfig {
    /// Lock age after which `check_stuck` starts warning
    pub fn stuck_lock_warning(&self) -> Duration {
        Duration::from_millis(self.stuck_lock_warning_ms)
    }
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    id: TransitionId,
    descriptor: TransitionDescriptor,
    started_at: Instant,
}

/// Summary of one settle event
#[derive(Debug, Clone, PartialEq)]
pub struct SettleReport {
    /// Transition that settled
    pub id: TransitionId,
    /// How it settled
    pub outcome: SettleOutcome,
    /// Deferred callbacks executed after the release
    pub drain: DrainReport,
    /// Callbacks waiting for interactions that fired
    pub hydrated: usize,
    /// How long the lock was held
    pub locked_for: Duration,
}

/// Lock, task queue and interaction scheduling for screen transitions
pub struct TransitionCoordinator {
    lock: Arc<TransitionLock>,
    queue: TaskQueue,
    interactions: Arc<InteractionTracker>,
    current: Mutex<Option<InFlight>>,
    next_id: AtomicU64,
    config: CoordinatorConfig,
}

impl Default for TransitionCoordinator {
    fn default() -> Self {
        Self::new(CoordinatorConfig::default())
    }
}

impl TransitionCoordinator {
    /// Create a coordinator with an idle lock and empty queue
    pub fn new(config: CoordinatorConfig) -> Self {
        let lock = Arc::new(TransitionLock::new());
        let gate: Arc<dyn TransitionGate> = lock.clone();

        Self {
            lock,
            queue: TaskQueue::new(gate),
            interactions: Arc::new(InteractionTracker::new()),
            current: Mutex::new(None),
            next_id: AtomicU64::new(1),
            config,
        }
    }

    /// Transition start: IDLE → LOCKED
    pub fn begin(&self, descriptor: TransitionDescriptor) -> Result<TransitionId> {
        let mut current = self.current.lock();
        if let Some(in_flight) = current.as_ref() {
            tracing::warn!(current = %in_flight.id, "overlapping transition rejected");
            return Err(TransitionError::AlreadyInFlight(in_flight.id));
        }

        let id = TransitionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        if !self.lock.acquire() {
            // only this coordinator writes the lock, so this means a bug
            tracing::error!(transition_id = %id, "lock held without an in-flight transition");
        }
        *current = Some(InFlight { id, descriptor, started_at: Instant::now() });

        tracing::debug!(
            transition_id = %id,
            direction = ?descriptor.direction,
            gesture = descriptor.gesture_driven,
            "transition started"
        );
        Ok(id)
    }

    /// Transition settle: LOCKED → IDLE, then drain the queue and fire
    /// callbacks waiting for interactions
    pub fn settle(&self, id: TransitionId, outcome: SettleOutcome) -> Result<SettleReport> {
        let (in_flight, batch) = {
            let mut current = self.current.lock();
            let in_flight = match current.as_ref() {
                None => {
                    tracing::warn!(transition_id = %id, "settle without transition in flight");
                    return Err(TransitionError::NotInFlight);
                }
                Some(f) if f.id != id => {
                    tracing::warn!(transition_id = %id, current = %f.id, "settle for stale transition");
                    return Err(TransitionError::UnknownTransition { got: id, current: f.id });
                }
                Some(f) => *f,
            };
            *current = None;
            // taken before the lock opens so later enqueues queue behind it
            let batch = self.queue.begin_release();
            self.lock.release();
            (in_flight, batch)
        };

        let locked_for = in_flight.started_at.elapsed();
        tracing::debug!(
            transition_id = %id,
            ?outcome,
            locked_ms = locked_for.as_millis() as u64,
            "transition settled"
        );

        let drain = match batch {
            Ok(batch) => self.queue.drain(batch),
            Err(e) => {
                tracing::warn!(transition_id = %id, error = %e, "task queue not drained");
                DrainReport::default()
            }
        };
        let hydrated = self.flush_interactions();

        Ok(SettleReport { id, outcome, drain, hydrated, locked_for })
    }

    /// Whether a transition is currently animating
    pub fn is_locked(&self) -> bool {
        self.lock.is_locked()
    }

    /// Current lock state
    pub fn lock_state(&self) -> LockState {
        self.lock.state()
    }

    /// Completed lock cycles since startup
    pub fn completed_transitions(&self) -> u64 {
        self.lock.cycles()
    }

    /// The in-flight transition, if any
    pub fn current(&self) -> Option<(TransitionId, TransitionDescriptor)> {
        self.current.lock().map(|f| (f.id, f.descriptor))
    }

    /// Shared handle to the lock, for components that only need to read it
    pub fn gate(&self) -> Arc<dyn TransitionGate> {
        self.lock.clone()
    }

    /// Run a side effect now, or defer it until the lock releases
    pub fn enqueue<F>(&self, label: impl Into<String>, task: F) -> Enqueued
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        self.queue.enqueue(label, task)
    }

    /// Number of deferred callbacks waiting for the next release
    pub fn pending_tasks(&self) -> usize {
        self.queue.len()
    }

    /// Run a callback once the lock is idle and no interaction is open.
    /// Fires immediately when the scheduler is already quiescent.
    pub fn run_after_interactions(&self, callback: AfterInteractions) -> ScheduledId {
        let id = self.interactions.schedule(callback);
        self.flush_interactions();
        id
    }

    /// Cancel a callback scheduled with `run_after_interactions`
    pub fn cancel_scheduled(&self, id: ScheduledId) -> bool {
        self.interactions.cancel(id)
    }

    /// Open an interaction that delays after-interactions callbacks
    pub fn create_interaction_handle(&self) -> InteractionHandle {
        self.interactions.create_handle()
    }

    /// Close an interaction; flushes waiting callbacks if nothing else is busy
    pub fn clear_interaction_handle(&self, handle: InteractionHandle) -> bool {
        let cleared = self.interactions.clear_handle(handle);
        if cleared {
            self.flush_interactions();
        }
        cleared
    }

    /// Report a lock held longer than the configured warning age. The lock is
    /// never released from here.
    pub fn check_stuck(&self) -> Option<Duration> {
        let in_flight = (*self.current.lock())?;
        let age = in_flight.started_at.elapsed();
        if age < self.config.stuck_lock_warning() {
            return None;
        }
        tracing::warn!(
            transition_id = %in_flight.id,
            locked_ms = age.as_millis() as u64,
            pending = self.queue.len(),
            "transition lock held past warning threshold; settle event may be missing"
        );
        Some(age)
    }

    pub(crate) fn tracker(&self) -> &Arc<InteractionTracker> {
        &self.interactions
    }

    fn flush_interactions(&self) -> usize {
        if self.lock.is_locked() {
            return 0;
        }
        let ready = self.interactions.take_if_quiescent();
        let count = ready.len();
        for callback in ready {
            callback();
        }
        if count > 0 {
            tracing::trace!(count, "after-interactions callbacks fired");
        }
        count
    }
}
