//! Interaction tracking
//!
//! Tracks interactions other than the transition itself (sheet animations,
//! drags) that keep the logic thread busy, and holds fire-once callbacks that
//! wait for every interaction to finish.

use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};

/// Handle for an open interaction; clear it through the coordinator
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct InteractionHandle(u64);

impl InteractionHandle {
    /// Raw identifier
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Identifier of a callback waiting for interactions to finish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScheduledId(u64);

/// Callback run once interactions have finished
pub type AfterInteractions = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct TrackerState {
    next_id: u64,
    open: HashSet<u64>,
    waiting: BTreeMap<u64, AfterInteractions>,
}

impl TrackerState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Registry of open interactions and waiting callbacks
#[derive(Default)]
pub struct InteractionTracker {
    state: Mutex<TrackerState>,
}

impl InteractionTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Open an interaction
    pub fn create_handle(&self) -> InteractionHandle {
        let mut state = self.state.lock();
        let id = state.next_id();
        state.open.insert(id);
        InteractionHandle(id)
    }

    /// Close an interaction. Returns false if it was already closed.
    pub fn clear_handle(&self, handle: InteractionHandle) -> bool {
        self.state.lock().open.remove(&handle.0)
    }

    /// Number of open interactions
    pub fn open_count(&self) -> usize {
        self.state.lock().open.len()
    }

    /// Park a callback until interactions finish
    pub fn schedule(&self, callback: AfterInteractions) -> ScheduledId {
        let mut state = self.state.lock();
        let id = state.next_id();
        state.waiting.insert(id, callback);
        ScheduledId(id)
    }

    /// Drop a parked callback. Returns false if it already ran or was cancelled.
    pub fn cancel(&self, id: ScheduledId) -> bool {
        self.state.lock().waiting.remove(&id.0).is_some()
    }

    /// Number of parked callbacks
    pub fn waiting_count(&self) -> usize {
        self.state.lock().waiting.len()
    }

    /// Take every parked callback, in scheduling order, if no interaction is
    /// open. The caller runs them outside the tracker lock.
    pub(crate) fn take_if_quiescent(&self) -> Vec<AfterInteractions> {
        let mut state = self.state.lock();
        if !state.open.is_empty() {
            return Vec::new();
        }
        std::mem::take(&mut state.waiting).into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counter_callback(counter: &Arc<AtomicUsize>) -> AfterInteractions {
        let counter = Arc::clone(counter);
        Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_handles_block_flush() {
        let tracker = InteractionTracker::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let handle = tracker.create_handle();
        tracker.schedule(counter_callback(&counter));

        assert!(tracker.take_if_quiescent().is_empty());
        assert_eq!(tracker.waiting_count(), 1);

        assert!(tracker.clear_handle(handle));
        for callback in tracker.take_if_quiescent() {
            callback();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.waiting_count(), 0);
    }

    #[test]
    fn test_cancelled_callback_never_runs() {
        let tracker = InteractionTracker::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let id = tracker.schedule(counter_callback(&counter));
        assert!(tracker.cancel(id));
        assert!(!tracker.cancel(id));

        for callback in tracker.take_if_quiescent() {
            callback();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_clear_handle_twice() {
        let tracker = InteractionTracker::new();
        let handle = tracker.create_handle();
        let id = handle.id();
        assert_eq!(tracker.open_count(), 1);
        assert!(tracker.clear_handle(handle));
        assert!(!tracker.clear_handle(InteractionHandle(id)));
    }
}
