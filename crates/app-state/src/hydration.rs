//! Deferred hydration gates
//!
//! Each screen instance owns one gate. It starts closed, the screen renders a
//! placeholder, and it opens exactly once after the enclosing transition and
//! every other open interaction have finished. Heavy children (data-bound
//! lists, store subscriptions) mount only once the gate is open.
//!
//! Dropping the gate tears it down: the pending callback is cancelled and a
//! late trigger becomes a no-op.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::watch;

use crate::coordinator::TransitionCoordinator;
use crate::interactions::{InteractionTracker, ScheduledId};

struct GateState {
    screen: String,
    ready: AtomicBool,
    cancelled: AtomicBool,
    opened: AtomicU32,
    tx: watch::Sender<bool>,
}

/// Fires a gate. Safe to call any number of times from any scheduler; only
/// the first call on a live gate flips it.
#[derive(Clone)]
pub struct HydrationTrigger {
    state: Weak<GateState>,
}

impl HydrationTrigger {
    /// Flip the gate to ready. Returns true only for the call that flipped it.
    pub fn fire(&self) -> bool {
        let Some(state) = self.state.upgrade() else {
            return false;
        };
        if state.cancelled.load(Ordering::Acquire) {
            return false;
        }
        if state
            .ready
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        state.opened.fetch_add(1, Ordering::Relaxed);
        state.tx.send_replace(true);
        tracing::trace!(screen = %state.screen, "hydration gate open");
        true
    }
}

/// One-shot readiness flag for a screen instance
pub struct HydrationGate {
    state: Arc<GateState>,
    scheduled: Option<(Weak<InteractionTracker>, ScheduledId)>,
}

impl HydrationGate {
    /// Create a closed gate that nothing will fire yet
    pub fn new(screen: impl Into<String>) -> Self {
        let (tx, _) = watch::channel(false);
        Self {
            state: Arc::new(GateState {
                screen: screen.into(),
                ready: AtomicBool::new(false),
                cancelled: AtomicBool::new(false),
                opened: AtomicU32::new(0),
                tx,
            }),
            scheduled: None,
        }
    }

    /// Create a gate that opens once the coordinator's transition and
    /// interactions have finished
    pub fn arm(coordinator: &TransitionCoordinator, screen: impl Into<String>) -> Self {
        let mut gate = Self::new(screen);
        let trigger = gate.trigger();
        let id = coordinator.run_after_interactions(Box::new(move || {
            trigger.fire();
        }));
        gate.scheduled = Some((Arc::downgrade(coordinator.tracker()), id));
        gate
    }

    /// Handle that opens this gate
    pub fn trigger(&self) -> HydrationTrigger {
        HydrationTrigger { state: Arc::downgrade(&self.state) }
    }

    /// Screen instance this gate belongs to
    pub fn screen(&self) -> &str {
        &self.state.screen
    }

    /// Whether heavy children may mount
    pub fn is_ready(&self) -> bool {
        self.state.ready.load(Ordering::Acquire)
    }

    /// Number of times the gate flipped; never more than one
    pub fn open_count(&self) -> u32 {
        self.state.opened.load(Ordering::Relaxed)
    }

    /// Subscribe to readiness changes
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.state.tx.subscribe()
    }

    /// Wait until the gate is open
    pub async fn ready(&self) {
        let mut rx = self.subscribe();
        // the sender lives as long as `self`, so this only ends on `true`
        let _ = rx.wait_for(|ready| *ready).await;
    }

    /// Tear the gate down. Pending callbacks become no-ops.
    pub fn cancel(&mut self) {
        self.state.cancelled.store(true, Ordering::Release);
        if let Some((tracker, id)) = self.scheduled.take() {
            if let Some(tracker) = tracker.upgrade() {
                tracker.cancel(id);
            }
        }
    }
}

impl Drop for HydrationGate {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for HydrationGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HydrationGate")
            .field("screen", &self.state.screen)
            .field("ready", &self.is_ready())
            .finish()
    }
}
