//! Transition lock
//!
//! A strict process-wide boolean that is held for the duration of one
//! in-flight screen transition. Only one transition can animate at a time, so
//! there is no counter: acquiring an already held lock is an error, as is
//! releasing an idle one.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use thiserror::Error;

/// Transition lifecycle errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransitionError {
    /// A transition is already holding the lock
    #[error("Transition {0} is already in flight")]
    AlreadyInFlight(TransitionId),

    /// Settle delivered while no transition holds the lock
    #[error("No transition is in flight")]
    NotInFlight,

    /// Settle delivered for a transition that is not the in-flight one
    #[error("Transition {got} is not in flight (current: {current})")]
    UnknownTransition {
        /// Identifier named by the settle event
        got: TransitionId,
        /// Identifier of the transition holding the lock
        current: TransitionId,
    },
}

/// Result type for lifecycle operations
pub type Result<T> = std::result::Result<T, TransitionError>;

/// Identifier of one transition's lock cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransitionId(pub u64);

impl std::fmt::Display for TransitionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Direction of a screen transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// A screen is pushed on top of the current one
    #[default]
    Forward,
    /// The top screen is dismissed, revealing the one beneath
    Backward,
}

/// Immutable parameters of a transition, fixed when it starts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitionDescriptor {
    /// Transition direction
    pub direction: Direction,
    /// Width of the screen in points
    pub screen_width: f64,
    /// Gesture velocity at start, in progress units per second
    pub start_velocity: f64,
    /// Whether a finger drives the progress
    pub gesture_driven: bool,
}

impl TransitionDescriptor {
    /// Programmatic push of a new screen
    pub fn push(screen_width: f64) -> Self {
        Self { direction: Direction::Forward, screen_width, start_velocity: 0.0, gesture_driven: false }
    }

    /// Programmatic dismissal of the top screen
    pub fn pop(screen_width: f64) -> Self {
        Self { direction: Direction::Backward, screen_width, start_velocity: 0.0, gesture_driven: false }
    }

    /// Interactive swipe-back
    pub fn back_gesture(screen_width: f64) -> Self {
        Self { direction: Direction::Backward, screen_width, start_velocity: 0.0, gesture_driven: true }
    }

    /// Whether this transition closes the top screen
    pub fn is_closing(&self) -> bool {
        self.direction == Direction::Backward
    }
}

/// How a transition settled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettleOutcome {
    /// The navigation completed
    Commit,
    /// The navigation was reverted or aborted
    Cancel,
}

/// Lock states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    /// No transition in flight
    Idle,
    /// A transition is animating
    Locked,
}

/// Read-only view of the lock consulted by side-effecting background work
#[cfg_attr(test, mockall::automock)]
pub trait TransitionGate: Send + Sync {
    /// Whether a transition is currently animating
    fn is_locked(&self) -> bool;
}

/// Process-wide transition lock
#[derive(Debug, Default)]
pub struct TransitionLock {
    locked: AtomicBool,
    cycles: AtomicU64,
}

impl TransitionLock {
    /// Create an idle lock
    pub fn new() -> Self {
        Self::default()
    }

    /// IDLE → LOCKED. Returns false if the lock was already held.
    pub fn acquire(&self) -> bool {
        self.locked
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// LOCKED → IDLE. Returns false if the lock was idle.
    pub fn release(&self) -> bool {
        let released = self
            .locked
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if released {
            self.cycles.fetch_add(1, Ordering::Relaxed);
        }
        released
    }

    /// Current state
    pub fn state(&self) -> LockState {
        if self.is_locked() {
            LockState::Locked
        } else {
            LockState::Idle
        }
    }

    /// Number of completed LOCKED → IDLE cycles
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }
}

impl TransitionGate for TransitionLock {
    fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }
}
