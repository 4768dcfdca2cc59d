//! Progress signal
//!
//! A shared scalar in [0, 1] that every animated layer of a transition reads.
//! It measures how far the navigation has gone: 0 where the transition
//! started, 1 once the push or pop is complete, in either direction.
//! The value is stored as `f64` bits in an atomic cell. There is exactly one
//! [`ProgressWriter`] (it is not `Clone`), owned by the active animation
//! driver; readers are cheap clones.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Progress of a finished navigation
pub const COMPLETE: f64 = 1.0;

/// Progress where every transition starts
pub const START: f64 = 0.0;

fn store(cell: &AtomicU64, value: f64) {
    cell.store(value.to_bits(), Ordering::Release);
}

fn load(cell: &AtomicU64) -> f64 {
    f64::from_bits(cell.load(Ordering::Acquire))
}

/// Create a signal holding `initial`, returning its single writer
pub fn signal(initial: f64) -> ProgressWriter {
    let start = if initial.is_nan() { START } else { initial.clamp(START, COMPLETE) };
    ProgressWriter { cell: Arc::new(AtomicU64::new(start.to_bits())) }
}

/// The single writer of a progress signal
#[derive(Debug)]
pub struct ProgressWriter {
    cell: Arc<AtomicU64>,
}

impl ProgressWriter {
    /// Write a new value, clamped into [0, 1]. NaN is ignored and the last
    /// value kept. Returns the value now held.
    pub fn set(&self, value: f64) -> f64 {
        if value.is_nan() {
            tracing::warn!("NaN written to progress signal, ignored");
            return self.read();
        }
        let clamped = value.clamp(START, COMPLETE);
        store(&self.cell, clamped);
        clamped
    }

    /// Current value
    pub fn read(&self) -> f64 {
        load(&self.cell)
    }

    /// New reader of this signal
    pub fn reader(&self) -> ProgressReader {
        ProgressReader { cell: Arc::clone(&self.cell) }
    }
}

/// Read side of a progress signal
#[derive(Debug, Clone)]
pub struct ProgressReader {
    cell: Arc<AtomicU64>,
}

impl ProgressReader {
    /// Current value; side-effect free
    pub fn read(&self) -> f64 {
        load(&self.cell)
    }

    /// Whether both readers observe the same signal
    pub fn same_signal(&self, other: &ProgressReader) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }
}
