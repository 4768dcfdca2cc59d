//! Animation driver
//!
//! Advances a progress signal frame by frame. The driver owns the signal's
//! only writer: while a finger is down the gesture writes through it, and
//! once released (or for a programmatic push/pop) a timing animation does.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::progress::{ProgressReader, ProgressWriter};

// ============================================================================
// Easing Functions
// ============================================================================

/// Easing curve of a timing animation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    /// No acceleration
    Linear,
    /// Slow start, accelerates
    EaseIn,
    /// Fast start, decelerates
    #[default]
    EaseOut,
    /// Slow start and end
    EaseInOut,
}

impl Easing {
    /// Apply the curve to `t` in [0, 1]
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseIn => t * t * t,
            Easing::EaseOut => {
                let t1 = t - 1.0;
                (t1 * t1).mul_add(t1, 1.0)
            }
            Easing::EaseInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    let t1 = 2.0f64.mul_add(t, -2.0);
                    (0.5 * t1 * t1).mul_add(t1, 1.0)
                }
            }
        }
    }
}

// ============================================================================
// Timing Animation
// ============================================================================

/// A time-based animation between two progress values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingAnimation {
    /// Start value
    pub from: f64,
    /// End value
    pub to: f64,
    /// Total duration
    pub duration: Duration,
    /// Curve
    pub easing: Easing,
}

impl TimingAnimation {
    /// Value after `elapsed`
    pub fn sample(&self, elapsed: Duration) -> f64 {
        if self.is_finished(elapsed) {
            return self.to;
        }
        let t = elapsed.as_secs_f64() / self.duration.as_secs_f64();
        let eased = self.easing.apply(t);
        (self.to - self.from).mul_add(eased, self.from)
    }

    /// Whether the animation has reached its end value
    pub fn is_finished(&self, elapsed: Duration) -> bool {
        elapsed >= self.duration
    }
}

/// State of a driver after a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverStatus {
    /// Progress follows the finger
    Tracking,
    /// A timing animation is running
    Animating,
    /// The running animation just reached its target, or nothing is running
    Finished,
}

struct Running {
    animation: TimingAnimation,
    elapsed: Duration,
}

/// Single writer of a transition's progress signal
pub struct AnimationDriver {
    writer: ProgressWriter,
    running: Option<Running>,
}

impl AnimationDriver {
    /// Take ownership of a signal's writer
    pub fn new(writer: ProgressWriter) -> Self {
        Self { writer, running: None }
    }

    /// Reader for the layers driven by this driver
    pub fn reader(&self) -> ProgressReader {
        self.writer.reader()
    }

    /// Current progress
    pub fn progress(&self) -> f64 {
        self.writer.read()
    }

    /// Follow the finger: write progress directly, cancelling any animation
    pub fn track(&mut self, progress: f64) -> f64 {
        self.running = None;
        self.writer.set(progress)
    }

    /// Animate from the current value to `target`
    pub fn animate_to(&mut self, target: f64, duration: Duration, easing: Easing) {
        let animation = TimingAnimation { from: self.writer.read(), to: target, duration, easing };
        self.running = Some(Running { animation, elapsed: Duration::ZERO });
    }

    /// Target of the running animation
    pub fn target(&self) -> Option<f64> {
        self.running.as_ref().map(|r| r.animation.to)
    }

    /// Advance one frame
    pub fn tick(&mut self, dt: Duration) -> DriverStatus {
        let Some(running) = self.running.as_mut() else {
            return DriverStatus::Tracking;
        };

        running.elapsed += dt;
        let value = running.animation.sample(running.elapsed);
        self.writer.set(value);

        if running.animation.is_finished(running.elapsed) {
            self.running = None;
            DriverStatus::Finished
        } else {
            DriverStatus::Animating
        }
    }

    /// Jump straight to `value`, dropping any animation
    pub fn jump_to(&mut self, value: f64) -> f64 {
        self.running = None;
        self.writer.set(value)
    }
}
