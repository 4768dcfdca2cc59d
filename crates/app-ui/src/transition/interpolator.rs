//! Gesture-driven interpolator
//!
//! Pure functions from (progress, geometry, velocity) to per-layer styles.
//! Progress is how far the navigation has gone, 0 → 1 in both directions.
//! The top card's presentation (0 off-screen to the right, 1 fully shown)
//! is `progress` for a push and `1 - progress` for a pop, so the backward
//! ranges are the forward ranges traversed in reverse.
//!
//! All interpolation is clamped: neither input nor output ever leaves its
//! declared range, even if the signal hands us garbage.

use serde::{Deserialize, Serialize};

use super::config::InterpolatorConfig;
use super::progress::{COMPLETE, START};
use app_state::{Direction, TransitionDescriptor};

/// Visual properties of one screen layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerStyle {
    /// Horizontal offset in points
    pub translate_x: f64,
    /// Uniform scale
    pub scale: f64,
    /// Opacity of the edge shadow cast by this layer
    pub shadow_opacity: f64,
    /// Opacity of the dimming overlay drawn over this layer
    pub overlay_opacity: f64,
}

impl Default for LayerStyle {
    fn default() -> Self {
        Self { translate_x: 0.0, scale: 1.0, shadow_opacity: 0.0, overlay_opacity: 0.0 }
    }
}

/// Styles of both participating screens for one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitionFrame {
    /// Progress the frame was computed from, after clamping
    pub progress: f64,
    /// Screen that becomes focused when the transition completes
    pub incoming: LayerStyle,
    /// Screen that loses focus when the transition completes
    pub outgoing: LayerStyle,
}

/// Where a released gesture animates to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapTarget {
    /// Progress 1: the navigation happens
    Complete,
    /// Progress 0: back to the screen the transition started on
    Revert,
}

impl SnapTarget {
    /// Progress value of this target
    pub fn progress(self) -> f64 {
        match self {
            SnapTarget::Complete => COMPLETE,
            SnapTarget::Revert => START,
        }
    }
}

/// Outcome of releasing a gesture
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReleaseDecision {
    /// Progress the gesture was released at
    pub progress: f64,
    /// `progress + velocity * velocity_impact`
    pub projected: f64,
    /// Where the release animation goes
    pub target: SnapTarget,
}

impl ReleaseDecision {
    /// Progress distance left to animate
    pub fn remaining(&self) -> f64 {
        (self.target.progress() - self.progress).abs()
    }
}

fn sanitize_progress(progress: f64) -> f64 {
    if progress.is_nan() {
        START
    } else {
        progress.clamp(START, COMPLETE)
    }
}

/// Presentation of the top card at `progress`
fn presentation(direction: Direction, progress: f64) -> f64 {
    match direction {
        Direction::Forward => progress,
        Direction::Backward => COMPLETE - progress,
    }
}

fn lerp(start: f64, end: f64, t: f64) -> f64 {
    (end - start).mul_add(t, start)
}

/// Map `value` from `input` to `output`, clamping on both sides
pub fn interpolate(value: f64, input: (f64, f64), output: (f64, f64)) -> f64 {
    let (in_lo, in_hi) = input;
    let span = in_hi - in_lo;
    let t = if span.abs() < f64::EPSILON || value.is_nan() {
        if value >= in_hi { 1.0 } else { 0.0 }
    } else {
        ((value - in_lo) / span).clamp(0.0, 1.0)
    };

    let (out_lo, out_hi) = (output.0.min(output.1), output.0.max(output.1));
    lerp(output.0, output.1, t).clamp(out_lo, out_hi)
}

/// Progress of a swipe-back whose finger moved `translation` points to the
/// right of where it went down
pub fn progress_for_translation(translation: f64, screen_width: f64) -> f64 {
    if screen_width <= 0.0 || !screen_width.is_finite() {
        return START;
    }
    sanitize_progress(translation / screen_width)
}

/// Convert a swipe-back finger velocity (points per second, rightward
/// positive) into progress per second
pub fn progress_velocity(points_per_second: f64, screen_width: f64) -> f64 {
    if screen_width <= 0.0 || !screen_width.is_finite() || !points_per_second.is_finite() {
        return 0.0;
    }
    points_per_second / screen_width
}

/// Computes layer styles and release decisions for one configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Interpolator {
    config: InterpolatorConfig,
}

impl Default for Interpolator {
    fn default() -> Self {
        Self::new(InterpolatorConfig::default())
    }
}

impl Interpolator {
    /// Create an interpolator; out-of-range configuration values are clamped
    pub fn new(config: InterpolatorConfig) -> Self {
        Self { config: config.sanitized() }
    }

    /// Configuration in effect
    pub fn config(&self) -> &InterpolatorConfig {
        &self.config
    }

    /// Style of the card being pushed or popped at `presentation`
    /// (0 off-screen, 1 fully shown)
    pub fn top_card(&self, presentation: f64, screen_width: f64) -> LayerStyle {
        let p = sanitize_progress(presentation);
        let width = screen_width.max(0.0);
        LayerStyle {
            translate_x: interpolate(p, (0.0, 1.0), (width, 0.0)),
            scale: 1.0,
            shadow_opacity: interpolate(p, (0.0, 1.0), (0.0, self.config.shadow_max)),
            overlay_opacity: 0.0,
        }
    }

    /// Style of the screen beneath the top card at `presentation`
    pub fn under_card(&self, presentation: f64, screen_width: f64) -> LayerStyle {
        let p = sanitize_progress(presentation);
        let width = screen_width.max(0.0);
        let parallax = -self.config.parallax_factor * width;
        LayerStyle {
            translate_x: interpolate(p, (0.0, 1.0), (0.0, parallax)),
            scale: interpolate(p, (0.0, 1.0), (1.0, self.config.scale_floor)),
            shadow_opacity: 0.0,
            overlay_opacity: interpolate(p, (0.0, 1.0), (0.0, self.config.overlay_max)),
        }
    }

    /// Styles of both screens at `progress`
    pub fn frame(&self, descriptor: &TransitionDescriptor, progress: f64) -> TransitionFrame {
        self.frame_for(descriptor.direction, descriptor.screen_width, progress)
    }

    /// Styles of both screens for a direction and width
    pub fn frame_for(&self, direction: Direction, screen_width: f64, progress: f64) -> TransitionFrame {
        let p = sanitize_progress(progress);
        let shown = presentation(direction, p);
        let top = self.top_card(shown, screen_width);
        let under = self.under_card(shown, screen_width);
        match direction {
            Direction::Forward => TransitionFrame { progress: p, incoming: top, outgoing: under },
            Direction::Backward => TransitionFrame { progress: p, incoming: under, outgoing: top },
        }
    }

    /// Decide where a released gesture settles. `velocity` is in progress
    /// units per second. A release with zero velocity exactly at the
    /// threshold reverts.
    pub fn release(&self, progress: f64, velocity: f64) -> ReleaseDecision {
        let p = sanitize_progress(progress);
        let v = if velocity.is_finite() { velocity } else { 0.0 };
        let projected = v.mul_add(self.config.velocity_impact, p);

        let target = if p <= START {
            SnapTarget::Revert
        } else if p >= COMPLETE {
            SnapTarget::Complete
        } else if v == 0.0 {
            if projected > self.config.commit_threshold {
                SnapTarget::Complete
            } else {
                SnapTarget::Revert
            }
        } else if projected >= self.config.commit_threshold {
            SnapTarget::Complete
        } else {
            SnapTarget::Revert
        };

        ReleaseDecision { progress: p, projected, target }
    }
}
