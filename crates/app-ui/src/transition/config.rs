//! Transition configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::driver::Easing;
use crate::tokens::{card, duration};

/// Geometry and release parameters of the card transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpolatorConfig {
    /// Fraction of the screen width the covered screen slides away
    pub parallax_factor: f64,
    /// Scale of the covered screen once fully covered
    pub scale_floor: f64,
    /// Dimming overlay opacity on the covered screen
    pub overlay_max: f64,
    /// Edge shadow opacity on the top card
    pub shadow_max: f64,
    /// Seconds of gesture velocity projected forward on release
    pub velocity_impact: f64,
    /// Projected progress at or above which a released gesture completes
    pub commit_threshold: f64,
}

impl Default for InterpolatorConfig {
    fn default() -> Self {
        Self {
            parallax_factor: card::PARALLAX_FACTOR,
            scale_floor: card::SCALE_FLOOR,
            overlay_max: card::OVERLAY_MAX,
            shadow_max: card::SHADOW_MAX,
            velocity_impact: card::VELOCITY_IMPACT,
            commit_threshold: card::COMMIT_THRESHOLD,
        }
    }
}

fn unit(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        fallback
    }
}

impl InterpolatorConfig {
    /// Copy with every fraction clamped into [0, 1] and a non-negative
    /// velocity impact; non-finite values fall back to the defaults
    pub fn sanitized(&self) -> Self {
        let defaults = Self::default();
        Self {
            parallax_factor: unit(self.parallax_factor, defaults.parallax_factor),
            scale_floor: unit(self.scale_floor, defaults.scale_floor),
            overlay_max: unit(self.overlay_max, defaults.overlay_max),
            shadow_max: unit(self.shadow_max, defaults.shadow_max),
            velocity_impact: if self.velocity_impact.is_finite() {
                self.velocity_impact.max(0.0)
            } else {
                defaults.velocity_impact
            },
            commit_threshold: unit(self.commit_threshold, defaults.commit_threshold),
        }
    }
}

/// Timing of pushes, pops and gesture releases
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionConfig {
    /// Geometry and release parameters
    pub interpolator: InterpolatorConfig,
    /// Screen width used when the platform reports none
    pub screen_width: f64,
    /// Full programmatic push or pop
    pub push_duration_ms: u64,
    /// Release animation covering the full distance
    pub settle_duration_ms: u64,
    /// Shortest release animation
    pub min_settle_duration_ms: u64,
    /// Curve for every timing animation
    pub easing: Easing,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            interpolator: InterpolatorConfig::default(),
            screen_width: card::DEFAULT_SCREEN_WIDTH,
            push_duration_ms: duration::SLOW,
            settle_duration_ms: duration::SETTLE,
            min_settle_duration_ms: duration::EXTRA_FAST,
            easing: Easing::default(),
        }
    }
}

impl TransitionConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fallback screen width
    pub fn screen_width(mut self, width: f64) -> Self {
        self.screen_width = width;
        self
    }

    /// Set the push/pop duration
    pub fn push_duration(mut self, duration: Duration) -> Self {
        self.push_duration_ms = duration.as_millis() as u64;
        self
    }

    /// Set the full-distance release duration
    pub fn settle_duration(mut self, duration: Duration) -> Self {
        self.settle_duration_ms = duration.as_millis() as u64;
        self
    }

    /// Set the easing curve
    pub fn easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Duration of a push or pop
    pub fn push(&self) -> Duration {
        Duration::from_millis(self.push_duration_ms)
    }

    /// Duration of a release animation covering `remaining` progress
    pub fn settle_for(&self, remaining: f64) -> Duration {
        let remaining = if remaining.is_finite() { remaining.clamp(0.0, 1.0) } else { 1.0 };
        let scaled = (self.settle_duration_ms as f64 * remaining).round() as u64;
        Duration::from_millis(scaled.max(self.min_settle_duration_ms))
    }
}
