//! Design tokens for screen transitions
//!
//! This module provides animation durations and the default geometry of the
//! card-stack transition.

// =============================================================================
// Duration Tokens
// =============================================================================

/// Animation duration tokens (in milliseconds)
pub mod duration {
    /// Instant (0ms)
    pub const INSTANT: u64 = 0;
    /// Extra fast (50ms)
    pub const EXTRA_FAST: u64 = 50;
    /// Fast (100ms)
    pub const FAST: u64 = 100;
    /// Normal (150ms)
    pub const NORMAL: u64 = 150;
    /// Moderate (200ms)
    pub const MODERATE: u64 = 200;
    /// Settle (250ms) - release animation after a gesture
    pub const SETTLE: u64 = 250;
    /// Slow (300ms) - full push or pop
    pub const SLOW: u64 = 300;
    /// Extra slow (500ms)
    pub const EXTRA_SLOW: u64 = 500;
}

// =============================================================================
// Card Transition Tokens
// =============================================================================

/// Card-stack transition geometry
pub mod card {
    /// Fraction of the screen width the covered screen slides away
    pub const PARALLAX_FACTOR: f64 = 0.3;
    /// Scale of the covered screen once fully covered
    pub const SCALE_FLOOR: f64 = 0.92;
    /// Dimming overlay opacity on the covered screen
    pub const OVERLAY_MAX: f64 = 0.35;
    /// Edge shadow opacity on the top card
    pub const SHADOW_MAX: f64 = 0.3;
    /// Seconds of gesture velocity projected forward on release
    pub const VELOCITY_IMPACT: f64 = 0.2;
    /// Projected progress at or above which a released gesture completes
    pub const COMMIT_THRESHOLD: f64 = 0.45;
    /// Fallback screen width in points
    pub const DEFAULT_SCREEN_WIDTH: f64 = 390.0;
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_scale() {
        assert!(duration::INSTANT < duration::EXTRA_FAST);
        assert!(duration::EXTRA_FAST < duration::FAST);
        assert!(duration::FAST < duration::NORMAL);
        assert!(duration::NORMAL < duration::MODERATE);
        assert!(duration::MODERATE < duration::SETTLE);
        assert!(duration::SETTLE < duration::SLOW);
        assert!(duration::SLOW < duration::EXTRA_SLOW);
    }

    #[test]
    fn test_card_tokens_are_unit_fractions() {
        for value in [
            card::PARALLAX_FACTOR,
            card::SCALE_FLOOR,
            card::OVERLAY_MAX,
            card::SHADOW_MAX,
            card::COMMIT_THRESHOLD,
        ] {
            assert!((0.0..=1.0).contains(&value));
        }
        assert!(card::DEFAULT_SCREEN_WIDTH > 0.0);
    }
}
