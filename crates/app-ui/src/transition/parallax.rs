//! Multi-layer parallax driver
//!
//! Binds one progress signal to every visual layer of a card transition:
//! the incoming screen, the background (covered) screen, the edge shadow
//! and the dimming overlay. Layers never read the signal on their own
//! schedule; a frame snapshot reads it once and derives every style from
//! that single value, so no layer can lag another.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::interpolator::{Interpolator, LayerStyle, TransitionFrame};
use super::progress::ProgressReader;
use app_state::Direction;

/// Visual layer driven by a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    /// Screen gaining focus
    Incoming,
    /// Screen beneath the top card
    Background,
    /// Edge shadow travelling with the top card
    Shadow,
    /// Dimming overlay over the background screen
    Overlay,
}

impl LayerKind {
    /// All layers, back to front
    pub fn all() -> [LayerKind; 4] {
        [LayerKind::Background, LayerKind::Overlay, LayerKind::Shadow, LayerKind::Incoming]
    }
}

/// Styles of every layer, derived from one progress read
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParallaxFrame {
    /// Progress every style below was computed from
    pub progress: f64,
    /// Whether the top card is being dismissed
    pub is_closing: bool,
    /// Screen gaining focus
    pub incoming: LayerStyle,
    /// Screen beneath the top card
    pub background: LayerStyle,
    /// Edge shadow
    pub shadow: LayerStyle,
    /// Dimming overlay
    pub overlay: LayerStyle,
}

impl ParallaxFrame {
    fn from_transition(frame: TransitionFrame, is_closing: bool) -> Self {
        // the top card is the outgoing screen when closing
        let (top, under) = if is_closing {
            (frame.outgoing, frame.incoming)
        } else {
            (frame.incoming, frame.outgoing)
        };

        Self {
            progress: frame.progress,
            is_closing,
            incoming: frame.incoming,
            background: LayerStyle { overlay_opacity: 0.0, ..under },
            shadow: LayerStyle {
                translate_x: top.translate_x,
                shadow_opacity: top.shadow_opacity,
                ..LayerStyle::default()
            },
            overlay: LayerStyle {
                overlay_opacity: under.overlay_opacity,
                ..LayerStyle::default()
            },
        }
    }

    /// Style of one layer in this frame
    pub fn style(&self, kind: LayerKind) -> LayerStyle {
        match kind {
            LayerKind::Incoming => self.incoming,
            LayerKind::Background => self.background,
            LayerKind::Shadow => self.shadow,
            LayerKind::Overlay => self.overlay,
        }
    }
}

/// Provider of per-layer styles for one transition
#[derive(Debug, Clone)]
pub struct ParallaxDriver {
    progress: ProgressReader,
    screen_width: f64,
    interpolator: Arc<Interpolator>,
}

impl ParallaxDriver {
    /// Bind a progress signal and geometry
    pub fn new(progress: ProgressReader, screen_width: f64, interpolator: Interpolator) -> Self {
        Self { progress, screen_width, interpolator: Arc::new(interpolator) }
    }

    /// Progress signal this driver reads
    pub fn signal(&self) -> &ProgressReader {
        &self.progress
    }

    /// Screen width in points
    pub fn screen_width(&self) -> f64 {
        self.screen_width
    }

    /// Snapshot of every layer from a single read of the signal
    pub fn frame(&self, is_closing: bool) -> ParallaxFrame {
        self.frame_at(self.progress.read(), is_closing)
    }

    /// Snapshot at an explicit progress value
    pub fn frame_at(&self, progress: f64, is_closing: bool) -> ParallaxFrame {
        let direction = if is_closing { Direction::Backward } else { Direction::Forward };
        let frame = self.interpolator.frame_for(direction, self.screen_width, progress);
        ParallaxFrame::from_transition(frame, is_closing)
    }

    /// Slide of the screen gaining focus
    pub fn incoming_style(&self, is_closing: bool) -> LayerStyle {
        self.frame(is_closing).incoming
    }

    /// Parallax offset and scale of the covered screen
    pub fn background_style(&self, is_closing: bool) -> LayerStyle {
        self.frame(is_closing).background
    }

    /// Edge shadow of the top card
    pub fn shadow_style(&self, is_closing: bool) -> LayerStyle {
        self.frame(is_closing).shadow
    }

    /// Dimming overlay over the covered screen
    pub fn overlay_style(&self, is_closing: bool) -> LayerStyle {
        self.frame(is_closing).overlay
    }

    /// Subscribe a layer to this driver
    pub fn bind(&self, kind: LayerKind, is_closing: bool) -> LayerBinding {
        LayerBinding { driver: self.clone(), kind, is_closing }
    }
}

/// A layer's subscription to a parallax driver
#[derive(Debug, Clone)]
pub struct LayerBinding {
    driver: ParallaxDriver,
    kind: LayerKind,
    is_closing: bool,
}

impl LayerBinding {
    /// Layer this binding styles
    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    /// Current style of the layer
    pub fn style(&self) -> LayerStyle {
        self.driver.frame(self.is_closing).style(self.kind)
    }

    /// Style of the layer within an already-read frame
    pub fn style_in(&self, frame: &ParallaxFrame) -> LayerStyle {
        frame.style(self.kind)
    }

    /// Whether two bindings are driven by the same signal
    pub fn shares_signal(&self, other: &LayerBinding) -> bool {
        self.driver.progress.same_signal(&other.driver.progress)
    }
}
