//! Card-stack screen transitions
//!
//! - [`progress`] - single-writer progress signal
//! - [`interpolator`] - per-layer styles and the release rule
//! - [`parallax`] - binds one signal to every visual layer
//! - [`driver`] - frame-by-frame timing animations
//! - [`controller`] - push, pop and swipe-back lifecycle

pub mod config;
pub mod controller;
pub mod driver;
pub mod interpolator;
pub mod parallax;
pub mod progress;

pub use config::{InterpolatorConfig, TransitionConfig};
pub use controller::{NavigationError, TransitionController};
pub use driver::{AnimationDriver, DriverStatus, Easing, TimingAnimation};
pub use interpolator::{
    interpolate, progress_for_translation, progress_velocity, Interpolator, LayerStyle,
    ReleaseDecision, SnapTarget, TransitionFrame,
};
pub use parallax::{LayerBinding, LayerKind, ParallaxDriver, ParallaxFrame};
pub use progress::{signal, ProgressReader, ProgressWriter, COMPLETE, START};
