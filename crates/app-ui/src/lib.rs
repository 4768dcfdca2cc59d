//! Screen transitions and navigation for the storefront
//!
//! This crate provides the presentation-side half of the transition engine:
//! the progress signal, the gesture-driven interpolator, the parallax
//! driver that keeps every layer of a transition in lockstep, and the
//! controller that runs pushes, pops and swipe-backs against the shared
//! [`app_state::TransitionCoordinator`].
//!
//! # Modules
//!
//! - [`transition`] - Progress signal, interpolation, parallax and lifecycle
//! - [`navigation`] - Routes, tabs and navigation stacks
//! - [`tokens`] - Animation durations and card geometry
//!
//! # Example
//!
//! ```rust
//! use app_ui::transition::{signal, Interpolator, ParallaxDriver};
//!
//! let writer = signal(0.0);
//! let parallax = ParallaxDriver::new(writer.reader(), 390.0, Interpolator::default());
//!
//! writer.set(1.0);
//! assert_eq!(parallax.incoming_style(false).translate_x, 0.0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod navigation;
pub mod tokens;
pub mod transition;

pub use navigation::{NavigationStack, NavigationState, NavigationTab, Route, StackEntry};

pub use tokens::{card, duration};

pub use transition::{
    InterpolatorConfig, LayerKind, LayerStyle, NavigationError, ParallaxDriver, ProgressReader,
    TransitionConfig, TransitionController,
};
