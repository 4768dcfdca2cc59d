//! Storefront transition engine
//!
//! Wires the crates of the workspace into one process-wide setup:
//!
//! - [`storage`] - in-memory payload cache
//! - [`app_state`] - transition lock, task queue, hydration gates, prefetch
//! - [`app_ui`] - progress signal, interpolation, parallax, navigation
//!
//! [`Storefront`] creates the single [`app_state::TransitionCoordinator`]
//! at startup and hands it to everything that needs it.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod app;
pub mod config;

pub use app::Storefront;
pub use config::{CacheSettings, ConfigError, StorefrontConfig};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global tracing subscriber. `RUST_LOG` wins over
/// `default_filter`. Returns false if a subscriber was already installed.
pub fn init_tracing(default_filter: &str) -> bool {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(env_filter)
        .try_init()
        .is_ok()
}
