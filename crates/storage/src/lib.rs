//! Storage layer for the storefront
//!
//! This crate provides the in-memory payload cache that backs prefetched
//! query data.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;

pub use cache::{CacheConfig, CacheError, CachedPayload, MemoryCache};
