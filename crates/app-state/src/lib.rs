//! Application state for the storefront
//!
//! This crate holds the logic-thread side of screen transitions: the
//! transition lock, the deferred task queue, interaction tracking, per-screen
//! hydration gates and lock-aware prefetching, all owned by one
//! [`TransitionCoordinator`] created at app start. It also provides the query
//! cache facade that prefetched payloads are written to.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod coordinator;
pub mod hydration;
pub mod interactions;
pub mod prefetch;
pub mod query;
pub mod task_queue;
pub mod transition_lock;

pub use coordinator::{CoordinatorConfig, SettleReport, TransitionCoordinator};
pub use hydration::{HydrationGate, HydrationTrigger};
pub use interactions::{InteractionHandle, ScheduledId};
pub use prefetch::{PrefetchStatus, PrefetchTrigger, Prefetcher};
pub use query::{Query, QueryClient, QueryConfig, QueryError, QueryKey, QueryState};
pub use task_queue::{DrainReport, Enqueued, TaskQueue, TaskQueueError};
pub use transition_lock::{
    Direction, LockState, SettleOutcome, TransitionDescriptor, TransitionError, TransitionGate,
    TransitionId, TransitionLock,
};
