#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

//! # Reservoir Pool
//!
//! A keyed, bounded pool of reusable resources.
//!
//! Callers ask for a resource by URI. The pool resolves the factory registered for the
//! URI's scheme, derives the idle-queue key, and either recycles the most recently
//! released valid resource under that key or creates a new one. Returned resources are
//! queued while their key holds fewer than `max_size` idle entries and disposed
//! otherwise.
//!
//! - **registry**: Scheme to factory dispatch
//! - **store**: Mutex-guarded idle queues with atomic capacity checks
//! - **engine**: The [`Pool`] itself
//! - **scope**: Scoped acquisition with guaranteed release
//! - **stats**: Activity counters

/// Scheme to factory dispatch
pub mod registry;

/// Keyed idle storage
pub mod store;

/// Acquire and release logic
pub mod engine;

/// Scoped acquisition
pub mod scope;

/// Pool statistics
pub mod stats;

pub use engine::{Pool, PoolBuilder};
pub use registry::FactoryRegistry;
pub use scope::{Bindings, Scope, ScopeError};
pub use stats::PoolStats;
pub use store::PoolStore;

pub use reservoir_core::{
    DisposeError, Factory, FactoryError, Origin, PoolConfig, PoolError, PoolKey, Result, Uri,
};
