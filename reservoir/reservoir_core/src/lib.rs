#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

//! # Reservoir Core
//!
//! `reservoir_core` provides the shared vocabulary of the Reservoir resource pool:
//! URIs and pool keys, the capability traits a resource factory implements, pool
//! configuration, and the error taxonomy.
//!
//! ## Capability Model
//!
//! Resources are opaque to the pool. Everything the pool knows about a resource comes
//! from the [`Factory`] registered for its URI scheme:
//!
//! ```text
//! create(uri) -> R      dispose(R)      recycle(R, uri) -> R      valid(&R) -> bool
//! ```
//!
//! A factory may additionally override [`Factory::derive_key`] to group equivalent
//! resources under one idle queue, and a resource may implement [`Origin`] so it can be
//! released without an explicit URI.
//!
//! ## Crate Structure
//!
//! - **error**: Error types shared by the pool crates
//! - **uri**: Parsed URIs and pool keys
//! - **traits**: Factory and origin capabilities
//! - **config**: Pool configuration and loaders

pub mod config;
pub mod error;
pub mod traits;
pub mod uri;

pub use config::PoolConfig;
pub use error::{ConfigError, DisposeError, FactoryError, PoolError, Result};
pub use traits::{Factory, Origin};
pub use uri::{PoolKey, Uri};
