//! Capability traits implemented by consumers of the pool.
//!
//! - [`Factory`]: creates, validates, recycles and disposes resources of one scheme
//! - [`Origin`]: lets a resource report the URI it was created or recycled for

pub mod factory;
pub mod origin;

pub use factory::Factory;
pub use origin::Origin;
