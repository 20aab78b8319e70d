//! Resource factory trait.
//!
//! A factory is bound to one URI scheme and is the only component that ever
//! touches the inside of a resource.

use crate::error::FactoryError;
use crate::uri::{PoolKey, Uri};

/// Creates, validates, recycles and disposes resources of one scheme.
///
/// # Example
///
/// ```
/// use reservoir_core::{Factory, FactoryError, PoolKey, Uri};
///
/// struct Buffers;
///
/// impl Factory<Vec<u8>> for Buffers {
///     fn create(&self, _uri: &Uri) -> Result<Vec<u8>, FactoryError> {
///         Ok(Vec::with_capacity(4096))
///     }
///
///     fn dispose(&self, _buffer: Vec<u8>) -> Result<(), FactoryError> {
///         Ok(())
///     }
///
///     fn recycle(&self, mut buffer: Vec<u8>, _uri: &Uri) -> Result<Vec<u8>, FactoryError> {
///         buffer.clear();
///         Ok(buffer)
///     }
///
///     fn valid(&self, buffer: &Vec<u8>) -> bool {
///         buffer.capacity() >= 4096
///     }
///
///     fn derive_key(&self, uri: &Uri) -> PoolKey {
///         PoolKey::new(uri.scheme())
///     }
/// }
/// ```
pub trait Factory<R>: Send + Sync {
    /// Construct a brand-new resource for `uri`.
    fn create(&self, uri: &Uri) -> Result<R, FactoryError>;

    /// Release a resource permanently. The resource is consumed.
    fn dispose(&self, resource: R) -> Result<(), FactoryError>;

    /// Re-target an idle resource at `uri` before it is handed out again.
    fn recycle(&self, resource: R, uri: &Uri) -> Result<R, FactoryError>;

    /// Whether the resource can still be used.
    fn valid(&self, resource: &R) -> bool;

    /// Derive the idle-queue key for `uri`.
    ///
    /// Defaults to the raw URI text. Override to let semantically equivalent URIs
    /// (for instance, everything on one host) share a queue.
    fn derive_key(&self, uri: &Uri) -> PoolKey {
        PoolKey::from(uri)
    }
}
