//! Error types for the Reservoir pool.
//!
//! `PoolError` is the error every pool operation returns. Errors raised by a factory
//! are carried unmodified inside [`PoolError::Factory`] and exposed through
//! `std::error::Error::source`.

use std::fmt;

use thiserror::Error;

/// Error type produced by factory implementations.
pub type FactoryError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for pool operations.
pub type Result<T> = std::result::Result<T, PoolError>;

/// Errors returned by pool operations.
#[derive(Debug, Error)]
pub enum PoolError {
    /// No factory is registered for the URI scheme
    #[error("no factory registered for scheme `{0}`")]
    UnknownScheme(String),

    /// The URI cannot be parsed far enough to extract a scheme
    #[error("malformed URI `{uri}`: {reason}")]
    MalformedUri {
        /// The offending URI text
        uri: String,

        /// Why parsing failed
        reason: String,
    },

    /// A factory failed to create, recycle or dispose a resource
    #[error("factory error: {0}")]
    Factory(#[source] FactoryError),

    /// The pool configuration is invalid
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl PoolError {
    /// Wrap an arbitrary error raised by a factory.
    pub fn factory<E>(error: E) -> Self
    where
        E: Into<FactoryError>,
    {
        Self::Factory(error.into())
    }
}

/// Errors related to loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration source could not be read
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    /// The configuration source could not be parsed
    #[error("failed to parse configuration: {0}")]
    ParseFailed(String),

    /// The configuration parsed but holds an invalid value
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Error returned when releasing a resource.
///
/// A resource that never reached its factory is handed back inside the error, so it is
/// neither lost nor dropped behind the factory's back: [`DisposeError::MissingOrigin`]
/// when it cannot report where it came from, [`DisposeError::Unresolved`] when the
/// release URI names no registered scheme or has none. Either way it has been neither
/// disposed nor pooled and can be released again under another URI.
#[derive(Error)]
pub enum DisposeError<R> {
    /// The resource does not report an origin URI
    #[error("resource does not report an origin URI")]
    MissingOrigin(R),

    /// The release URI could not be resolved to a factory
    #[error("cannot release resource: {error}")]
    Unresolved {
        /// Why resolution failed, `UnknownScheme` or `MalformedUri`
        #[source]
        error: PoolError,

        /// The resource, untouched
        resource: R,
    },

    /// The factory failed while disposing the resource
    #[error(transparent)]
    Pool(#[from] PoolError),
}

impl<R> DisposeError<R> {
    /// Recover the resource when it never reached a factory.
    pub fn into_resource(self) -> Option<R> {
        match self {
            Self::MissingOrigin(resource) | Self::Unresolved { resource, .. } => Some(resource),
            Self::Pool(_) => None,
        }
    }

    /// Split into the underlying pool error, if any, and the handed back resource.
    pub fn into_parts(self) -> (Option<PoolError>, Option<R>) {
        match self {
            Self::MissingOrigin(resource) => (None, Some(resource)),
            Self::Unresolved { error, resource } => (Some(error), Some(resource)),
            Self::Pool(error) => (Some(error), None),
        }
    }
}

impl<R> fmt::Debug for DisposeError<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingOrigin(_) => f.write_str("MissingOrigin(..)"),
            Self::Unresolved { error, .. } => f
                .debug_struct("Unresolved")
                .field("error", error)
                .finish_non_exhaustive(),
            Self::Pool(error) => f.debug_tuple("Pool").field(error).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[derive(Debug, Error)]
    #[error("socket closed")]
    struct SocketClosed;

    #[test]
    fn test_factory_error_keeps_source() {
        let err = PoolError::factory(SocketClosed);
        assert_eq!(err.to_string(), "factory error: socket closed");

        let source = err.source().expect("factory error has a source");
        assert!(source.downcast_ref::<SocketClosed>().is_some());
    }

    #[test]
    fn test_missing_origin_hands_resource_back() {
        let err: DisposeError<u32> = DisposeError::MissingOrigin(7);
        assert_eq!(err.to_string(), "resource does not report an origin URI");
        assert_eq!(format!("{:?}", err), "MissingOrigin(..)");
        assert_eq!(err.into_resource(), Some(7));

        let err: DisposeError<u32> = PoolError::UnknownScheme("ftp".into()).into();
        assert!(err.into_resource().is_none());
    }

    #[test]
    fn test_unresolved_hands_resource_back() {
        let err: DisposeError<u32> = DisposeError::Unresolved {
            error: PoolError::UnknownScheme("ftp".into()),
            resource: 7,
        };
        assert_eq!(
            err.to_string(),
            "cannot release resource: no factory registered for scheme `ftp`"
        );
        assert!(err.source().is_some());
        assert!(format!("{:?}", err).starts_with("Unresolved { error: UnknownScheme"));

        let (error, resource) = err.into_parts();
        assert!(matches!(error, Some(PoolError::UnknownScheme(_))));
        assert_eq!(resource, Some(7));
    }
}
