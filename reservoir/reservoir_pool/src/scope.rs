//! Scoped acquisition.
//!
//! A [`Scope`] owns resources acquired from a pool and releases every one of them,
//! in acquisition order, when it is finished or dropped. [`Pool::with_resources`]
//! wraps the common acquire / run / release sequence.

use std::collections::HashSet;
use std::fmt;
use std::ops::{Index, IndexMut};

use log::{debug, trace, warn};
use thiserror::Error;

use reservoir_core::{DisposeError, Origin, PoolError};

use crate::engine::Pool;

/// Error returned by [`Pool::with_resources`]
#[derive(Debug, Error)]
pub enum ScopeError<E> {
    /// Acquiring one of the bindings failed; earlier bindings were released
    #[error("failed to acquire scoped resource: {error}")]
    Acquire {
        /// The acquisition error
        #[source]
        error: PoolError,

        /// Errors raised while releasing the bindings acquired before the failure
        cleanup: Vec<PoolError>,
    },

    /// The body failed; every binding was released
    #[error("scoped body failed: {error}")]
    Body {
        /// The error returned by the body
        error: E,

        /// Errors raised while releasing the bindings
        cleanup: Vec<PoolError>,
    },

    /// The body succeeded but releasing the bindings failed
    #[error("failed to release {} scoped resource(s)", .0.len())]
    Cleanup(Vec<PoolError>),

    /// The same name appears twice in the binding list; nothing was acquired
    #[error("scoped resource name `{0}` is bound more than once")]
    DuplicateBinding(String),
}

impl<E> ScopeError<E> {
    /// Errors raised while releasing the bindings.
    pub fn cleanup_errors(&self) -> &[PoolError] {
        match self {
            Self::Acquire { cleanup, .. } | Self::Body { cleanup, .. } => cleanup,
            Self::Cleanup(cleanup) => cleanup,
            Self::DuplicateBinding(_) => &[],
        }
    }

    /// The body's own error, if the body failed.
    pub fn into_body_error(self) -> Option<E> {
        match self {
            Self::Body { error, .. } => Some(error),
            _ => None,
        }
    }
}

struct Binding<R> {
    name: String,
    uri: String,
    resource: R,
}

/// Named resources held by a scope, in acquisition order.
pub struct Bindings<R> {
    entries: Vec<Binding<R>>,
}

impl<R> Bindings<R> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// The resource bound to `name`.
    ///
    /// [`Scope::acquire`] accepts a name twice; lookups then see the earliest binding.
    pub fn get(&self, name: &str) -> Option<&R> {
        self.entries
            .iter()
            .find(|b| b.name == name)
            .map(|b| &b.resource)
    }

    /// Mutable access to the resource bound to `name`, earliest binding first.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut R> {
        self.entries
            .iter_mut()
            .find(|b| b.name == name)
            .map(|b| &mut b.resource)
    }

    /// Binding names in acquisition order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|b| b.name.as_str())
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<R> Index<&str> for Bindings<R> {
    type Output = R;

    fn index(&self, name: &str) -> &R {
        match self.get(name) {
            Some(resource) => resource,
            None => panic!("no scoped resource bound to `{}`", name),
        }
    }
}

impl<R> IndexMut<&str> for Bindings<R> {
    fn index_mut(&mut self, name: &str) -> &mut R {
        match self.get_mut(name) {
            Some(resource) => resource,
            None => panic!("no scoped resource bound to `{}`", name),
        }
    }
}

impl<R> fmt::Debug for Bindings<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|b| (&b.name, &b.uri)))
            .finish()
    }
}

/// Guard releasing every acquired resource back to its pool.
///
/// Resources are released through their reported [`Origin`]; a resource that reports
/// none, or whose origin names no registered scheme, is released under the URI it was
/// acquired with. Dropping an unfinished scope, including during a panic, releases
/// everything and logs release failures.
pub struct Scope<'p, R: Origin + 'static> {
    pool: &'p Pool<R>,
    bindings: Bindings<R>,
}

impl<'p, R: Origin + 'static> Scope<'p, R> {
    fn new(pool: &'p Pool<R>) -> Self {
        Self {
            pool,
            bindings: Bindings::new(),
        }
    }

    /// Acquire a resource for `uri` and bind it to `name`.
    pub fn acquire(&mut self, name: impl Into<String>, uri: &str) -> Result<&mut R, PoolError> {
        let resource = self.pool.create(uri)?;
        self.bindings.entries.push(Binding {
            name: name.into(),
            uri: uri.to_string(),
            resource,
        });

        let last = self.bindings.entries.len() - 1;
        Ok(&mut self.bindings.entries[last].resource)
    }

    /// The resources bound so far.
    pub fn bindings(&self) -> &Bindings<R> {
        &self.bindings
    }

    /// Mutable access to the resources bound so far.
    pub fn bindings_mut(&mut self) -> &mut Bindings<R> {
        &mut self.bindings
    }

    /// Release every binding, returning the errors raised along the way.
    pub fn finish(mut self) -> Vec<PoolError> {
        self.release_all()
    }

    fn release_all(&mut self) -> Vec<PoolError> {
        let entries = std::mem::take(&mut self.bindings.entries);
        let mut errors = Vec::new();

        for Binding {
            name,
            uri: acquired,
            resource,
        } in entries
        {
            let outcome = match resource.origin_uri().map(str::to_string) {
                Some(origin) if origin != acquired => {
                    trace!("Releasing scoped resource `{}` to {}", name, origin);
                    match self.pool.dispose(&origin, resource) {
                        Err(DisposeError::Unresolved { error, resource }) => {
                            debug!(
                                "Origin of `{}` does not resolve ({}), releasing to {}",
                                name, error, acquired
                            );
                            self.pool.dispose(&acquired, resource)
                        }
                        outcome => outcome,
                    }
                }
                _ => {
                    trace!("Releasing scoped resource `{}` to {}", name, acquired);
                    self.pool.dispose(&acquired, resource)
                }
            };

            if let Err(e) = outcome {
                let (error, resource) = e.into_parts();
                if resource.is_some() {
                    // Only reachable when the scheme was unregistered after acquisition
                    warn!("Dropping scoped resource `{}`: no factory to release it", name);
                }
                errors.extend(error);
            }
        }

        errors
    }
}

impl<R: Origin + 'static> Drop for Scope<'_, R> {
    fn drop(&mut self) {
        if self.bindings.is_empty() {
            return;
        }

        for e in self.release_all() {
            warn!("Failed to release scoped resource: {}", e);
        }
    }
}

impl<R: Origin + 'static> Pool<R> {
    /// Open a scope that releases what it acquires.
    pub fn scope(&self) -> Scope<'_, R> {
        Scope::new(self)
    }

    /// Acquire `bindings` in order, run `body`, then release every binding.
    ///
    /// Bindings are `(name, uri)` pairs with distinct names; a repeated name fails with
    /// [`ScopeError::DuplicateBinding`] before anything is acquired. Release happens in
    /// acquisition order whether the body succeeds, fails, or panics. Release errors
    /// never replace the body's error; they are reported next to it.
    ///
    /// # Example
    ///
    /// ```
    /// use std::sync::Arc;
    ///
    /// use reservoir_core::{Factory, FactoryError, Uri};
    /// use reservoir_pool::Pool;
    /// use serde_json::{json, Value};
    ///
    /// struct Records;
    ///
    /// impl Factory<Value> for Records {
    ///     fn create(&self, uri: &Uri) -> Result<Value, FactoryError> {
    ///         Ok(json!({ "uri": uri.as_str(), "rows": 0 }))
    ///     }
    ///     fn dispose(&self, _record: Value) -> Result<(), FactoryError> {
    ///         Ok(())
    ///     }
    ///     fn recycle(&self, mut record: Value, uri: &Uri) -> Result<Value, FactoryError> {
    ///         record["uri"] = json!(uri.as_str());
    ///         Ok(record)
    ///     }
    ///     fn valid(&self, _record: &Value) -> bool {
    ///         true
    ///     }
    /// }
    ///
    /// let pool = Pool::<Value>::builder()
    ///     .shared_factory("rec", Arc::new(Records))
    ///     .build()
    ///     .unwrap();
    ///
    /// let rows = pool
    ///     .with_resources(&[("db", "rec://localhost")], |bound| {
    ///         bound["db"]["rows"] = json!(3);
    ///         Ok::<_, std::io::Error>(bound["db"]["rows"].as_u64())
    ///     })
    ///     .unwrap();
    ///
    /// assert_eq!(rows, Some(3));
    /// assert_eq!(pool.idle_count("rec://localhost").unwrap(), 1);
    /// ```
    pub fn with_resources<T, E, F>(
        &self,
        bindings: &[(&str, &str)],
        body: F,
    ) -> Result<T, ScopeError<E>>
    where
        F: FnOnce(&mut Bindings<R>) -> Result<T, E>,
    {
        let mut seen = HashSet::new();
        if let Some((name, _)) = bindings.iter().find(|(name, _)| !seen.insert(*name)) {
            return Err(ScopeError::DuplicateBinding(name.to_string()));
        }

        let mut scope = self.scope();

        for (name, uri) in bindings {
            let acquired = scope.acquire(*name, uri).map(|_| ());
            if let Err(error) = acquired {
                let cleanup = scope.finish();
                return Err(ScopeError::Acquire { error, cleanup });
            }
        }

        let outcome = body(scope.bindings_mut());
        let cleanup = scope.finish();

        match outcome {
            Ok(value) if cleanup.is_empty() => Ok(value),
            Ok(_) => Err(ScopeError::Cleanup(cleanup)),
            Err(error) => Err(ScopeError::Body { error, cleanup }),
        }
    }
}
