//! Factory registry
//!
//! Maps URI schemes to factory constructors. Dispatch depends on nothing but the
//! scheme of the URI being resolved.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use log::debug;
use parking_lot::RwLock;

use reservoir_core::{Factory, PoolError, Result, Uri};

/// Builds the factory for a URI of the registered scheme.
type Constructor<R> = Arc<dyn Fn(&Uri) -> Arc<dyn Factory<R>> + Send + Sync>;

/// Table of scheme to factory constructor
pub struct FactoryRegistry<R> {
    /// Constructors keyed by lowercase scheme
    constructors: RwLock<HashMap<String, Constructor<R>>>,
}

impl<R: 'static> FactoryRegistry<R> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            constructors: RwLock::new(HashMap::new()),
        }
    }

    /// Register a constructor invoked with the URI on every resolve.
    ///
    /// Replaces any constructor previously registered for `scheme`.
    pub fn register<F, C>(&self, scheme: &str, constructor: C)
    where
        F: Factory<R> + 'static,
        C: Fn(&Uri) -> F + Send + Sync + 'static,
    {
        let constructor: Constructor<R> =
            Arc::new(move |uri: &Uri| Arc::new(constructor(uri)) as Arc<dyn Factory<R>>);
        self.insert(scheme, constructor);
    }

    /// Register one factory instance shared by every resolve of `scheme`.
    pub fn register_shared<F>(&self, scheme: &str, factory: Arc<F>)
    where
        F: Factory<R> + 'static,
    {
        let factory: Arc<dyn Factory<R>> = factory;
        let constructor: Constructor<R> = Arc::new(move |_: &Uri| Arc::clone(&factory));
        self.insert(scheme, constructor);
    }

    fn insert(&self, scheme: &str, constructor: Constructor<R>) {
        let scheme = scheme.to_ascii_lowercase();
        let replaced = self
            .constructors
            .write()
            .insert(scheme.clone(), constructor)
            .is_some();

        if replaced {
            debug!("Replaced factory for scheme `{}`", scheme);
        } else {
            debug!("Registered factory for scheme `{}`", scheme);
        }
    }

    /// Remove the constructor for `scheme`, returning whether one was registered.
    pub fn unregister(&self, scheme: &str) -> bool {
        let removed = self
            .constructors
            .write()
            .remove(&scheme.to_ascii_lowercase())
            .is_some();

        if removed {
            debug!("Unregistered factory for scheme `{}`", scheme);
        }
        removed
    }

    /// Whether a constructor is registered for `scheme`.
    pub fn contains(&self, scheme: &str) -> bool {
        self.constructors
            .read()
            .contains_key(&scheme.to_ascii_lowercase())
    }

    /// Registered schemes, sorted.
    pub fn schemes(&self) -> Vec<String> {
        let mut schemes: Vec<String> = self.constructors.read().keys().cloned().collect();
        schemes.sort();
        schemes
    }

    /// Resolve the factory for an already parsed URI.
    pub fn resolve(&self, uri: &Uri) -> Result<Arc<dyn Factory<R>>> {
        // The constructor runs outside the lock so it may itself touch the registry
        let constructor = self
            .constructors
            .read()
            .get(uri.scheme())
            .cloned()
            .ok_or_else(|| PoolError::UnknownScheme(uri.scheme().to_string()))?;

        Ok(constructor(uri))
    }

    /// Parse `text` and resolve its factory.
    pub fn resolve_str(&self, text: &str) -> Result<(Uri, Arc<dyn Factory<R>>)> {
        let uri = Uri::parse(text)?;
        let factory = self.resolve(&uri)?;
        Ok((uri, factory))
    }
}

impl<R: 'static> Default for FactoryRegistry<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> fmt::Debug for FactoryRegistry<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let constructors = self.constructors.read();
        let mut schemes: Vec<&String> = constructors.keys().collect();
        schemes.sort();
        f.debug_struct("FactoryRegistry")
            .field("schemes", &schemes)
            .finish()
    }
}
