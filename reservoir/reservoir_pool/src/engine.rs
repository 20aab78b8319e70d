//! Pool engine.
//!
//! Ties the factory registry and the idle store together: [`Pool::create`] hands out
//! a recycled idle resource when a valid one exists and builds a new one otherwise,
//! and [`Pool::dispose`] either queues a returned resource or releases it for good.

use std::fmt;
use std::sync::Arc;

use log::{debug, info, trace, warn};

use reservoir_core::{DisposeError, Factory, Origin, PoolConfig, PoolError, PoolKey, Result, Uri};

use crate::registry::FactoryRegistry;
use crate::stats::{PoolStats, StatsCounters};
use crate::store::PoolStore;

/// Store key: factory-derived keys are namespaced by scheme so two factories can never
/// hand each other's resources out.
type IdleKey = (String, PoolKey);

/// An idle resource and the URI it was last released under
struct Idle<R> {
    resource: R,
    uri: Uri,
}

/// A keyed pool of reusable resources.
///
/// The pool is an owned value; share it between threads with `Arc<Pool<R>>`.
pub struct Pool<R> {
    /// Configuration for this pool
    config: PoolConfig,

    /// Scheme to factory dispatch
    registry: FactoryRegistry<R>,

    /// Idle resources
    store: PoolStore<IdleKey, Idle<R>>,

    /// Activity counters
    stats: StatsCounters,
}

impl<R: 'static> Pool<R> {
    /// Create an empty pool with no registered factories.
    pub fn new(config: PoolConfig) -> Result<Self> {
        Self::with_registry(config, FactoryRegistry::new())
    }

    /// Start building a pool.
    pub fn builder() -> PoolBuilder<R> {
        PoolBuilder::new()
    }

    fn with_registry(config: PoolConfig, registry: FactoryRegistry<R>) -> Result<Self> {
        config.validate()?;

        info!(
            "Initializing resource pool with max_size {} and schemes {:?}",
            config.max_size,
            registry.schemes()
        );

        Ok(Self {
            config,
            registry,
            store: PoolStore::new(),
            stats: StatsCounters::default(),
        })
    }

    /// Configuration this pool was built with.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// The factory registry backing this pool.
    pub fn registry(&self) -> &FactoryRegistry<R> {
        &self.registry
    }

    /// Register a factory constructor for `scheme`. See [`FactoryRegistry::register`].
    pub fn register<F, C>(&self, scheme: &str, constructor: C)
    where
        F: Factory<R> + 'static,
        C: Fn(&Uri) -> F + Send + Sync + 'static,
    {
        self.registry.register(scheme, constructor);
    }

    /// Register a shared factory for `scheme`. See [`FactoryRegistry::register_shared`].
    pub fn register_shared<F>(&self, scheme: &str, factory: Arc<F>)
    where
        F: Factory<R> + 'static,
    {
        self.registry.register_shared(scheme, factory);
    }

    fn idle_key(factory: &dyn Factory<R>, uri: &Uri) -> IdleKey {
        (uri.scheme().to_string(), factory.derive_key(uri))
    }

    /// Acquire a resource for `uri`.
    ///
    /// Idle resources under the URI's key are tried most recently released first.
    /// Invalid ones are disposed along the way; the first valid one is recycled for
    /// `uri`. When the queue runs dry a new resource is created.
    pub fn create(&self, uri: &str) -> Result<R> {
        let (uri, factory) = self.registry.resolve_str(uri)?;
        let key = Self::idle_key(factory.as_ref(), &uri);

        // Each iteration removes one entry, so this ends once the queue is exhausted
        while let Some(idle) = self.store.try_pop(&key) {
            if !factory.valid(&idle.resource) {
                debug!("Disposing invalid idle resource from {}", idle.uri);
                self.stats.record_invalid();
                factory.dispose(idle.resource).map_err(PoolError::Factory)?;
                self.stats.record_disposed();
                continue;
            }

            trace!("Recycling idle resource from {} for {}", idle.uri, uri);
            let resource = factory
                .recycle(idle.resource, &uri)
                .map_err(PoolError::Factory)?;
            self.stats.record_recycled();
            return Ok(resource);
        }

        trace!("No idle resource for {:?}, creating one for {}", key.1, uri);
        let resource = factory.create(&uri).map_err(PoolError::Factory)?;
        self.stats.record_created();
        Ok(resource)
    }

    /// Return a resource acquired for `uri`.
    ///
    /// Invalid resources are disposed. Valid ones are queued under the URI's key
    /// unless the queue is full, in which case they are disposed as well.
    ///
    /// When `uri` resolves to no factory the resource is handed back untouched in
    /// [`DisposeError::Unresolved`].
    pub fn dispose(&self, uri: &str, resource: R) -> std::result::Result<(), DisposeError<R>> {
        let (uri, factory) = match self.registry.resolve_str(uri) {
            Ok(resolved) => resolved,
            Err(error) => return Err(DisposeError::Unresolved { error, resource }),
        };

        if !factory.valid(&resource) {
            debug!("Returned resource for {} is invalid, disposing", uri);
            self.stats.record_invalid();
            factory.dispose(resource).map_err(PoolError::Factory)?;
            self.stats.record_disposed();
            return Ok(());
        }

        let key = Self::idle_key(factory.as_ref(), &uri);
        match self
            .store
            .try_push(&key, Idle { resource, uri }, self.config.max_size)
        {
            Ok(()) => {
                trace!("Queued idle resource under {:?}", key.1);
                self.stats.record_pooled();
                Ok(())
            }
            Err(rejected) => {
                debug!(
                    "Idle queue {:?} is at capacity {}, disposing {}",
                    key.1, self.config.max_size, rejected.uri
                );
                self.stats.record_overflow();
                factory
                    .dispose(rejected.resource)
                    .map_err(PoolError::Factory)?;
                self.stats.record_disposed();
                Ok(())
            }
        }
    }

    /// Return a resource under the URI it reports through [`Origin`].
    ///
    /// A resource that reports no origin is handed back in
    /// [`DisposeError::MissingOrigin`] untouched, and one whose origin does not
    /// resolve in [`DisposeError::Unresolved`].
    pub fn dispose_by_origin(&self, resource: R) -> std::result::Result<(), DisposeError<R>>
    where
        R: Origin,
    {
        let uri = match resource.origin_uri() {
            Some(uri) => uri.to_string(),
            None => return Err(DisposeError::MissingOrigin(resource)),
        };

        self.dispose(&uri, resource)
    }

    /// Dispose every idle resource.
    ///
    /// All resources are released even when some disposals fail; the first failure is
    /// returned and later ones are logged. Returns the number of resources disposed.
    pub fn clear(&self) -> Result<usize> {
        let drained = self.store.drain();
        info!("Clearing {} idle resources", drained.len());

        let mut disposed = 0;
        let mut first_error = None;

        for (_, idle) in drained {
            let outcome = self
                .registry
                .resolve(&idle.uri)
                .and_then(|factory| factory.dispose(idle.resource).map_err(PoolError::Factory));

            match outcome {
                Ok(()) => {
                    disposed += 1;
                    self.stats.record_disposed();
                }
                Err(e) if first_error.is_none() => first_error = Some(e),
                Err(e) => warn!("Failed to dispose idle resource from {}: {}", idle.uri, e),
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(disposed),
        }
    }

    /// Number of idle resources queued under the key `uri` maps to.
    pub fn idle_count(&self, uri: &str) -> Result<usize> {
        let (uri, factory) = self.registry.resolve_str(uri)?;
        Ok(self.store.size(&Self::idle_key(factory.as_ref(), &uri)))
    }

    /// Number of keys holding idle resources.
    pub fn key_count(&self) -> usize {
        self.store.total_keys()
    }

    /// Number of idle resources across all keys.
    pub fn idle_total(&self) -> usize {
        self.store.total_idle()
    }

    /// Snapshot of the activity counters.
    pub fn stats(&self) -> PoolStats {
        self.stats.snapshot()
    }
}

impl<R> fmt::Debug for Pool<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("idle", &self.store)
            .finish()
    }
}

/// Builder for [`Pool`]
pub struct PoolBuilder<R> {
    config: PoolConfig,
    registry: FactoryRegistry<R>,
}

impl<R: 'static> PoolBuilder<R> {
    /// Create a builder with the default configuration and no factories.
    pub fn new() -> Self {
        Self {
            config: PoolConfig::default(),
            registry: FactoryRegistry::new(),
        }
    }

    /// Use `config` instead of the default configuration.
    pub fn config(mut self, config: PoolConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the per-key idle capacity.
    pub fn max_size(mut self, max_size: usize) -> Self {
        self.config.max_size = max_size;
        self
    }

    /// Register a factory constructor for `scheme`.
    pub fn factory<F, C>(self, scheme: &str, constructor: C) -> Self
    where
        F: Factory<R> + 'static,
        C: Fn(&Uri) -> F + Send + Sync + 'static,
    {
        self.registry.register(scheme, constructor);
        self
    }

    /// Register a shared factory for `scheme`.
    pub fn shared_factory<F>(self, scheme: &str, factory: Arc<F>) -> Self
    where
        F: Factory<R> + 'static,
    {
        self.registry.register_shared(scheme, factory);
        self
    }

    /// Validate the configuration and build the pool.
    pub fn build(self) -> Result<Pool<R>> {
        Pool::with_registry(self.config, self.registry)
    }
}

impl<R: 'static> Default for PoolBuilder<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reservoir_core::FactoryError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// A numbered buffer; buffers with an odd tag are treated as broken.
    #[derive(Debug, PartialEq)]
    struct Buffer {
        id: usize,
        tag: usize,
        target: String,
    }

    #[derive(Default)]
    struct BufferFactory {
        next_id: AtomicUsize,
        disposed: Mutex<Vec<usize>>,
        fail_dispose: bool,
    }

    impl Factory<Buffer> for BufferFactory {
        fn create(&self, uri: &Uri) -> std::result::Result<Buffer, FactoryError> {
            if uri.path() == "/refuse" {
                return Err("refused".into());
            }
            Ok(Buffer {
                id: self.next_id.fetch_add(1, Ordering::SeqCst),
                tag: 0,
                target: uri.to_string(),
            })
        }

        fn dispose(&self, resource: Buffer) -> std::result::Result<(), FactoryError> {
            if self.fail_dispose {
                return Err("dispose failed".into());
            }
            self.disposed.lock().unwrap().push(resource.id);
            Ok(())
        }

        fn recycle(
            &self,
            mut resource: Buffer,
            uri: &Uri,
        ) -> std::result::Result<Buffer, FactoryError> {
            resource.target = uri.to_string();
            Ok(resource)
        }

        fn valid(&self, resource: &Buffer) -> bool {
            resource.tag % 2 == 0
        }
    }

    fn pool_with(factory: Arc<BufferFactory>, max_size: usize) -> Pool<Buffer> {
        Pool::builder()
            .max_size(max_size)
            .shared_factory("buf", factory)
            .build()
            .unwrap()
    }

    #[test]
    fn test_zero_max_size_is_rejected() {
        let err = Pool::<Buffer>::new(PoolConfig::with_max_size(0)).unwrap_err();
        assert!(matches!(err, PoolError::Config(_)));
    }

    #[test]
    fn test_create_then_recycle() {
        let factory = Arc::new(BufferFactory::default());
        let pool = pool_with(Arc::clone(&factory), 10);

        let first = pool.create("buf://local/a").unwrap();
        assert_eq!(first.id, 0);
        pool.dispose("buf://local/a", first).unwrap();
        assert_eq!(pool.idle_count("buf://local/a").unwrap(), 1);

        let again = pool.create("buf://local/a").unwrap();
        assert_eq!(again.id, 0);
        assert_eq!(pool.idle_count("buf://local/a").unwrap(), 0);

        let stats = pool.stats();
        assert_eq!(stats.created, 1);
        assert_eq!(stats.recycled, 1);
        assert_eq!(stats.pooled, 1);
    }

    #[test]
    fn test_default_key_is_full_uri() {
        let factory = Arc::new(BufferFactory::default());
        let pool = pool_with(Arc::clone(&factory), 10);

        let resource = pool.create("buf://local/a").unwrap();
        pool.dispose("buf://local/a", resource).unwrap();

        // Different path, different queue
        let other = pool.create("buf://local/b").unwrap();
        assert_eq!(other.id, 1);
        assert_eq!(pool.idle_count("buf://local/a").unwrap(), 1);
        assert_eq!(pool.key_count(), 1);
    }

    #[test]
    fn test_invalid_resource_is_never_pooled() {
        let factory = Arc::new(BufferFactory::default());
        let pool = pool_with(Arc::clone(&factory), 10);

        let mut resource = pool.create("buf://local/a").unwrap();
        resource.tag = 1;
        pool.dispose("buf://local/a", resource).unwrap();

        assert_eq!(pool.idle_total(), 0);
        assert_eq!(*factory.disposed.lock().unwrap(), vec![0]);
        assert_eq!(pool.stats().invalid, 1);
    }

    #[test]
    fn test_over_capacity_is_disposed() {
        let factory = Arc::new(BufferFactory::default());
        let pool = pool_with(Arc::clone(&factory), 2);

        let resources: Vec<_> = (0..3)
            .map(|_| pool.create("buf://local/a").unwrap())
            .collect();
        for resource in resources {
            pool.dispose("buf://local/a", resource).unwrap();
        }

        assert_eq!(pool.idle_count("buf://local/a").unwrap(), 2);
        assert_eq!(*factory.disposed.lock().unwrap(), vec![2]);
        assert_eq!(pool.stats().overflow, 1);
    }

    #[test]
    fn test_factory_errors_propagate() {
        let factory = Arc::new(BufferFactory::default());
        let pool = pool_with(factory, 2);

        match pool.create("buf://local/refuse") {
            Err(PoolError::Factory(e)) => assert_eq!(e.to_string(), "refused"),
            other => panic!("expected factory error, got {:?}", other),
        }
        assert_eq!(pool.stats().created, 0);
    }

    #[test]
    fn test_failed_dispose_of_invalid_idle_stops_create() {
        let factory = Arc::new(BufferFactory {
            fail_dispose: true,
            ..Default::default()
        });
        let pool = pool_with(factory, 5);

        let first = pool.create("buf://local/a").unwrap();
        let second = pool.create("buf://local/a").unwrap();
        pool.dispose("buf://local/a", first).unwrap();
        pool.dispose("buf://local/a", second).unwrap();

        // Invalidate both while they sit in the queue
        for entry in pool.store.drain() {
            let (key, mut idle) = entry;
            idle.resource.tag = 1;
            assert!(pool.store.try_push(&key, idle, 5).is_ok());
        }

        assert!(matches!(
            pool.create("buf://local/a"),
            Err(PoolError::Factory(_))
        ));
        // Only the entry whose dispose failed was taken out
        assert_eq!(pool.idle_count("buf://local/a").unwrap(), 1);
    }

    #[test]
    fn test_unknown_and_malformed_uris() {
        let factory = Arc::new(BufferFactory::default());
        let pool = pool_with(Arc::clone(&factory), 5);

        assert!(matches!(
            pool.create("ftp://local/a"),
            Err(PoolError::UnknownScheme(s)) if s == "ftp"
        ));
        assert!(matches!(
            pool.create("local/a"),
            Err(PoolError::MalformedUri { .. })
        ));

        let resource = Buffer {
            id: 99,
            tag: 0,
            target: String::new(),
        };
        match pool.dispose("ftp://local/a", resource) {
            Err(DisposeError::Unresolved {
                error: PoolError::UnknownScheme(scheme),
                resource,
            }) => {
                assert_eq!(scheme, "ftp");
                assert_eq!(resource.id, 99);
            }
            other => panic!("expected the resource back, got {:?}", other),
        }
        assert!(factory.disposed.lock().unwrap().is_empty());
    }

    #[test]
    fn test_clear_disposes_idle_resources() {
        let factory = Arc::new(BufferFactory::default());
        let pool = pool_with(Arc::clone(&factory), 5);

        let a = pool.create("buf://local/a").unwrap();
        let b = pool.create("buf://local/b").unwrap();
        pool.dispose("buf://local/a", a).unwrap();
        pool.dispose("buf://local/b", b).unwrap();

        assert_eq!(pool.clear().unwrap(), 2);
        assert_eq!(pool.idle_total(), 0);

        let mut disposed = factory.disposed.lock().unwrap().clone();
        disposed.sort();
        assert_eq!(disposed, vec![0, 1]);
    }

    #[test]
    fn test_debug_does_not_need_resource_debug() {
        struct Opaque;
        let pool = Pool::<Opaque>::new(PoolConfig::default()).unwrap();
        let rendered = format!("{:?}", pool);
        assert!(rendered.contains("max_size: 10"));
    }
}
