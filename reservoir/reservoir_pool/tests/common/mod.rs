//! Shared test factory for the pool integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use reservoir_pool::{Factory, FactoryError, Origin, PoolKey, Uri};

/// A fake connection. Its health flag is shared so tests can break it while it is idle.
#[derive(Debug)]
pub struct TestConn {
    pub id: usize,
    pub uri: String,
    pub healthy: Arc<AtomicBool>,
}

impl TestConn {
    pub fn break_it(&self) {
        self.healthy.store(false, Ordering::SeqCst);
    }
}

impl Origin for TestConn {
    fn origin_uri(&self) -> Option<&str> {
        Some(&self.uri)
    }
}

/// Counts every factory call. Paths ending in `/fail` refuse to be created.
#[derive(Default)]
pub struct TestFactory {
    next_id: AtomicUsize,
    pub created: AtomicUsize,
    pub recycled: AtomicUsize,
    disposed: Mutex<Vec<usize>>,
    group_by_authority: bool,
    pub fail_dispose: AtomicBool,
}

impl TestFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn by_authority() -> Arc<Self> {
        Arc::new(Self {
            group_by_authority: true,
            ..Default::default()
        })
    }

    pub fn disposed_ids(&self) -> Vec<usize> {
        self.disposed.lock().unwrap().clone()
    }

    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn recycled_count(&self) -> usize {
        self.recycled.load(Ordering::SeqCst)
    }
}

impl Factory<TestConn> for TestFactory {
    fn create(&self, uri: &Uri) -> Result<TestConn, FactoryError> {
        if uri.path().ends_with("/fail") {
            return Err(format!("cannot connect to {}", uri).into());
        }

        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(TestConn {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            uri: uri.to_string(),
            healthy: Arc::new(AtomicBool::new(true)),
        })
    }

    fn dispose(&self, resource: TestConn) -> Result<(), FactoryError> {
        if self.fail_dispose.load(Ordering::SeqCst) {
            return Err(format!("cannot close connection {}", resource.id).into());
        }

        self.disposed.lock().unwrap().push(resource.id);
        Ok(())
    }

    fn recycle(&self, mut resource: TestConn, uri: &Uri) -> Result<TestConn, FactoryError> {
        self.recycled.fetch_add(1, Ordering::SeqCst);
        resource.uri = uri.to_string();
        Ok(resource)
    }

    fn valid(&self, resource: &TestConn) -> bool {
        resource.healthy.load(Ordering::SeqCst)
    }

    fn derive_key(&self, uri: &Uri) -> PoolKey {
        if self.group_by_authority {
            PoolKey::new(uri.authority())
        } else {
            PoolKey::from(uri)
        }
    }
}
