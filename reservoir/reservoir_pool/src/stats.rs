//! Pool statistics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of pool activity counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Resources constructed through `Factory::create`
    pub created: u64,

    /// Idle resources handed out again through `Factory::recycle`
    pub recycled: u64,

    /// Resources released through `Factory::dispose`
    pub disposed: u64,

    /// Resources returned to an idle queue
    pub pooled: u64,

    /// Resources found invalid, on return or while idle
    pub invalid: u64,

    /// Valid resources disposed because their queue was full
    pub overflow: u64,
}

#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    created: AtomicU64,
    recycled: AtomicU64,
    disposed: AtomicU64,
    pooled: AtomicU64,
    invalid: AtomicU64,
    overflow: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn record_created(&self) {
        self.created.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_recycled(&self) {
        self.recycled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_disposed(&self) {
        self.disposed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_pooled(&self) {
        self.pooled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_invalid(&self) {
        self.invalid.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_overflow(&self) {
        self.overflow.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> PoolStats {
        PoolStats {
            created: self.created.load(Ordering::Relaxed),
            recycled: self.recycled.load(Ordering::Relaxed),
            disposed: self.disposed.load(Ordering::Relaxed),
            pooled: self.pooled.load(Ordering::Relaxed),
            invalid: self.invalid.load(Ordering::Relaxed),
            overflow: self.overflow.load(Ordering::Relaxed),
        }
    }
}
