//! Keyed storage for idle resources.
//!
//! Every key maps to a LIFO stack of idle entries. A single mutex guards the whole map,
//! so a pop and a push on the same key can never interleave: the capacity check and
//! the append in [`PoolStore::try_push`] are one step.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use log::trace;
use parking_lot::Mutex;

/// Concurrency-safe map from key to a bounded stack of idle entries.
pub struct PoolStore<K, T> {
    /// Idle entries per key, most recently pushed last
    queues: Mutex<HashMap<K, Vec<T>>>,
}

impl<K, T> PoolStore<K, T>
where
    K: Eq + Hash + Clone + fmt::Debug,
{
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            queues: Mutex::new(HashMap::new()),
        }
    }

    /// Remove and return the most recently pushed entry under `key`.
    pub fn try_pop(&self, key: &K) -> Option<T> {
        let mut queues = self.queues.lock();
        let queue = queues.get_mut(key)?;
        let entry = queue.pop();

        if queue.is_empty() {
            queues.remove(key);
        }

        entry
    }

    /// Push `entry` under `key` if the key holds fewer than `max_size` entries.
    ///
    /// When the key is full nothing changes and the entry is handed back.
    pub fn try_push(&self, key: &K, entry: T, max_size: usize) -> Result<(), T> {
        let mut queues = self.queues.lock();

        if let Some(queue) = queues.get_mut(key) {
            if queue.len() >= max_size {
                trace!("Idle queue {:?} is full ({} entries)", key, queue.len());
                return Err(entry);
            }
            queue.push(entry);
            return Ok(());
        }

        if max_size == 0 {
            return Err(entry);
        }

        queues.insert(key.clone(), vec![entry]);
        Ok(())
    }

    /// Number of idle entries under `key`.
    pub fn size(&self, key: &K) -> usize {
        self.queues.lock().get(key).map_or(0, Vec::len)
    }

    /// Number of keys currently holding idle entries.
    pub fn total_keys(&self) -> usize {
        self.queues.lock().len()
    }

    /// Number of idle entries across all keys.
    pub fn total_idle(&self) -> usize {
        self.queues.lock().values().map(Vec::len).sum()
    }

    /// Remove every idle entry, most recently pushed first within each key.
    pub fn drain(&self) -> Vec<(K, T)> {
        let queues = std::mem::take(&mut *self.queues.lock());

        queues
            .into_iter()
            .flat_map(|(key, queue)| {
                queue
                    .into_iter()
                    .rev()
                    .map(move |entry| (key.clone(), entry))
            })
            .collect()
    }
}

impl<K, T> Default for PoolStore<K, T>
where
    K: Eq + Hash + Clone + fmt::Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, T> fmt::Debug for PoolStore<K, T>
where
    K: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let queues = self.queues.lock();
        let mut map = f.debug_map();
        for (key, queue) in queues.iter() {
            map.entry(key, &queue.len());
        }
        map.finish()
    }
}
