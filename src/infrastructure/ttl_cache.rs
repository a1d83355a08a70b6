// Pull-expiry TTL cache
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct Entry<V> {
    value: V,
    stored_at: Instant,
}

/// Single-key-space store mapping a key to (value, insertion time).
///
/// Staleness is checked only on read; a stale entry behaves as a miss and
/// stays in place until the next insert overwrites it. No eviction task.
/// The lock is scoped to the map operation itself and must never be held
/// across upstream I/O.
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: Mutex<HashMap<K, Entry<V>>>,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entries: Mutex::new(HashMap::new()) }
    }

    /// The stored value, iff it was inserted no longer than the TTL ago.
    pub fn get(&self, key: &K) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    /// Replace the entry wholesale, resetting its age.
    pub fn insert(&self, key: K, value: V) {
        self.insert_at(key, value, Instant::now())
    }

    fn get_at(&self, key: &K, now: Instant) -> Option<V> {
        let entries = self.entries.lock().expect("cache lock poisoned");
        let entry = entries.get(key)?;
        if now.duration_since(entry.stored_at) <= self.ttl {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    fn insert_at(&self, key: K, value: V, now: Instant) {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        entries.insert(key, Entry { value, stored_at: now });
    }
}
