//! Signature-keyed result cache with a size bound and write expiry.

use crate::types::{MockResult, Signature};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tokio::time::Instant;

/// Narrow cache interface used by the service
pub trait MockCache: Send + Sync {
    fn get(&self, key: &Signature) -> Option<MockResult>;

    fn put(&self, key: Signature, value: MockResult);

    fn clear(&self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub max_entries: usize,
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            ttl: Duration::from_secs(15 * 60),
        }
    }
}

/// Least-recently-used eviction beyond `max_entries`; entries expire `ttl`
/// after they were written.
pub struct LruTtlCache {
    cfg: CacheConfig,
    inner: Mutex<Inner>,
}

struct Entry {
    value: MockResult,
    written: Instant,
    tick: u64,
}

#[derive(Default)]
struct Inner {
    map: HashMap<Signature, Entry>,
    recency: BTreeMap<u64, Signature>,
    next_tick: u64,
}

impl Inner {
    fn touch(&mut self) -> u64 {
        self.next_tick += 1;
        self.next_tick
    }

    fn remove(&mut self, key: &Signature) {
        if let Some(entry) = self.map.remove(key) {
            self.recency.remove(&entry.tick);
        }
    }
}

impl LruTtlCache {
    pub fn new(cfg: CacheConfig) -> Self {
        Self {
            cfg,
            inner: Mutex::new(Inner::default()),
        }
    }
}

impl Default for LruTtlCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl MockCache for LruTtlCache {
    fn get(&self, key: &Signature) -> Option<MockResult> {
        let mut inner = self.inner.lock();
        let expired = match inner.map.get(key) {
            Some(entry) => entry.written.elapsed() >= self.cfg.ttl,
            None => return None,
        };
        if expired {
            inner.remove(key);
            return None;
        }

        let tick = inner.touch();
        let entry = inner.map.get_mut(key)?;
        let previous = std::mem::replace(&mut entry.tick, tick);
        let value = entry.value.clone();
        inner.recency.remove(&previous);
        inner.recency.insert(tick, key.clone());
        Some(value)
    }

    fn put(&self, key: Signature, value: MockResult) {
        if self.cfg.max_entries == 0 {
            return;
        }
        let mut inner = self.inner.lock();
        inner.remove(&key);
        let tick = inner.touch();
        inner.recency.insert(tick, key.clone());
        inner.map.insert(
            key,
            Entry {
                value,
                written: Instant::now(),
                tick,
            },
        );

        while inner.map.len() > self.cfg.max_entries {
            let oldest = match inner.recency.pop_first() {
                Some((_, oldest)) => oldest,
                None => break,
            };
            inner.map.remove(&oldest);
        }
    }

    fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.map.clear();
        inner.recency.clear();
    }

    fn len(&self) -> usize {
        self.inner.lock().map.len()
    }
}
