//! Memory Store Module
//!
//! In-process store with memcached semantics, used by the server binary and
//! in tests. Clones share the same items.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tracing::debug;

use crate::cache::{Clock, SystemClock};
use crate::error::{CacheError, Result};
use crate::store::{
    LruIndex, StoreClient, StoreConnector, StoredItem, MAX_KEY_LENGTH, MAX_VALUE_SIZE,
};

// == Store Stats ==
/// Counters in the spirit of memcached's `stats` command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub get_hits: u64,
    pub get_misses: u64,
    pub evictions: u64,
    pub curr_items: usize,
}

#[derive(Debug)]
struct MemoryState {
    items: HashMap<String, StoredItem>,
    lru: LruIndex,
    stats: StoreStats,
    max_items: usize,
}

impl MemoryState {
    /// Returns the live item under `key`, dropping it first if it has expired.
    fn live(&mut self, key: &str, now: i64) -> Option<&mut StoredItem> {
        if self.items.get(key).is_some_and(|item| item.is_expired(now)) {
            self.remove(key);
        }
        self.items.get_mut(key)
    }

    fn remove(&mut self, key: &str) -> bool {
        self.lru.remove(key);
        self.items.remove(key).is_some()
    }

    fn insert(&mut self, key: &str, item: StoredItem) -> Result<()> {
        if !self.items.contains_key(key) && self.items.len() >= self.max_items {
            match self.lru.pop_oldest() {
                Some(victim) => {
                    self.items.remove(&victim);
                    self.stats.evictions += 1;
                    debug!("Evicted {} to make room", victim);
                }
                None => {
                    return Err(CacheError::Store(
                        "out of memory storing object".to_string(),
                    ))
                }
            }
        }

        self.items.insert(key.to_string(), item);
        self.lru.touch(key);
        Ok(())
    }

    fn read(&mut self, key: &str, now: i64) -> Option<Vec<u8>> {
        let value = self.live(key, now).map(|item| item.value.clone());
        match value {
            Some(_) => {
                self.stats.get_hits += 1;
                self.lru.touch(key);
            }
            None => self.stats.get_misses += 1,
        }
        value
    }

    fn apply_delta(&mut self, key: &str, now: i64, op: impl Fn(u64) -> u64) -> Result<Option<u64>> {
        let Some(item) = self.live(key, now) else {
            return Ok(None);
        };

        let current = std::str::from_utf8(&item.value)
            .ok()
            .and_then(|text| text.trim().parse::<u64>().ok())
            .ok_or_else(|| {
                CacheError::Rejected("cannot increment or decrement non-numeric value".to_string())
            })?;

        let next = op(current);
        item.value = next.to_string().into_bytes();
        self.lru.touch(key);
        Ok(Some(next))
    }
}

// == Memory Store ==
/// Shared in-process store. Cloning hands out another client to the same data.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    // == Constructor ==
    /// Creates a store holding at most `max_items` items, on the system clock.
    pub fn new(max_items: usize) -> Self {
        Self::with_clock(max_items, Arc::new(SystemClock))
    }

    pub fn with_clock(max_items: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState {
                items: HashMap::new(),
                lru: LruIndex::new(),
                stats: StoreStats::default(),
                max_items: max_items.max(1),
            })),
            clock,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| CacheError::Store("memory store lock poisoned".to_string()))
    }

    /// Returns current counters.
    pub fn stats(&self) -> Result<StoreStats> {
        let state = self.lock()?;
        Ok(StoreStats {
            curr_items: state.items.len(),
            ..state.stats
        })
    }

    /// Number of items held, expired or not.
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.items.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    // == Purge Expired ==
    /// Removes every expired item. Returns how many were removed.
    pub fn purge_expired(&self) -> Result<usize> {
        let now = self.clock.now();
        let mut state = self.lock()?;

        let expired: Vec<String> = state
            .items
            .iter()
            .filter(|(_, item)| item.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            state.remove(key);
        }
        Ok(expired.len())
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() || key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidRequest(format!(
            "Key must be between 1 and {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    if key.bytes().any(|b| b.is_ascii_whitespace() || b.is_ascii_control()) {
        return Err(CacheError::InvalidRequest(
            "Key must not contain whitespace or control characters".to_string(),
        ));
    }
    Ok(())
}

fn validate_value(value: &[u8]) -> Result<()> {
    if value.len() > MAX_VALUE_SIZE {
        return Err(CacheError::InvalidRequest(format!(
            "Value exceeds maximum size of {} bytes",
            MAX_VALUE_SIZE
        )));
    }
    Ok(())
}

impl StoreClient for MemoryStore {
    fn get(&mut self, key: &str) -> Result<Option<Vec<u8>>> {
        validate_key(key)?;
        let now = self.clock.now();
        Ok(self.lock()?.read(key, now))
    }

    fn set(&mut self, key: &str, value: Vec<u8>, exptime: u64) -> Result<()> {
        validate_key(key)?;
        validate_value(&value)?;
        let now = self.clock.now();
        self.lock()?.insert(key, StoredItem::new(value, exptime, now))
    }

    fn add(&mut self, key: &str, value: Vec<u8>, exptime: u64) -> Result<bool> {
        validate_key(key)?;
        validate_value(&value)?;
        let now = self.clock.now();
        let mut state = self.lock()?;

        if state.live(key, now).is_some() {
            return Ok(false);
        }
        state.insert(key, StoredItem::new(value, exptime, now))?;
        Ok(true)
    }

    fn delete(&mut self, key: &str) -> Result<bool> {
        validate_key(key)?;
        let now = self.clock.now();
        let mut state = self.lock()?;

        let existed = state.live(key, now).is_some();
        state.remove(key);
        Ok(existed)
    }

    fn incr(&mut self, key: &str, delta: u64) -> Result<Option<u64>> {
        validate_key(key)?;
        let now = self.clock.now();
        self.lock()?
            .apply_delta(key, now, |current| current.wrapping_add(delta))
    }

    fn decr(&mut self, key: &str, delta: u64) -> Result<Option<u64>> {
        validate_key(key)?;
        let now = self.clock.now();
        self.lock()?
            .apply_delta(key, now, |current| current.saturating_sub(delta))
    }

    fn get_multi(&mut self, keys: &[String]) -> Result<HashMap<String, Vec<u8>>> {
        for key in keys {
            validate_key(key)?;
        }
        let now = self.clock.now();
        let mut state = self.lock()?;

        Ok(keys
            .iter()
            .filter_map(|key| state.read(key, now).map(|value| (key.clone(), value)))
            .collect())
    }

    fn set_multi(&mut self, items: Vec<(String, Vec<u8>)>, exptime: u64) -> Result<()> {
        for (key, value) in &items {
            validate_key(key)?;
            validate_value(value)?;
        }
        let now = self.clock.now();
        let mut state = self.lock()?;

        for (key, value) in items {
            state.insert(&key, StoredItem::new(value, exptime, now))?;
        }
        Ok(())
    }

    fn delete_multi(&mut self, keys: &[String]) -> Result<()> {
        let mut state = self.lock()?;
        for key in keys {
            state.remove(key);
        }
        Ok(())
    }

    fn flush_all(&mut self) -> Result<()> {
        let mut state = self.lock()?;
        state.items.clear();
        state.lru.clear();
        Ok(())
    }

    fn disconnect(&mut self) {}
}

impl StoreConnector for MemoryStore {
    type Client = MemoryStore;

    fn connect(&self) -> Result<Self::Client> {
        Ok(self.clone())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;

    const NOW: i64 = 1_700_000_000;

    fn store(max_items: usize) -> (MemoryStore, ManualClock) {
        let clock = ManualClock::new(NOW);
        (MemoryStore::with_clock(max_items, Arc::new(clock.clone())), clock)
    }

    #[test]
    fn test_set_and_get() {
        let (mut store, _) = store(10);

        store.set("key1", b"value1".to_vec(), 0).unwrap();
        assert_eq!(store.get("key1").unwrap(), Some(b"value1".to_vec()));
        assert_eq!(store.get("missing").unwrap(), None);

        let stats = store.stats().unwrap();
        assert_eq!(stats.get_hits, 1);
        assert_eq!(stats.get_misses, 1);
        assert_eq!(stats.curr_items, 1);
    }

    #[test]
    fn test_relative_expiry() {
        let (mut store, clock) = store(10);

        store.set("k", b"v".to_vec(), 2).unwrap();
        clock.advance(1);
        assert!(store.get("k").unwrap().is_some());
        clock.advance(1);
        assert!(store.get("k").unwrap().is_none());
    }

    #[test]
    fn test_absolute_expiry() {
        let (mut store, clock) = store(10);

        store.set("k", b"v".to_vec(), (NOW + 100) as u64).unwrap();
        clock.advance(99);
        assert!(store.get("k").unwrap().is_some());
        clock.advance(1);
        assert!(store.get("k").unwrap().is_none());
    }

    #[test]
    fn test_add_only_when_absent() {
        let (mut store, clock) = store(10);

        assert!(store.add("k", b"1".to_vec(), 5).unwrap());
        assert!(!store.add("k", b"2".to_vec(), 5).unwrap());
        assert_eq!(store.get("k").unwrap(), Some(b"1".to_vec()));

        clock.advance(5);
        assert!(store.add("k", b"3".to_vec(), 5).unwrap(), "expired items do not block add");
    }

    #[test]
    fn test_delete() {
        let (mut store, _) = store(10);

        store.set("k", b"v".to_vec(), 0).unwrap();
        assert!(store.delete("k").unwrap());
        assert!(!store.delete("k").unwrap());
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_incr_decr() {
        let (mut store, _) = store(10);

        store.set("n", b"5".to_vec(), 0).unwrap();
        assert_eq!(store.incr("n", 1).unwrap(), Some(6));
        assert_eq!(store.decr("n", 10).unwrap(), Some(0), "decr floors at zero");
        assert_eq!(store.incr("missing", 1).unwrap(), None);
        assert_eq!(store.decr("missing", 1).unwrap(), None);
        assert_eq!(store.get("n").unwrap(), Some(b"0".to_vec()));
    }

    #[test]
    fn test_incr_wraps() {
        let (mut store, _) = store(10);
        store.set("n", u64::MAX.to_string().into_bytes(), 0).unwrap();
        assert_eq!(store.incr("n", 2).unwrap(), Some(1));
    }

    #[test]
    fn test_incr_non_numeric() {
        let (mut store, _) = store(10);
        store.set("s", b"\"text\"".to_vec(), 0).unwrap();
        assert!(matches!(store.incr("s", 1), Err(CacheError::Rejected(_))));
    }

    #[test]
    fn test_multi_operations() {
        let (mut store, _) = store(10);

        store
            .set_multi(vec![("a".into(), b"1".to_vec()), ("b".into(), b"2".to_vec())], 0)
            .unwrap();
        let found = store
            .get_multi(&["a".into(), "b".into(), "c".into()])
            .unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found["b"], b"2");

        store.delete_multi(&["a".into(), "zzz".into()]).unwrap();
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_flush_all() {
        let (mut store, _) = store(10);
        store.set("a", b"1".to_vec(), 0).unwrap();
        store.flush_all().unwrap();
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_lru_eviction() {
        let (mut store, _) = store(2);

        store.set("a", b"1".to_vec(), 0).unwrap();
        store.set("b", b"2".to_vec(), 0).unwrap();
        store.get("a").unwrap();
        store.set("c", b"3".to_vec(), 0).unwrap();

        assert!(store.get("a").unwrap().is_some());
        assert!(store.get("b").unwrap().is_none());
        assert_eq!(store.stats().unwrap().evictions, 1);
    }

    #[test]
    fn test_purge_expired() {
        let (mut store, clock) = store(10);

        store.set("short", b"1".to_vec(), 1).unwrap();
        store.set("long", b"2".to_vec(), 100).unwrap();
        clock.advance(2);

        assert_eq!(store.purge_expired().unwrap(), 1);
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_key_validation() {
        let (mut store, _) = store(10);

        let long_key = "x".repeat(MAX_KEY_LENGTH + 1);
        assert!(matches!(store.get(&long_key), Err(CacheError::InvalidRequest(_))));
        assert!(matches!(store.get("has space"), Err(CacheError::InvalidRequest(_))));
        assert!(matches!(store.get(""), Err(CacheError::InvalidRequest(_))));
    }

    #[test]
    fn test_value_too_large() {
        let (mut store, _) = store(10);
        let result = store.set("k", vec![b'x'; MAX_VALUE_SIZE + 1], 0);
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }

    #[test]
    fn test_clones_share_items() {
        let (mut store, _) = store(10);
        let mut other = store.connect().unwrap();

        store.set("k", b"v".to_vec(), 0).unwrap();
        assert_eq!(other.get("k").unwrap(), Some(b"v".to_vec()));
    }
}
