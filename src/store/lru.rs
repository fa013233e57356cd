//! LRU Index Module
//!
//! Recency ordering used by the store to pick eviction victims.

use std::collections::{BTreeMap, HashMap};

// == LRU Index ==
/// Tracks access order for least-recently-used eviction.
///
/// Every touch stamps the key with a new tick; the smallest tick is the
/// eviction candidate. Touch and removal are O(log n).
#[derive(Debug, Default)]
pub struct LruIndex {
    tick: u64,
    by_key: HashMap<String, u64>,
    by_tick: BTreeMap<u64, String>,
}

impl LruIndex {
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Marks a key as most recently used, inserting it if new.
    pub fn touch(&mut self, key: &str) {
        self.tick += 1;
        if let Some(old) = self.by_key.insert(key.to_string(), self.tick) {
            self.by_tick.remove(&old);
        }
        self.by_tick.insert(self.tick, key.to_string());
    }

    pub fn remove(&mut self, key: &str) {
        if let Some(tick) = self.by_key.remove(key) {
            self.by_tick.remove(&tick);
        }
    }

    // == Evict ==
    /// Removes and returns the least recently used key.
    pub fn pop_oldest(&mut self) -> Option<String> {
        let (_, key) = self.by_tick.pop_first()?;
        self.by_key.remove(&key);
        Some(key)
    }

    pub fn clear(&mut self) {
        self.by_key.clear();
        self.by_tick.clear();
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pop_in_insertion_order() {
        let mut lru = LruIndex::new();
        lru.touch("a");
        lru.touch("b");
        lru.touch("c");

        assert_eq!(lru.pop_oldest().as_deref(), Some("a"));
        assert_eq!(lru.pop_oldest().as_deref(), Some("b"));
        assert_eq!(lru.len(), 1);
    }

    #[test]
    fn test_touch_refreshes_recency() {
        let mut lru = LruIndex::new();
        lru.touch("a");
        lru.touch("b");
        lru.touch("a");

        assert_eq!(lru.len(), 2);
        assert_eq!(lru.pop_oldest().as_deref(), Some("b"));
        assert_eq!(lru.pop_oldest().as_deref(), Some("a"));
        assert!(lru.is_empty());
    }

    #[test]
    fn test_remove_and_missing_keys() {
        let mut lru = LruIndex::new();
        lru.touch("a");
        lru.touch("b");

        lru.remove("a");
        lru.remove("nonexistent");

        assert_eq!(lru.len(), 1);
        assert_eq!(lru.pop_oldest().as_deref(), Some("b"));
        assert_eq!(lru.pop_oldest(), None);
    }

    #[test]
    fn test_clear() {
        let mut lru = LruIndex::new();
        lru.touch("a");
        lru.clear();
        assert!(lru.is_empty());
        assert_eq!(lru.pop_oldest(), None);
    }
}
