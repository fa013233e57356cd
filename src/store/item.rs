//! Stored Item Module
//!
//! A single store entry with memcached-style expiry.

use crate::cache::MAX_RELATIVE_TTL;

// == Stored Item ==
/// Represents a single item held by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredItem {
    /// The stored bytes
    pub value: Vec<u8>,
    /// Unix second at which the item disappears, None = never
    pub expires_at: Option<i64>,
}

impl StoredItem {
    // == Constructor ==
    /// Creates a new item from a store exptime.
    ///
    /// # Arguments
    /// * `value` - The bytes to store
    /// * `exptime` - `0` for no expiry, up to 30 days relative to `now`,
    ///   anything larger an absolute unix timestamp
    /// * `now` - Current unix time in seconds
    pub fn new(value: Vec<u8>, exptime: u64, now: i64) -> Self {
        Self {
            value,
            expires_at: resolve_exptime(exptime, now),
        }
    }

    // == Is Expired ==
    /// An item is expired once the current second reaches its deadline.
    pub fn is_expired(&self, now: i64) -> bool {
        match self.expires_at {
            Some(deadline) => now >= deadline,
            None => false,
        }
    }
}

/// Turns an exptime into an absolute deadline.
pub fn resolve_exptime(exptime: u64, now: i64) -> Option<i64> {
    match exptime {
        0 => None,
        relative if relative <= MAX_RELATIVE_TTL => Some(now + relative as i64),
        absolute => Some(i64::try_from(absolute).unwrap_or(i64::MAX)),
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    #[test]
    fn test_item_without_expiry() {
        let item = StoredItem::new(b"v".to_vec(), 0, NOW);

        assert!(item.expires_at.is_none());
        assert!(!item.is_expired(i64::MAX));
    }

    #[test]
    fn test_relative_expiry() {
        let item = StoredItem::new(b"v".to_vec(), 10, NOW);

        assert_eq!(item.expires_at, Some(NOW + 10));
        assert!(!item.is_expired(NOW + 9));
        assert!(item.is_expired(NOW + 10));
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let item = StoredItem::new(b"v".to_vec(), 1, NOW);
        assert!(item.is_expired(NOW + 1), "Item should be expired at boundary");
        assert!(item.is_expired(NOW + 5));
    }

    #[test]
    fn test_absolute_expiry() {
        let deadline = NOW as u64 + 40 * 24 * 3600;
        let item = StoredItem::new(b"v".to_vec(), deadline, NOW);

        assert_eq!(item.expires_at, Some(deadline as i64));
        assert!(!item.is_expired(NOW + 39 * 24 * 3600));
    }

    #[test]
    fn test_absolute_expiry_in_the_past() {
        // Just over the ceiling reads as a date in 1970.
        let item = StoredItem::new(b"v".to_vec(), MAX_RELATIVE_TTL + 1, NOW);
        assert!(item.is_expired(NOW));
    }
}
