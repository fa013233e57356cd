//! Store Module
//!
//! The raw key-value store the cache layer sits in front of.
//!
//! TTL convention for every method taking `exptime`: whole seconds, `0` means
//! no expiry, and values above [`crate::cache::MAX_RELATIVE_TTL`] are absolute
//! unix timestamps.

mod item;
mod lru;
mod memory;
mod pool;

use std::collections::HashMap;

use crate::error::Result;

pub use item::StoredItem;
pub use lru::LruIndex;
pub use memory::{MemoryStore, StoreStats};
pub use pool::{ClientPool, PooledClient};

// == Public Constants ==
/// Maximum key length in bytes accepted by the store
pub const MAX_KEY_LENGTH: usize = 250;

/// Maximum item size in bytes accepted by the store
pub const MAX_VALUE_SIZE: usize = 1024 * 1024; // 1 MB

/// One connection's worth of store operations.
///
/// Methods take `&mut self`: a client owns its connection state and is never
/// used by two callers at once. Failures are reported as
/// [`crate::error::CacheError::Store`].
pub trait StoreClient {
    fn get(&mut self, key: &str) -> Result<Option<Vec<u8>>>;

    fn set(&mut self, key: &str, value: Vec<u8>, exptime: u64) -> Result<()>;

    /// Stores only if the key is absent. Returns whether it was stored.
    fn add(&mut self, key: &str, value: Vec<u8>, exptime: u64) -> Result<bool>;

    /// Returns whether the key existed.
    fn delete(&mut self, key: &str) -> Result<bool>;

    /// Returns the new value, or `None` when the key is absent.
    fn incr(&mut self, key: &str, delta: u64) -> Result<Option<u64>>;

    /// Returns the new value, or `None` when the key is absent.
    fn decr(&mut self, key: &str, delta: u64) -> Result<Option<u64>>;

    /// Returns only the keys that were found.
    fn get_multi(&mut self, keys: &[String]) -> Result<HashMap<String, Vec<u8>>>;

    fn set_multi(&mut self, items: Vec<(String, Vec<u8>)>, exptime: u64) -> Result<()>;

    fn delete_multi(&mut self, keys: &[String]) -> Result<()>;

    fn flush_all(&mut self) -> Result<()>;

    fn disconnect(&mut self);
}

/// Opens store clients on demand.
pub trait StoreConnector: Send + Sync {
    type Client: StoreClient + Send;

    fn connect(&self) -> Result<Self::Client>;
}
