//! Herd Cache - a memcached-style caching layer with thundering-herd mitigation
//!
//! Values are stored with a soft expiry inside the payload and a longer hard
//! TTL in the store. The first reader past the soft expiry is told to
//! recompute while the old value is republished for everyone else.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod store;
pub mod tasks;

pub use api::AppState;
pub use cache::HerdCache;
pub use config::{Config, HerdConfig};
pub use error::{CacheError, Result};
pub use store::{MemoryStore, StoreClient, StoreConnector};
pub use tasks::spawn_sweeper;
