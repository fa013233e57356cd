//! Configuration Module
//!
//! Handles loading cache and server configuration from environment variables.

use std::env;
use std::str::FromStr;

use tracing::warn;

use crate::cache::HashStrategy;

/// Settings consumed by the herd-protected cache facade.
///
/// Passed explicitly to [`crate::cache::HerdCache::new`]; nothing is read from
/// process-wide state after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HerdConfig {
    /// Environment namespace prefixed to every stored key ("prod", "staging", ...)
    pub flavor: String,
    /// Key-space epoch; bumping it makes every previously written key unreachable
    pub cache_version: u32,
    /// Grace period in seconds a stale value outlives its logical expiry
    pub herd_timeout: u64,
    /// TTL in seconds applied when a write does not specify one
    pub default_ttl: u64,
    /// Hash applied to logical keys
    pub hash: HashStrategy,
}

impl Default for HerdConfig {
    fn default() -> Self {
        Self {
            flavor: String::new(),
            cache_version: 1,
            herd_timeout: 60,
            default_ttl: 300,
            hash: HashStrategy::default(),
        }
    }
}

impl HerdConfig {
    /// Loads the cache settings from environment variables.
    ///
    /// # Environment Variables
    /// - `FLAVOR` - Key namespace (default: empty)
    /// - `CACHE_VERSION` - Key-space epoch (default: 1)
    /// - `CACHE_HERD_TIMEOUT` - Grace period in seconds (default: 60)
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `CACHE_KEY_HASH` - `sha256` or `xxh64` (default: sha256)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let hash = match env::var("CACHE_KEY_HASH") {
            Ok(name) => HashStrategy::from_str(&name).unwrap_or_else(|err| {
                warn!("{}, falling back to {}", err, defaults.hash);
                defaults.hash
            }),
            Err(_) => defaults.hash,
        };

        Self {
            flavor: env::var("FLAVOR").unwrap_or(defaults.flavor),
            cache_version: parse_var("CACHE_VERSION").unwrap_or(defaults.cache_version),
            herd_timeout: parse_var("CACHE_HERD_TIMEOUT").unwrap_or(defaults.herd_timeout),
            default_ttl: parse_var("DEFAULT_TTL").unwrap_or(defaults.default_ttl),
            hash,
        }
    }
}

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Cache facade settings
    pub herd: HerdConfig,
    /// Maximum number of items the in-process store holds before LRU eviction
    pub max_items: usize,
    /// HTTP server port
    pub server_port: u16,
    /// Background sweep interval in seconds
    pub cleanup_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - everything listed on [`HerdConfig::from_env`]
    /// - `MAX_ITEMS` - Store capacity (default: 10000)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Sweep frequency in seconds (default: 1)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            herd: HerdConfig::from_env(),
            max_items: parse_var("MAX_ITEMS").unwrap_or(defaults.max_items),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            cleanup_interval: parse_var("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            herd: HerdConfig::default(),
            max_items: 10_000,
            server_port: 3000,
            cleanup_interval: 1,
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}
