//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

fn herd_default() -> bool {
    true
}

fn delta_default() -> u64 {
    1
}

/// Request body for SET (PUT /set) and ADD (POST /add)
///
/// # Fields
/// - `key`: The logical cache key
/// - `value`: Any JSON value
/// - `ttl`: Optional TTL in seconds (default TTL if absent, 0 = never expire)
/// - `herd`: Whether to store with stale-republish protection (default: true)
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    pub key: String,
    pub value: Value,
    #[serde(default)]
    pub ttl: Option<u64>,
    #[serde(default = "herd_default")]
    pub herd: bool,
}

impl SetRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.key.is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        None
    }
}

/// Request body for SET_MANY (PUT /set_many)
#[derive(Debug, Clone, Deserialize)]
pub struct SetManyRequest {
    pub values: HashMap<String, Value>,
    #[serde(default)]
    pub ttl: Option<u64>,
    #[serde(default = "herd_default")]
    pub herd: bool,
}

/// Request body for GET_MANY (POST /get_many) and DELETE_MANY (POST /delete_many)
#[derive(Debug, Clone, Deserialize)]
pub struct KeysRequest {
    pub keys: Vec<String>,
}

/// Request body for INCR / DECR (POST /incr/:key, POST /decr/:key)
#[derive(Debug, Clone, Deserialize)]
pub struct DeltaRequest {
    #[serde(default = "delta_default")]
    pub delta: u64,
}
