//! Response DTOs for the cache server API
//!
//! Defines the structure of outgoing HTTP response bodies.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::cache::HerdStatsSnapshot;
use crate::store::StoreStats;

/// Response body for the GET operation (GET /get/:key)
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    pub key: String,
    pub value: Value,
}

impl GetResponse {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Response body for write operations that always succeed when they return
/// (SET, DELETE, SET_MANY, DELETE_MANY, CLEAR)
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Response body for the ADD operation (POST /add)
#[derive(Debug, Clone, Serialize)]
pub struct AddResponse {
    pub key: String,
    /// False when the key already held a value
    pub added: bool,
}

/// Response body for INCR / DECR
#[derive(Debug, Clone, Serialize)]
pub struct CounterResponse {
    pub key: String,
    pub value: u64,
}

/// Response body for GET_MANY; only fresh values are listed
#[derive(Debug, Clone, Serialize)]
pub struct GetManyResponse {
    pub values: HashMap<String, Value>,
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Read outcomes seen by the herd cache
    pub herd: HerdStatsSnapshot,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    /// Counters of the underlying store
    pub store: StoreStats,
}

impl StatsResponse {
    pub fn new(herd: HerdStatsSnapshot, store: StoreStats) -> Self {
        Self {
            hit_rate: herd.hit_rate(),
            herd,
            store,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_response_serialize() {
        let resp = GetResponse::new("test_key", json!({"nested": true}));
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["key"], "test_key");
        assert_eq!(json["value"]["nested"], true);
    }

    #[test]
    fn test_stats_response_hit_rate() {
        let herd = HerdStatsSnapshot {
            hits: 80,
            misses: 20,
            stale: 5,
            refresh_failures: 0,
        };
        let resp = StatsResponse::new(herd, StoreStats::default());
        assert!((resp.hit_rate - 0.8).abs() < 0.001);

        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["herd"]["stale"], 5);
        assert_eq!(json["store"]["curr_items"], 0);
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy();
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }
}
