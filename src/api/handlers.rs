//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint. Cache calls block on
//! the store, so every handler hops onto the blocking pool.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;

use crate::cache::HerdCache;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    AddResponse, CounterResponse, DeltaRequest, GetManyResponse, GetResponse, HealthResponse,
    KeysRequest, MessageResponse, SetManyRequest, SetRequest, StatsResponse,
};
use crate::store::MemoryStore;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<HerdCache<MemoryStore>>,
}

impl AppState {
    pub fn new(cache: HerdCache<MemoryStore>) -> Self {
        Self {
            cache: Arc::new(cache),
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Builds an in-process store sized by the Config and a herd cache over it.
    pub fn from_config(config: &Config) -> Self {
        let store = MemoryStore::new(config.max_items);
        Self::new(HerdCache::new(store, &config.herd))
    }

    /// The store behind the cache.
    pub fn store(&self) -> &MemoryStore {
        self.cache.connector()
    }

    /// Runs a cache call on the blocking pool.
    async fn run<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&HerdCache<MemoryStore>) -> Result<T> + Send + 'static,
    {
        let cache = self.cache.clone();
        tokio::task::spawn_blocking(move || op(&cache))
            .await
            .map_err(|err| CacheError::Internal(err.to_string()))?
    }
}

/// Handler for PUT /set
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<MessageResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let key = req.key.clone();
    state
        .run(move |cache| {
            if req.herd {
                cache.set(&req.key, &req.value, req.ttl)
            } else {
                cache.set_raw(&req.key, &req.value, req.ttl)
            }
        })
        .await?;

    Ok(Json(MessageResponse::new(format!("Key '{}' set successfully", key))))
}

/// Handler for POST /add
pub async fn add_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<AddResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let key = req.key.clone();
    let added = state
        .run(move |cache| {
            if req.herd {
                cache.add(&req.key, &req.value, req.ttl)
            } else {
                cache.add_raw(&req.key, &req.value, req.ttl)
            }
        })
        .await?;

    Ok(Json(AddResponse { key, added }))
}

/// Handler for GET /get/:key
///
/// A miss, including the first read of a stale value, answers 404.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    let lookup = key.clone();
    let value = state
        .run(move |cache| cache.get::<Value>(&lookup))
        .await?
        .ok_or_else(|| CacheError::NotFound(key.clone()))?;

    Ok(Json(GetResponse::new(key, value)))
}

/// Handler for DELETE /del/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<MessageResponse>> {
    let target = key.clone();
    state.run(move |cache| cache.delete(&target)).await?;

    Ok(Json(MessageResponse::new(format!("Key '{}' deleted", key))))
}

/// Handler for POST /incr/:key
pub async fn incr_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<DeltaRequest>,
) -> Result<Json<CounterResponse>> {
    let target = key.clone();
    let value = state.run(move |cache| cache.incr(&target, req.delta)).await?;

    Ok(Json(CounterResponse { key, value }))
}

/// Handler for POST /decr/:key
pub async fn decr_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<DeltaRequest>,
) -> Result<Json<CounterResponse>> {
    let target = key.clone();
    let value = state.run(move |cache| cache.decr(&target, req.delta)).await?;

    Ok(Json(CounterResponse { key, value }))
}

/// Handler for POST /get_many
pub async fn get_many_handler(
    State(state): State<AppState>,
    Json(req): Json<KeysRequest>,
) -> Result<Json<GetManyResponse>> {
    let values = state
        .run(move |cache| cache.get_many::<_, Value>(&req.keys))
        .await?;

    Ok(Json(GetManyResponse { values }))
}

/// Handler for PUT /set_many
pub async fn set_many_handler(
    State(state): State<AppState>,
    Json(req): Json<SetManyRequest>,
) -> Result<Json<MessageResponse>> {
    if req.values.keys().any(|key| key.is_empty()) {
        return Err(CacheError::InvalidRequest("Key cannot be empty".to_string()));
    }

    let count = req.values.len();
    state
        .run(move |cache| {
            if req.herd {
                cache.set_many(req.values, req.ttl)
            } else {
                cache.set_many_raw(req.values, req.ttl)
            }
        })
        .await?;

    Ok(Json(MessageResponse::new(format!("{} keys set", count))))
}

/// Handler for POST /delete_many
pub async fn delete_many_handler(
    State(state): State<AppState>,
    Json(req): Json<KeysRequest>,
) -> Result<Json<MessageResponse>> {
    let count = req.keys.len();
    state.run(move |cache| cache.delete_many(&req.keys)).await?;

    Ok(Json(MessageResponse::new(format!("{} keys deleted", count))))
}

/// Handler for POST /clear
pub async fn clear_handler(State(state): State<AppState>) -> Result<Json<MessageResponse>> {
    state.run(|cache| cache.clear()).await?;

    Ok(Json(MessageResponse::new("Cache cleared")))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let response = state
        .run(|cache| Ok(StatsResponse::new(cache.stats(), cache.connector().stats()?)))
        .await?;

    Ok(Json(response))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
