//! Herd Cache Facade
//!
//! The public cache API: encodes keys, wraps values for herd protection and
//! drives a pooled store client for every call.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::{
    Clock, HerdGuard, HerdStats, HerdStatsSnapshot, KeyCodec, KeyEncoder, Lookup, SystemClock,
    WritePlan,
};
use crate::config::HerdConfig;
use crate::error::{CacheError, Result};
use crate::store::{ClientPool, StoreClient, StoreConnector};

// == Herd Cache ==
/// A cache in front of a memcached-style store that keeps serving a value for
/// a short grace period after it expires, so only the first reader to notice
/// the expiry recomputes it.
///
/// Safe to share between threads; each call borrows its own store client.
pub struct HerdCache<C: StoreConnector> {
    pool: ClientPool<C>,
    keys: Box<dyn KeyEncoder>,
    guard: HerdGuard,
    clock: Arc<dyn Clock>,
    stats: HerdStats,
}

impl<C: StoreConnector> HerdCache<C> {
    // == Constructor ==
    /// Creates a cache over `connector` using the system clock and a
    /// [`KeyCodec`] built from `config`.
    pub fn new(connector: C, config: &HerdConfig) -> Self {
        Self {
            pool: ClientPool::new(connector),
            keys: Box::new(KeyCodec::from_config(config)),
            guard: HerdGuard::new(config.herd_timeout, config.default_ttl),
            clock: Arc::new(SystemClock),
            stats: HerdStats::new(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the configured key codec.
    pub fn with_key_encoder(mut self, encoder: impl KeyEncoder + 'static) -> Self {
        self.keys = Box::new(encoder);
        self
    }

    /// TTL in seconds used when a write passes `None`.
    pub fn default_timeout(&self) -> u64 {
        self.guard.default_ttl()
    }

    pub fn make_key(&self, key: &str) -> String {
        self.keys.encode(key)
    }

    pub fn stats(&self) -> HerdStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn connector(&self) -> &C {
        self.pool.connector()
    }

    /// Runs `op` on a pooled client. Clients that hit a store failure are
    /// dropped from the pool.
    fn with_client<T>(&self, op: impl FnOnce(&mut C::Client) -> Result<T>) -> Result<T> {
        let mut client = self.pool.checkout()?;
        let result = op(&mut *client);
        if matches!(&result, Err(err) if err.is_store_failure()) {
            client.discard();
        }
        result
    }

    // == Get ==
    /// Returns the cached value, or `None` on a miss.
    ///
    /// A soft-expired value is written back with a fresh grace period and
    /// reported as a miss, telling this caller to recompute it.
    pub fn get<V: DeserializeOwned>(&self, key: &str) -> Result<Option<V>> {
        let encoded = self.keys.encode(key);
        let Some(raw) = self.with_client(|client| client.get(&encoded))? else {
            self.stats.record_miss();
            return Ok(None);
        };

        match self.guard.inspect(raw, self.clock.now()) {
            Lookup::Fresh(bytes) => {
                self.stats.record_hit();
                Ok(Some(serde_json::from_slice(&bytes)?))
            }
            Lookup::Stale { republish } => {
                self.stats.record_stale();
                debug!("Key '{}' is stale, republishing for {}s", key, self.guard.herd_timeout());
                self.republish(&encoded, republish);
                Ok(None)
            }
        }
    }

    /// Returns the cached value, or `default` on a miss.
    pub fn get_or<V: DeserializeOwned>(&self, key: &str, default: V) -> Result<V> {
        Ok(self.get(key)?.unwrap_or(default))
    }

    fn republish(&self, encoded: &str, plan: WritePlan) {
        let outcome = self.with_client(|client| client.set(encoded, plan.payload, plan.exptime));
        if let Err(err) = outcome {
            self.stats.record_refresh_failure();
            warn!("Failed to republish stale value: {}", err);
        }
    }

    // == Set ==
    /// Stores `value` with herd protection. `ttl` of `None` uses the default,
    /// `Some(0)` stores the value raw without expiry.
    pub fn set<V: Serialize + ?Sized>(&self, key: &str, value: &V, ttl: Option<u64>) -> Result<()> {
        self.write(key, value, ttl, true)
    }

    /// Stores `value` as is, without an envelope. Required for values later
    /// used with [`HerdCache::incr`] / [`HerdCache::decr`].
    pub fn set_raw<V: Serialize + ?Sized>(&self, key: &str, value: &V, ttl: Option<u64>) -> Result<()> {
        self.write(key, value, ttl, false)
    }

    fn write<V: Serialize + ?Sized>(&self, key: &str, value: &V, ttl: Option<u64>, herd: bool) -> Result<()> {
        let plan = self.plan(value, ttl, herd)?;
        let encoded = self.keys.encode(key);
        debug!("Setting '{}' (herd: {}, exptime: {})", key, herd, plan.exptime);
        self.with_client(|client| client.set(&encoded, plan.payload, plan.exptime))
    }

    fn plan<V: Serialize + ?Sized>(&self, value: &V, ttl: Option<u64>, herd: bool) -> Result<WritePlan> {
        let bytes = serde_json::to_vec(value)?;
        Ok(self.guard.plan_write(bytes, ttl, herd, self.clock.now()))
    }

    // == Add ==
    /// Stores `value` with herd protection only if the key is absent.
    /// Returns whether it was stored.
    pub fn add<V: Serialize + ?Sized>(&self, key: &str, value: &V, ttl: Option<u64>) -> Result<bool> {
        self.insert(key, value, ttl, true)
    }

    pub fn add_raw<V: Serialize + ?Sized>(&self, key: &str, value: &V, ttl: Option<u64>) -> Result<bool> {
        self.insert(key, value, ttl, false)
    }

    fn insert<V: Serialize + ?Sized>(&self, key: &str, value: &V, ttl: Option<u64>, herd: bool) -> Result<bool> {
        let plan = self.plan(value, ttl, herd)?;
        let encoded = self.keys.encode(key);
        self.with_client(|client| client.add(&encoded, plan.payload, plan.exptime))
    }

    // == Delete ==
    /// Removes the key; absent keys are not an error.
    pub fn delete(&self, key: &str) -> Result<()> {
        let encoded = self.keys.encode(key);
        self.with_client(|client| client.delete(&encoded))?;
        Ok(())
    }

    // == Incr / Decr ==
    /// Atomically adds `delta` to a raw integer value.
    ///
    /// Fails with [`CacheError::NotFound`] when the key is absent.
    pub fn incr(&self, key: &str, delta: u64) -> Result<u64> {
        let encoded = self.keys.encode(key);
        self.with_client(|client| client.incr(&encoded, delta))?
            .ok_or_else(|| CacheError::NotFound(key.to_string()))
    }

    /// Atomically subtracts `delta` from a raw integer value, stopping at zero.
    ///
    /// Fails with [`CacheError::NotFound`] when the key is absent.
    pub fn decr(&self, key: &str, delta: u64) -> Result<u64> {
        let encoded = self.keys.encode(key);
        self.with_client(|client| client.decr(&encoded, delta))?
            .ok_or_else(|| CacheError::NotFound(key.to_string()))
    }

    // == Get Many ==
    /// Fetches several keys in one round trip.
    ///
    /// The result only contains fresh values, keyed by the logical keys.
    /// Stale values found along the way are republished together in one
    /// batch write. That write happens even when a fresh value fails to
    /// deserialize; the first such error is returned afterwards.
    pub fn get_many<K, V>(&self, keys: &[K]) -> Result<HashMap<String, V>>
    where
        K: AsRef<str>,
        V: DeserializeOwned,
    {
        let reverse: HashMap<String, &str> = keys
            .iter()
            .map(|key| (self.keys.encode(key.as_ref()), key.as_ref()))
            .collect();
        let encoded: Vec<String> = reverse.keys().cloned().collect();

        let found = self.with_client(|client| client.get_multi(&encoded))?;
        let now = self.clock.now();
        let mut values = HashMap::with_capacity(found.len());
        let mut stale = Vec::new();
        let mut decode_error = None;
        let mut undecodable = 0;

        for (encoded_key, raw) in found {
            let Some(&logical) = reverse.get(&encoded_key) else {
                continue;
            };
            match self.guard.inspect(raw, now) {
                Lookup::Fresh(bytes) => {
                    self.stats.record_hit();
                    match serde_json::from_slice(&bytes) {
                        Ok(value) => {
                            values.insert(logical.to_string(), value);
                        }
                        Err(err) => {
                            debug!("Key '{}' holds an undecodable value: {}", logical, err);
                            undecodable += 1;
                            decode_error.get_or_insert(err);
                        }
                    }
                }
                Lookup::Stale { republish } => {
                    self.stats.record_stale();
                    stale.push((encoded_key, republish.payload));
                }
            }
        }

        self.stats
            .record_misses((reverse.len() - values.len() - stale.len() - undecodable) as u64);

        if !stale.is_empty() {
            debug!("Republishing {} stale keys", stale.len());
            let exptime = self.guard.store_exptime(self.guard.herd_timeout(), now);
            let count = stale.len();
            if let Err(err) = self.with_client(|client| client.set_multi(stale, exptime)) {
                self.stats.record_refresh_failure();
                warn!("Failed to republish {} stale values: {}", count, err);
            }
        }

        match decode_error {
            Some(err) => Err(err.into()),
            None => Ok(values),
        }
    }

    // == Set Many ==
    /// Stores every pair with herd protection in one batch write.
    pub fn set_many<I, K, V>(&self, data: I, ttl: Option<u64>) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Serialize,
    {
        self.write_many(data, ttl, true)
    }

    pub fn set_many_raw<I, K, V>(&self, data: I, ttl: Option<u64>) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Serialize,
    {
        self.write_many(data, ttl, false)
    }

    fn write_many<I, K, V>(&self, data: I, ttl: Option<u64>, herd: bool) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Serialize,
    {
        let now = self.clock.now();
        let mut items = Vec::new();
        let mut exptime = None;

        for (key, value) in data {
            let bytes = serde_json::to_vec(&value)?;
            let plan = self.guard.plan_write(bytes, ttl, herd, now);
            exptime = Some(plan.exptime);
            items.push((self.keys.encode(key.as_ref()), plan.payload));
        }

        // Every plan shares ttl, herd and now, hence the same exptime.
        let Some(exptime) = exptime else {
            return Ok(());
        };
        debug!("Setting {} keys (herd: {}, exptime: {})", items.len(), herd, exptime);
        self.with_client(|client| client.set_multi(items, exptime))
    }

    // == Delete Many ==
    pub fn delete_many<K: AsRef<str>>(&self, keys: &[K]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let encoded: Vec<String> = keys.iter().map(|key| self.keys.encode(key.as_ref())).collect();
        self.with_client(|client| client.delete_multi(&encoded))
    }

    // == Clear ==
    /// Flushes the whole store, including keys of other flavors and versions.
    pub fn clear(&self) -> Result<()> {
        debug!("Flushing store");
        self.with_client(|client| client.flush_all())
    }

    /// Disconnects idle store clients.
    pub fn close(&self) {
        self.pool.close();
    }
}

impl<C: StoreConnector> fmt::Debug for HerdCache<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HerdCache")
            .field("keys", &self.keys)
            .field("guard", &self.guard)
            .field("pool", &self.pool)
            .finish()
    }
}
