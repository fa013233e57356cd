//! Herd Statistics Module
//!
//! Counters describing how reads were answered.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Herd Stats ==
/// Lock-free read counters, safe to bump from any caller.
#[derive(Debug, Default)]
pub struct HerdStats {
    hits: AtomicU64,
    misses: AtomicU64,
    stale: AtomicU64,
    refresh_failures: AtomicU64,
}

impl HerdStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.record_misses(1);
    }

    pub fn record_misses(&self, count: u64) {
        self.misses.fetch_add(count, Ordering::Relaxed);
    }

    /// A soft-expired value was found and republished; counts as a miss too.
    pub fn record_stale(&self) {
        self.stale.fetch_add(1, Ordering::Relaxed);
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_refresh_failure(&self) {
        self.refresh_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> HerdStatsSnapshot {
        HerdStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stale: self.stale.load(Ordering::Relaxed),
            refresh_failures: self.refresh_failures.load(Ordering::Relaxed),
        }
    }
}

// == Snapshot ==
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HerdStatsSnapshot {
    /// Reads answered with a fresh value
    pub hits: u64,
    /// Reads answered with the caller's default (absent or stale)
    pub misses: u64,
    /// Reads that found a soft-expired value
    pub stale: u64,
    /// Stale republish writes that failed
    pub refresh_failures: u64,
}

impl HerdStatsSnapshot {
    /// Returns hits / (hits + misses), or 0.0 if nothing has been read.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
