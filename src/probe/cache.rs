//! Short-lived probe result cache.
//!
//! Keeps the most recent result per target so that callers asking within
//! the same instant (an auto-refresh firing next to a manual check) share
//! one probe.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    target: String,
    count: u32,
}

/// The last recorded result for one target.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub last_result: Option<f64>,
    pub captured_at: Instant,
}

/// Per-target probe result cache.
#[derive(Debug)]
pub struct ResultCache {
    duration: Duration,
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    gates: Mutex<HashMap<CacheKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl ResultCache {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            entries: Mutex::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
        }
    }

    /// True iff a result for `target` was recorded less than the cache
    /// duration ago.
    pub fn should_reuse(&self, target: &str, count: u32) -> bool {
        self.lookup(target, count).is_some()
    }

    /// Return the cached result if it is still fresh.
    ///
    /// The outer `Option` is the cache hit; the inner one is the probe
    /// result itself, which may be a cached failure.
    pub fn lookup(&self, target: &str, count: u32) -> Option<Option<f64>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.get(&key(target, count))?;
        (entry.captured_at.elapsed() < self.duration).then_some(entry.last_result)
    }

    /// Record a fresh result.
    pub fn record(&self, target: &str, count: u32, result: Option<f64>) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(
            key(target, count),
            CacheEntry {
                last_result: result,
                captured_at: Instant::now(),
            },
        );
    }

    /// Per-key lock held across a lookup and the probe that fills it, so a
    /// miss arriving while the same key is being probed waits for that
    /// result instead of starting a second probe.
    pub fn gate(&self, target: &str, count: u32) -> Arc<tokio::sync::Mutex<()>> {
        let mut gates = self.gates.lock().unwrap_or_else(PoisonError::into_inner);
        gates.entry(key(target, count)).or_default().clone()
    }
}

fn key(target: &str, count: u32) -> CacheKey {
    CacheKey {
        target: target.to_string(),
        count,
    }
}
