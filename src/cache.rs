//! Content-addressed result cache
//!
//! Results are keyed by a SHA-256 digest over the input bytes and the
//! canonical settings JSON, so identical requests share one result.
//!
//! Each key owns a slot mutex. The first caller for a key computes the value
//! while holding the slot; concurrent callers for the same key block on it
//! and then read the stored value, so a given input is processed once. A
//! failed computation leaves the slot empty for the next caller to retry.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use crate::composite::CompositeResult;
use crate::detection::DetectionResult;

// ============================================================
// Cache Digest
// ============================================================

/// SHA-256 cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheDigest {
    hash: String,
}

impl CacheDigest {
    /// Digest of input bytes plus the options they were processed with
    pub fn new(input: &[u8], options_json: &str) -> Self {
        Self::from_parts(&[input, options_json.as_bytes()])
    }

    /// Digest over several byte slices
    ///
    /// Each part is length-prefixed so `["ab", "c"]` and `["a", "bc"]`
    /// produce different keys.
    pub fn from_parts(parts: &[&[u8]]) -> Self {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update((part.len() as u64).to_le_bytes());
            hasher.update(part);
        }
        Self {
            hash: format!("{:x}", hasher.finalize()),
        }
    }

    /// Hex-encoded hash
    pub fn as_str(&self) -> &str {
        &self.hash
    }

    /// First 12 hex digits, for log output
    pub fn short(&self) -> &str {
        &self.hash[..12]
    }
}

impl fmt::Display for CacheDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hash)
    }
}

// ============================================================
// Result Cache
// ============================================================

type Slot<T> = Arc<Mutex<Option<Arc<T>>>>;

/// Hit/miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Write-once, single-flight memoization keyed by [`CacheDigest`]
pub struct ResultCache<T> {
    slots: RwLock<HashMap<CacheDigest, Slot<T>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<T> Default for ResultCache<T> {
    fn default() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }
}

impl<T> ResultCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored value for `key`, if computed
    ///
    /// Does not wait for an in-flight computation.
    pub fn get(&self, key: &CacheDigest) -> Option<Arc<T>> {
        let slot = {
            let slots = self.slots.read().unwrap_or_else(|e| e.into_inner());
            slots.get(key).cloned()
        }?;
        let value = match slot.try_lock() {
            Ok(guard) => guard.clone(),
            Err(std::sync::TryLockError::Poisoned(e)) => e.into_inner().clone(),
            Err(std::sync::TryLockError::WouldBlock) => None,
        };
        value
    }

    /// Return the cached value or compute it exactly once
    pub fn get_or_try_insert_with<E, F>(&self, key: &CacheDigest, compute: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let slot = self.slot(key);
        let mut guard = slot.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(value) = guard.as_ref() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(key = key.short(), "cache hit");
            return Ok(Arc::clone(value));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(key = key.short(), "cache miss");

        match compute() {
            Ok(value) => {
                let value = Arc::new(value);
                *guard = Some(Arc::clone(&value));
                Ok(value)
            }
            Err(e) => {
                drop(guard);
                self.evict_empty(key, &slot);
                Err(e)
            }
        }
    }

    /// Number of stored values
    pub fn len(&self) -> usize {
        let slots = self.slots.read().unwrap_or_else(|e| e.into_inner());
        slots
            .values()
            .filter(|slot| matches!(slot.try_lock(), Ok(guard) if guard.is_some()))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry and reset the counters
    pub fn clear(&self) {
        let mut slots = self.slots.write().unwrap_or_else(|e| e.into_inner());
        slots.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }

    /// Remove `key` if it still maps to `slot` and nothing was stored
    fn evict_empty(&self, key: &CacheDigest, slot: &Slot<T>) {
        let mut slots = self.slots.write().unwrap_or_else(|e| e.into_inner());
        let removable = match slots.get(key) {
            Some(current) if Arc::ptr_eq(current, slot) => {
                matches!(current.try_lock(), Ok(guard) if guard.is_none())
            }
            _ => false,
        };
        if removable {
            slots.remove(key);
        }
    }

    fn slot(&self, key: &CacheDigest) -> Slot<T> {
        {
            let slots = self.slots.read().unwrap_or_else(|e| e.into_inner());
            if let Some(slot) = slots.get(key) {
                return Arc::clone(slot);
            }
        }
        let mut slots = self.slots.write().unwrap_or_else(|e| e.into_inner());
        Arc::clone(slots.entry(key.clone()).or_default())
    }
}

// ============================================================
// Pipeline Cache
// ============================================================

/// Shared caches for the mockup pipeline
#[derive(Default)]
pub struct PipelineCache {
    pub detections: ResultCache<DetectionResult>,
    pub composites: ResultCache<CompositeResult>,
}

impl PipelineCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&self) {
        self.detections.clear();
        self.composites.clear();
    }
}

// ============================================================
// Tests
// ============================================================
