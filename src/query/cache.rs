//! Time-bounded search result cache.
//!
//! Caches ranked result lists per (query, mode, weights, limit). Two
//! mechanisms bound staleness: every entry expires after a fixed TTL, and
//! [`ResultCache::invalidate_all`] bumps a generation counter that orphans
//! every existing entry at once. Maintenance jobs call the latter after any
//! corpus or index mutation, so a cached list never outlives the snapshot
//! it was computed from by more than the TTL even if an invalidation is
//! missed. The entry count is capped; a full cache drops dead entries on
//! insert and then evicts the oldest live one.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::{SearchMode, SignalWeights};
use crate::models::RankedPaper;

/// Default entry lifetime.
const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Default entry-count bound.
const DEFAULT_MAX_ENTRIES: usize = 256;

/// Cache key. Weights are keyed by bit pattern so the key stays `Eq`/`Hash`
/// without rounding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    query: String,
    mode: SearchMode,
    weights: [u32; 3],
    limit: usize,
}

impl CacheKey {
    fn new(query: &str, mode: SearchMode, weights: &SignalWeights, limit: usize) -> Self {
        Self {
            query: query.to_string(),
            mode,
            weights: [
                weights.lexical.to_bits(),
                weights.semantic.to_bits(),
                weights.exact.to_bits(),
            ],
            limit,
        }
    }
}

struct CacheEntry {
    results: Vec<RankedPaper>,
    generation: u64,
    stored_at: Instant,
}

/// Generation-stamped, size-bounded TTL cache for ranked results.
pub struct ResultCache {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    generation: AtomicU64,
    ttl: Duration,
    max_entries: usize,
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultCache {
    /// Create a cache with the default TTL and entry bound.
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_TTL, DEFAULT_MAX_ENTRIES)
    }

    /// Create a cache with an explicit TTL and the default entry bound.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self::with_limits(ttl, DEFAULT_MAX_ENTRIES)
    }

    /// Create a cache with explicit limits. `max_entries` must be at
    /// least 1; a full cache evicts dead entries first, then the oldest
    /// live one.
    pub fn with_limits(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    /// Number of entries currently held, dead or alive.
    pub fn len(&self) -> usize {
        match self.entries.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up cached results; misses on expiry or stale generation.
    pub fn get(
        &self,
        query: &str,
        mode: SearchMode,
        weights: &SignalWeights,
        limit: usize,
    ) -> Option<Vec<RankedPaper>> {
        let key = CacheKey::new(query, mode, weights, limit);
        let current = self.generation.load(Ordering::Acquire);
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match entries.get(&key) {
            Some(entry) if entry.generation == current && entry.stored_at.elapsed() < self.ttl => {
                Some(entry.results.clone())
            }
            Some(_) => {
                entries.remove(&key);
                None
            }
            None => None,
        }
    }

    /// Store results for a query under the current generation.
    pub fn put(
        &self,
        query: &str,
        mode: SearchMode,
        weights: &SignalWeights,
        limit: usize,
        results: &[RankedPaper],
    ) {
        let key = CacheKey::new(query, mode, weights, limit);
        let current = self.generation.load(Ordering::Acquire);
        let entry = CacheEntry {
            results: results.to_vec(),
            generation: current,
            stored_at: Instant::now(),
        };
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if entries.len() >= self.max_entries && !entries.contains_key(&key) {
            // Expired and generation-orphaned entries go first.
            entries.retain(|_, e| e.generation == current && e.stored_at.elapsed() < self.ttl);
            while entries.len() >= self.max_entries {
                let Some(oldest) = entries
                    .iter()
                    .min_by_key(|(_, e)| e.stored_at)
                    .map(|(k, _)| k.clone())
                else {
                    break;
                };
                entries.remove(&oldest);
            }
        }
        entries.insert(key, entry);
    }

    /// Orphan every cached entry by advancing the generation counter.
    pub fn invalidate_all(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }
}
