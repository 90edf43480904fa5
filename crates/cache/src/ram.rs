//! In-memory snapshot cache with LRU eviction
//!
//! Holds rendered page bitmaps keyed by page identity. The cache is bounded
//! twice: by the number of entries and by the total byte cost of the bitmaps
//! it holds. Inserting past either bound evicts least recently used entries
//! until both bounds hold again.

use crate::config::CacheLimits;
use log::{debug, trace};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::ops::Deref;
use std::sync::Arc;

/// Pixel dimensions of a cacheable bitmap.
pub trait Raster {
    /// Width in pixels
    fn width(&self) -> u32;

    /// Height in pixels
    fn height(&self) -> u32;
}

impl<P, C> Raster for image::ImageBuffer<P, C>
where
    P: image::Pixel,
    C: Deref<Target = [P::Subpixel]>,
{
    fn width(&self) -> u32 {
        image::ImageBuffer::width(self)
    }

    fn height(&self) -> u32 {
        image::ImageBuffer::height(self)
    }
}

impl<T: Raster + ?Sized> Raster for Arc<T> {
    fn width(&self) -> u32 {
        (**self).width()
    }

    fn height(&self) -> u32 {
        (**self).height()
    }
}

/// Statistics about cache usage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of entries currently in cache
    pub entry_count: usize,

    /// Sum of the costs of all live entries (bytes)
    pub total_cost: usize,

    /// Maximum number of entries allowed
    pub entry_limit: usize,

    /// Maximum total cost allowed (bytes)
    pub cost_limit: usize,

    /// Number of cache hits
    pub hits: u64,

    /// Number of cache misses
    pub misses: u64,

    /// Number of entries evicted to satisfy the limits
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate the cache hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Calculate cost utilization (0.0 to 1.0)
    pub fn cost_utilization(&self) -> f64 {
        if self.cost_limit == 0 {
            0.0
        } else {
            self.total_cost as f64 / self.cost_limit as f64
        }
    }
}

struct Entry<V> {
    value: V,
    cost: usize,
    /// Recency stamp; also the entry's key in `CacheState::order`
    stamp: u64,
}

/// Internal cache state
struct CacheState<K, V> {
    entries: HashMap<K, Entry<V>>,

    /// Recency order: lowest stamp is least recently used
    order: BTreeMap<u64, K>,

    /// Monotonic counter handing out recency stamps
    clock: u64,

    total_cost: usize,

    limits: CacheLimits,

    stats: CacheStats,
}

impl<K: Eq + Hash + Clone, V> CacheState<K, V> {
    fn new(limits: CacheLimits) -> Self {
        Self {
            entries: HashMap::new(),
            order: BTreeMap::new(),
            clock: 0,
            total_cost: 0,
            limits,
            stats: CacheStats {
                entry_limit: limits.entry_limit,
                cost_limit: limits.cost_limit,
                ..Default::default()
            },
        }
    }

    fn next_stamp(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Mark an entry as most recently used
    fn touch(&mut self, key: &K) {
        let stamp = self.next_stamp();
        if let Some(entry) = self.entries.get_mut(key) {
            self.order.remove(&entry.stamp);
            entry.stamp = stamp;
            self.order.insert(stamp, key.clone());
        }
    }

    fn remove_entry(&mut self, key: &K) -> Option<Entry<V>> {
        let entry = self.entries.remove(key)?;
        self.order.remove(&entry.stamp);
        self.total_cost = self.total_cost.saturating_sub(entry.cost);
        self.sync_stats();
        Some(entry)
    }

    /// Evict the least recently used entry
    fn evict_lru(&mut self) -> bool {
        let Some((_, key)) = self.order.pop_first() else {
            return false;
        };
        if let Some(entry) = self.entries.remove(&key) {
            self.total_cost = self.total_cost.saturating_sub(entry.cost);
            self.stats.evictions += 1;
            self.sync_stats();
            trace!("evicted snapshot entry ({} bytes)", entry.cost);
        }
        true
    }

    /// Evict entries until `extra_entries` more entries costing
    /// `extra_cost` bytes would fit within the limits
    fn evict_to_fit(&mut self, extra_entries: usize, extra_cost: usize) {
        while self.entries.len() + extra_entries > self.limits.entry_limit
            || self.total_cost + extra_cost > self.limits.cost_limit
        {
            if !self.evict_lru() {
                break;
            }
        }
    }

    fn sync_stats(&mut self) {
        self.stats.entry_count = self.entries.len();
        self.stats.total_cost = self.total_cost;
    }
}

/// Cost-bounded snapshot cache with LRU eviction
///
/// Thread-safe store of rendered bitmaps. Every operation takes a single
/// internal lock, so the cache can be shared freely between render workers
/// and the requesting thread.
///
/// The live entry count never exceeds `entry_limit` and the summed cost never
/// exceeds `cost_limit`. A bitmap that alone costs more than `cost_limit` is
/// not stored.
///
/// # Example
///
/// ```
/// use pdf_snapshot_cache::{CacheLimits, SnapshotCache};
///
/// let cache = SnapshotCache::new(CacheLimits::default());
///
/// let bitmap = image::RgbaImage::new(100, 50);
/// assert!(cache.put("doc_0".to_string(), bitmap));
///
/// let hit = cache.get(&"doc_0".to_string()).expect("cached");
/// assert_eq!((hit.width(), hit.height()), (100, 50));
/// assert_eq!(cache.total_cost(), 100 * 50 * 4);
/// ```
pub struct SnapshotCache<K, V> {
    state: Mutex<CacheState<K, V>>,
}

impl<K, V> SnapshotCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Raster + Clone,
{
    /// Create a new cache with the given limits
    pub fn new(limits: CacheLimits) -> Self {
        Self {
            state: Mutex::new(CacheState::new(limits)),
        }
    }

    /// Store a bitmap under `key`
    ///
    /// Replaces any previous entry for the key. Least recently used entries
    /// are evicted until the new entry fits; the new entry itself is never
    /// evicted by this call.
    ///
    /// Returns `false` when the bitmap alone exceeds the cost limit (or the
    /// cache admits no entries at all). In that case any previous entry for
    /// the key is dropped as well, since it is superseded.
    pub fn put(&self, key: K, value: V) -> bool {
        let mut state = self.state.lock();
        let cost = state.limits.cost_of(value.width(), value.height());

        state.remove_entry(&key);

        if cost > state.limits.cost_limit || state.limits.entry_limit == 0 {
            debug!(
                "snapshot of {}x{} ({} bytes) exceeds cache limits, not cached",
                value.width(),
                value.height(),
                cost
            );
            return false;
        }

        state.evict_to_fit(1, cost);

        let stamp = state.next_stamp();
        state.total_cost += cost;
        state.entries.insert(key.clone(), Entry { value, cost, stamp });
        state.order.insert(stamp, key);
        state.sync_stats();
        true
    }

    /// Retrieve a bitmap from the cache
    ///
    /// Counts as a use for LRU ordering and updates hit/miss statistics.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut state = self.state.lock();

        if let Some(value) = state.entries.get(key).map(|entry| entry.value.clone()) {
            state.touch(key);
            state.stats.hits += 1;
            Some(value)
        } else {
            state.stats.misses += 1;
            None
        }
    }

    /// Check if a key is cached without updating LRU tracking
    pub fn contains(&self, key: &K) -> bool {
        self.state.lock().entries.contains_key(key)
    }

    /// Remove an entry; no-op if the key is absent
    ///
    /// Returns the removed bitmap, if any.
    pub fn remove(&self, key: &K) -> Option<V> {
        self.state.lock().remove_entry(key).map(|entry| entry.value)
    }

    /// Remove every entry
    pub fn clear(&self) {
        let mut state = self.state.lock();
        let dropped = state.entries.len();
        state.entries.clear();
        state.order.clear();
        state.total_cost = 0;
        state.sync_stats();
        debug!("snapshot cache cleared ({} entries dropped)", dropped);
    }

    /// Get current cache statistics
    pub fn stats(&self) -> CacheStats {
        self.state.lock().stats
    }

    /// Current limits
    pub fn limits(&self) -> CacheLimits {
        self.state.lock().limits
    }

    /// Replace the limits
    ///
    /// Shrinking the limits evicts least recently used entries immediately.
    pub fn set_limits(&self, limits: CacheLimits) {
        let mut state = self.state.lock();
        state.limits = limits;
        state.stats.entry_limit = limits.entry_limit;
        state.stats.cost_limit = limits.cost_limit;
        state.evict_to_fit(0, 0);
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    /// Sum of the costs of all live entries in bytes
    pub fn total_cost(&self) -> usize {
        self.state.lock().total_cost
    }
}

impl<K, V> Default for SnapshotCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Raster + Clone,
{
    /// Create a cache with the default 150 entry / 10 MiB limits
    fn default() -> Self {
        Self::new(CacheLimits::default())
    }
}
