//! Shared cache of region masks per grid layout.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use climate_common::{ClimateError, ClimateResult, GridKey};
use serde::Serialize;

use crate::mask::RegionMask;

/// Cache key for masks: region identity plus the grid's spatial layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MaskKey {
    /// Region name, reported in `EmptyMask` errors.
    pub region: String,
    /// Anything else that changes the mask for the same name and grid
    /// (biome source, clipping box).
    pub variant: String,
    pub grid: GridKey,
}

/// Statistics about the mask cache.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

impl CacheStats {
    /// Calculate the cache hit rate (0.0 - 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Memoised masks, safe to share between concurrent model workers.
///
/// Region geometry never changes during a run but models come on different
/// grids, so masks are built once per (region, grid layout). Empty results
/// are remembered too and replayed as `EmptyMask`.
#[derive(Debug, Default)]
pub struct MaskCache {
    masks: RwLock<HashMap<MaskKey, Option<Arc<RegionMask>>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MaskCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached mask for `key`, building it on a miss.
    ///
    /// `build` errors other than `EmptyMask` are returned without being
    /// cached.
    pub fn get_or_build<F>(&self, key: MaskKey, build: F) -> ClimateResult<Arc<RegionMask>>
    where
        F: FnOnce() -> ClimateResult<RegionMask>,
    {
        if let Some(entry) = self.lookup(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return entry.ok_or_else(|| ClimateError::empty_mask(&key.region));
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let entry = match build() {
            Ok(mask) => Some(Arc::new(mask)),
            Err(ClimateError::EmptyMask { .. }) => None,
            Err(e) => return Err(e),
        };

        let stored = match self.masks.write() {
            Ok(mut masks) => masks.entry(key.clone()).or_insert(entry).clone(),
            // A poisoned lock only loses memoisation; the mask is still valid.
            Err(_) => entry,
        };
        stored.ok_or_else(|| ClimateError::empty_mask(&key.region))
    }

    fn lookup(&self, key: &MaskKey) -> Option<Option<Arc<RegionMask>>> {
        self.masks.read().ok()?.get(key).cloned()
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }

    /// Get the number of entries in the cache.
    pub fn len(&self) -> usize {
        self.masks.read().map(|m| m.len()).unwrap_or(0)
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear all entries from the cache.
    pub fn clear(&self) {
        if let Ok(mut masks) = self.masks.write() {
            masks.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use climate_common::BoundingBox;
    use test_utils::regular_grid;

    fn key(region: &str, grid: GridKey) -> MaskKey {
        MaskKey {
            region: region.to_string(),
            variant: String::new(),
            grid,
        }
    }

    #[test]
    fn test_cache_builds_once_per_grid() {
        let cache = MaskCache::new();
        let grid = regular_grid(0.0, 3.0, 0.0, 3.0, 1.0, 2000, 1);
        let bbox = BoundingBox::new(0.0, 1.0, 0.0, 1.0);

        let mut builds = 0;
        for _ in 0..3 {
            let mask = cache
                .get_or_build(key("a", grid.key()), || {
                    builds += 1;
                    RegionMask::from_bbox(&grid, &bbox, "a")
                })
                .unwrap();
            assert_eq!(mask.count(), 4);
        }

        assert_eq!(builds, 1);
        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
        assert!((stats.hit_rate() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_different_resolution_is_a_separate_entry() {
        let cache = MaskCache::new();
        let coarse = regular_grid(0.0, 4.0, 0.0, 4.0, 1.0, 2000, 1);
        let fine = regular_grid(0.0, 4.0, 0.0, 4.0, 0.5, 2000, 1);
        let bbox = BoundingBox::new(0.0, 1.0, 0.0, 1.0);

        let a = cache
            .get_or_build(key("a", coarse.key()), || RegionMask::from_bbox(&coarse, &bbox, "a"))
            .unwrap();
        let b = cache
            .get_or_build(key("a", fine.key()), || RegionMask::from_bbox(&fine, &bbox, "a"))
            .unwrap();
        assert_eq!(a.count(), 4);
        assert_eq!(b.count(), 9);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_empty_mask_is_remembered() {
        let cache = MaskCache::new();
        let grid = regular_grid(0.0, 3.0, 0.0, 3.0, 1.0, 2000, 1);
        let far = BoundingBox::new(50.0, 60.0, 0.0, 1.0);

        for _ in 0..2 {
            let err = cache
                .get_or_build(key("far", grid.key()), || RegionMask::from_bbox(&grid, &far, "far"))
                .unwrap_err();
            assert!(matches!(err, ClimateError::EmptyMask { .. }));
        }
        assert_eq!(cache.stats().misses, 1);
    }
}
