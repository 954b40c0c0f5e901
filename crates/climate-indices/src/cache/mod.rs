//! Caching layer for region masks.

mod mask_cache;

pub use mask_cache::{CacheStats, MaskCache, MaskKey};
