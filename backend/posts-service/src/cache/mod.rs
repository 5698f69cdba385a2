/// Rendered-page caching layer
///
/// This module provides:
/// - `PageCache`, a string cache with per-entry expiry
/// - Redis and in-process implementations
/// - `cached_page`, the read-through helper used by cached views
pub mod page_cache;

pub use page_cache::{cached_page, page_key, MemoryPageCache, PageCache, RedisPageCache};
