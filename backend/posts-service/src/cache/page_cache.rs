use async_trait::async_trait;
use dashmap::DashMap;
use redis::{aio::ConnectionManager, AsyncCommands};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::error::{AppError, Result};
use crate::metrics::{PAGE_CACHE_EVENTS, PAGE_CACHE_WRITE_TOTAL};

/// Storage for rendered pages. Entries expire on their own; nothing is
/// invalidated on write.
#[async_trait]
pub trait PageCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, body: &str, ttl: Duration) -> Result<()>;

    /// Drop every entry whose key starts with `prefix`.
    async fn clear(&self, prefix: &str) -> Result<()>;
}

/// Cache key for a page: the configured prefix plus path and query string.
pub fn page_key(prefix: &str, path_and_query: &str) -> String {
    format!("{}:{}", prefix, path_and_query)
}

/// Return the cached body for `key`, or render, store and return it.
///
/// Cache failures are logged and the page is rendered uncached.
pub async fn cached_page<F, Fut>(
    cache: &dyn PageCache,
    key: &str,
    ttl: Duration,
    render: F,
) -> Result<String>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<String>>,
{
    match cache.get(key).await {
        Ok(Some(body)) => {
            debug!("Page cache HIT for {}", key);
            PAGE_CACHE_EVENTS.with_label_values(&["hit"]).inc();
            return Ok(body);
        }
        Ok(None) => {
            debug!("Page cache MISS for {}", key);
            PAGE_CACHE_EVENTS.with_label_values(&["miss"]).inc();
        }
        Err(e) => {
            warn!("Page cache read error for {}: {}", key, e);
            PAGE_CACHE_EVENTS.with_label_values(&["error"]).inc();
        }
    }

    let body = render().await?;

    match cache.set(key, &body, ttl).await {
        Ok(()) => {
            PAGE_CACHE_WRITE_TOTAL.with_label_values(&["success"]).inc();
        }
        Err(e) => {
            warn!("Failed to write page cache for {}: {}", key, e);
            PAGE_CACHE_WRITE_TOTAL.with_label_values(&["error"]).inc();
        }
    }

    Ok(body)
}

/// Page cache using Redis
#[derive(Clone)]
pub struct RedisPageCache {
    redis: ConnectionManager,
}

impl RedisPageCache {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }

    /// Connect and build a connection manager for `url`.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self::new(manager))
    }
}

#[async_trait]
impl PageCache for RedisPageCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.redis.clone();
        conn.get::<_, Option<String>>(key)
            .await
            .map_err(|e| AppError::CacheError(e.to_string()))
    }

    async fn set(&self, key: &str, body: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.redis.clone();
        conn.set_ex::<_, _, ()>(key, body, ttl.as_secs().max(1))
            .await
            .map_err(|e| AppError::CacheError(e.to_string()))?;

        debug!("Page cache WRITE for {} with TTL {:?}", key, ttl);
        Ok(())
    }

    async fn clear(&self, prefix: &str) -> Result<()> {
        let mut conn = self.redis.clone();
        let pattern = format!("{}*", prefix);
        let mut cursor: u64 = 0;
        let mut removed = 0usize;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await?;

            if !keys.is_empty() {
                removed += keys.len();
                conn.del::<_, ()>(keys).await?;
            }
            if next == 0 {
                break;
            }
            cursor = next;
        }

        debug!("Page cache CLEAR {} ({} keys)", prefix, removed);
        Ok(())
    }
}

/// Upper bound on live entries held by `MemoryPageCache`.
pub const MEMORY_CACHE_MAX_ENTRIES: usize = 10_000;

/// In-process page cache. Expired entries are swept on every write and the
/// number of live entries is capped.
#[derive(Debug)]
pub struct MemoryPageCache {
    entries: DashMap<String, (Instant, String)>,
    max_entries: usize,
}

impl Default for MemoryPageCache {
    fn default() -> Self {
        Self::with_capacity(MEMORY_CACHE_MAX_ENTRIES)
    }
}

impl MemoryPageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries: max_entries.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl PageCache for MemoryPageCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Instant::now();
        let hit = self
            .entries
            .get(key)
            .filter(|entry| entry.0 > now)
            .map(|entry| entry.1.clone());

        if hit.is_none() {
            self.entries.remove_if(key, |_, (expires, _)| *expires <= now);
        }
        Ok(hit)
    }

    async fn set(&self, key: &str, body: &str, ttl: Duration) -> Result<()> {
        let now = Instant::now();
        self.entries.retain(|_, (expires, _)| *expires > now);

        if self.entries.len() >= self.max_entries && !self.entries.contains_key(key) {
            debug!(
                "Page cache full ({} entries); not storing {}",
                self.entries.len(),
                key
            );
            return Ok(());
        }

        self.entries
            .insert(key.to_string(), (now + ttl, body.to_string()));
        Ok(())
    }

    async fn clear(&self, prefix: &str) -> Result<()> {
        self.entries.retain(|key, _| !key.starts_with(prefix));
        Ok(())
    }
}
