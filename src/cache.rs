//! Cache-aside store for parsed API responses.
//!
//! Values are JSON-serialized documents keyed by `"<namespace>:<url>"` with
//! a per-entry TTL. The backing store is pluggable: Redis in production, an
//! in-process map in tests. Disabling the store turns every read into a
//! miss without touching the backend, but writes still go through, so the
//! cache keeps populating while stale data is never served.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// A key/value backend with per-entry expiry
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Fetch the raw serialized value, or `None` on miss/expiry
    async fn get_raw(&self, key: &str) -> Result<Option<String>>;

    /// Store a value, unconditionally overwriting any existing entry
    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;
}

/// Redis-backed cache using a multiplexed async connection
pub struct RedisBackend {
    conn: redis::aio::MultiplexedConnection,
}

impl RedisBackend {
    /// Connect to the Redis instance at `url`
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .with_context(|| format!("Invalid Redis URL: {}", url))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .context("Failed to connect to Redis")?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    async fn get_raw(&self, key: &str) -> Result<Option<String>> {
        use redis::AsyncCommands;
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await.context("Redis GET failed")?;
        Ok(value)
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        use redis::AsyncCommands;
        let mut conn = self.conn.clone();
        // Redis expiry granularity is seconds; never store without one
        let seconds = ttl.as_secs().max(1);
        let _: () = conn
            .set_ex(key, value, seconds)
            .await
            .context("Redis SETEX failed")?;
        Ok(())
    }
}

/// In-process backend for tests and cache-less deployments
#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .await
            .values()
            .filter(|(_, expires)| *expires > now)
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some((value, expires)) if *expires > Instant::now() => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(())
    }
}

/// Cache-aside store wrapping a [`CacheBackend`] with a namespace and an
/// enabled flag
#[derive(Clone)]
pub struct CacheStore {
    backend: Arc<dyn CacheBackend>,
    namespace: String,
    enabled: bool,
}

impl CacheStore {
    pub fn new(backend: Arc<dyn CacheBackend>, namespace: impl Into<String>, enabled: bool) -> Self {
        Self {
            backend,
            namespace: namespace.into(),
            enabled,
        }
    }

    /// Full backend key for a cache key
    fn namespaced(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }

    /// Get the deserialized value for `key`.
    ///
    /// Always a miss when the store is disabled; the backend read path is
    /// not touched at all in that case.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        if !self.enabled {
            return Ok(None);
        }

        let namespaced = self.namespaced(key);
        let raw = self.backend.get_raw(&namespaced).await?;

        match raw {
            Some(content) => {
                let value: T = serde_json::from_str(&content)
                    .with_context(|| format!("Failed to parse cached value for {}", namespaced))?;
                debug!(key = key, "Cache hit");
                Ok(Some(value))
            }
            None => {
                debug!(key = key, "Cache miss");
                Ok(None)
            }
        }
    }

    /// Store a value with the given TTL, overwriting any existing entry.
    ///
    /// Writes happen even when the store is disabled; disabling only stops
    /// serving cached data, not populating it.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let content = serde_json::to_string(value).context("Failed to serialize cache value")?;
        self.backend
            .set_raw(&self.namespaced(key), &content, ttl)
            .await?;
        debug!(key = key, ttl_secs = ttl.as_secs(), "Cache stored");
        Ok(())
    }
}
