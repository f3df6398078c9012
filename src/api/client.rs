//! Catalog API client.
//!
//! One fetch-or-serve-cached primitive: consult the cache store, and on a
//! miss acquire a rate-limiter slot, issue the HTTP GET, parse the XML body
//! into a typed document, and repopulate the cache. Concurrent callers for
//! the same URL coalesce onto a single outbound fetch through a per-key
//! lock: the second caller acquires the lock after the first completes and
//! finds the document already cached.

use super::rate_limiter::RateLimiter;
use super::types::{BookDetailsResponse, ShelfResponse};
use crate::cache::CacheStore;
use crate::error::ApiError;
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Fixed page size for shelf listing requests
pub const SHELF_PAGE_SIZE: u32 = 200;

/// Per-key lock table that coalesces concurrent identical fetches
#[derive(Default)]
struct RequestCoalescer {
    inflight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl RequestCoalescer {
    async fn acquire(&self, key: &str) -> tokio::sync::OwnedMutexGuard<()> {
        let lock = {
            let mut inflight = self.inflight.lock().await;
            Arc::clone(
                inflight
                    .entry(key.to_string())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        lock.lock_owned().await
    }
}

/// Rate-limited, cache-aside client for the catalog XML API
#[derive(Clone)]
pub struct CatalogClient {
    http: Client,
    base_url: String,
    api_key: String,
    limiter: Arc<RateLimiter>,
    cache: CacheStore,
    coalescer: Arc<RequestCoalescer>,
}

impl CatalogClient {
    /// Create a new client.
    ///
    /// The rate limiter and cache store are injected so callers can share
    /// them across pipelines and substitute fakes in tests.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        limiter: Arc<RateLimiter>,
        cache: CacheStore,
    ) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("goodreads-proxy/0.1.0")
            .build()
            .map_err(ApiError::Network)?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            limiter,
            cache,
            coalescer: Arc::new(RequestCoalescer::default()),
        })
    }

    /// Fetch a URL as a parsed XML document, serving from cache when possible.
    pub async fn request<T>(&self, url: &str, ttl: Duration) -> Result<T, ApiError>
    where
        T: DeserializeOwned + Serialize,
    {
        // Cache hit: no rate-limiter slot, no network call
        if let Some(doc) = self.cache.get::<T>(url).await.map_err(ApiError::Cache)? {
            return Ok(doc);
        }

        // Coalesce concurrent misses for the same URL onto one fetch
        let _guard = self.coalescer.acquire(url).await;
        if let Some(doc) = self.cache.get::<T>(url).await.map_err(ApiError::Cache)? {
            debug!(url = %url, "Served by coalesced fetch");
            return Ok(doc);
        }

        self.limiter.acquire().await;
        debug!(url = %url, "Fetching from catalog API");

        let response = self.http.get(url).send().await?.error_for_status()?;
        let body = response.text().await?;

        let doc: T = quick_xml::de::from_str(&body).map_err(|e| {
            warn!(url = %url, error = %e, "Response was not well-formed XML");
            ApiError::Parse(e)
        })?;

        self.cache
            .set(url, &doc, ttl)
            .await
            .map_err(ApiError::Cache)?;

        Ok(doc)
    }

    /// Fetch one page of a user's shelf listing.
    ///
    /// The source omits its `page` parameter for the first page, so the
    /// cache key for page 1 stays stable either way.
    pub async fn shelf_page(
        &self,
        user_id: &str,
        shelf: &str,
        page: u32,
        ttl: Duration,
    ) -> Result<ShelfResponse, ApiError> {
        let mut url = format!(
            "{}/review/list/{}.xml?key={}&v=2&per_page={}&shelf={}",
            self.base_url, user_id, self.api_key, SHELF_PAGE_SIZE, shelf
        );
        if page > 1 {
            url.push_str(&format!("&page={}", page));
        }
        self.request(&url, ttl).await
    }

    /// Fetch the details document for a single book
    pub async fn book_details(
        &self,
        book_id: &str,
        ttl: Duration,
    ) -> Result<BookDetailsResponse, ApiError> {
        let url = format!(
            "{}/book/show/{}.xml?key={}",
            self.base_url, book_id, self.api_key
        );
        self.request(&url, ttl).await
    }
}
