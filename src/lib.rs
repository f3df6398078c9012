//! Goodreads proxy pipeline.
//!
//! Fetches a reader's book-shelf and book-detail records from the Goodreads
//! XML API, normalizes them into a stable JSON shape, and exposes the two
//! operations a frontend-serving HTTP layer consumes: a merged shelf fetch
//! and a batch book-details fetch. Outbound calls are rate limited and
//! cached (cache-aside, Redis-backed).

pub mod api;
pub mod cache;
pub mod config;
pub mod details;
pub mod error;
pub mod logging;
pub mod models;
pub mod normalize;
pub mod shelf;

pub use api::{CatalogClient, RateLimiter};
pub use cache::{CacheBackend, CacheStore, MemoryBackend, RedisBackend};
pub use config::Config;
pub use details::{BookDetailsPipeline, MAX_BATCH_SIZE};
pub use error::ApiError;
pub use models::{Author, Book, ReadStatus, ShelfResult};
pub use normalize::{BookNormalizer, CurationRules};
pub use shelf::{ShelfPage, ShelfPaginator};

/// Common result type using anyhow::Error
pub type Result<T> = anyhow::Result<T>;
