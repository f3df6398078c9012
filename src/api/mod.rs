//! Catalog API access: rate limiting, cache-aside fetching, and the raw
//! XML wire types.

pub mod client;
pub mod rate_limiter;
pub mod types;

pub use client::{CatalogClient, SHELF_PAGE_SIZE};
pub use rate_limiter::RateLimiter;
