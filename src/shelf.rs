//! Shelf pagination.
//!
//! Drives the catalog client across every page of a user's shelf and
//! merges the normalized pages into one result. Pagination is an iterative
//! loop so arbitrarily large shelves never grow the stack. Any page failure
//! aborts the whole fetch; there is no partial-shelf fallback.

use crate::api::CatalogClient;
use crate::models::{ReadStatus, ShelfResult};
use crate::normalize::BookNormalizer;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::info;

/// One normalized page of a shelf, plus the source's pagination verdict
#[derive(Debug, Clone)]
pub struct ShelfPage {
    pub result: ShelfResult,
    pub has_next_page: bool,
}

/// Fetches and merges all pages of a user's shelf
#[derive(Clone)]
pub struct ShelfPaginator {
    client: CatalogClient,
    normalizer: BookNormalizer,
    page_ttl: Duration,
}

impl ShelfPaginator {
    pub fn new(client: CatalogClient, normalizer: BookNormalizer, page_ttl: Duration) -> Self {
        Self {
            client,
            normalizer,
            page_ttl,
        }
    }

    /// Fetch and normalize a single shelf page
    pub async fn fetch_shelf_page(
        &self,
        user_id: &str,
        shelf: &str,
        page: u32,
    ) -> Result<ShelfPage> {
        let response = self
            .client
            .shelf_page(user_id, shelf, page, self.page_ttl)
            .await
            .with_context(|| format!("Failed to fetch shelf page {} for user {}", page, user_id))?;

        let mut result = ShelfResult::default();
        let mut read_status: BTreeMap<String, ReadStatus> = BTreeMap::new();

        for review in &response.reviews.reviews {
            let book = self.normalizer.normalize_shelf_entry(review);
            if let Some(status) = self.normalizer.read_status(review) {
                read_status.insert(book.id.clone(), status);
            }
            result.list.push(book.id.clone());
            result.books.insert(book.id.clone(), book);
        }
        result.read_status = read_status;

        Ok(ShelfPage {
            has_next_page: response.reviews.has_next_page(),
            result,
        })
    }

    /// Fetch every page of a shelf and merge into one [`ShelfResult`].
    ///
    /// Lists concatenate in page order; maps merge with later pages winning
    /// on key collision (collisions are not expected in practice).
    pub async fn fetch_shelf(&self, user_id: &str, shelf: &str) -> Result<ShelfResult> {
        let mut merged = ShelfResult::default();
        let mut page = 1;

        loop {
            let fetched = self.fetch_shelf_page(user_id, shelf, page).await?;

            merged.list.extend(fetched.result.list);
            merged.books.extend(fetched.result.books);
            merged.read_status.extend(fetched.result.read_status);

            if !fetched.has_next_page {
                break;
            }
            page += 1;
        }

        info!(
            user_id = user_id,
            shelf = shelf,
            pages = page,
            books = merged.list.len(),
            "Shelf fetch complete"
        );

        Ok(merged)
    }
}
