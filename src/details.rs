//! Book details pipeline.
//!
//! Fetches and normalizes a single book's detail document, resolving the
//! work's canonical edition, plus a batch wrapper that looks up many ids
//! concurrently and never fails as a whole.

use crate::api::CatalogClient;
use crate::models::Book;
use crate::normalize::BookNormalizer;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Batch lookups are capped to this many ids; the remainder is dropped
pub const MAX_BATCH_SIZE: usize = 50;

/// Fetches normalized book details, one id or a batch at a time
#[derive(Clone)]
pub struct BookDetailsPipeline {
    client: CatalogClient,
    normalizer: BookNormalizer,
    details_ttl: Duration,
}

impl BookDetailsPipeline {
    pub fn new(client: CatalogClient, normalizer: BookNormalizer, details_ttl: Duration) -> Self {
        Self {
            client,
            normalizer,
            details_ttl,
        }
    }

    /// Fetch and normalize the details for one book.
    ///
    /// When the document names a different best/canonical edition for the
    /// underlying work, that edition's document is fetched and used as the
    /// authoritative data, but the result stays keyed under the originally
    /// requested id.
    pub async fn fetch_book_details(&self, book_id: &str) -> Result<Book> {
        let document = self
            .client
            .book_details(book_id, self.details_ttl)
            .await
            .with_context(|| format!("Failed to fetch details for book {}", book_id))?;

        let canonical_id = document.book.work.best_book_id.as_str().to_string();
        let document = if !canonical_id.is_empty() && canonical_id != book_id {
            debug!(
                book_id = book_id,
                canonical_id = %canonical_id,
                "Resolving canonical edition"
            );
            self.client
                .book_details(&canonical_id, self.details_ttl)
                .await
                .with_context(|| {
                    format!(
                        "Failed to fetch canonical edition {} for book {}",
                        canonical_id, book_id
                    )
                })?
        } else {
            document
        };

        let mut book = self.normalizer.normalize_details(&document.book);
        // Keyed under the id the caller asked for, not the canonical edition
        book.id = book_id.to_string();
        book.url = self.normalizer.book_url(book_id);

        Ok(book)
    }

    /// Fetch details for up to [`MAX_BATCH_SIZE`] ids concurrently.
    ///
    /// Every id is looked up independently; a failing id is logged and
    /// omitted from the result map, and the batch itself always resolves.
    /// Concurrency is bounded only by the shared rate limiter.
    pub async fn fetch_many(&self, book_ids: &[String]) -> BTreeMap<String, Book> {
        let capped = &book_ids[..book_ids.len().min(MAX_BATCH_SIZE)];
        if capped.len() < book_ids.len() {
            warn!(
                requested = book_ids.len(),
                cap = MAX_BATCH_SIZE,
                "Batch truncated"
            );
        }

        let mut handles = Vec::with_capacity(capped.len());
        for id in capped {
            let pipeline = self.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                let result = pipeline.fetch_book_details(&id).await;
                (id, result)
            }));
        }

        let mut books = BTreeMap::new();
        for handle in handles {
            match handle.await {
                Ok((id, Ok(book))) => {
                    books.insert(id, book);
                }
                Ok((id, Err(e))) => {
                    warn!(book_id = %id, error = %e, "Dropping failed batch entry");
                }
                Err(e) => {
                    warn!(error = %e, "Batch lookup task panicked");
                }
            }
        }

        books
    }
}
