//! Normalization of raw catalog XML into the domain model.
//!
//! Two policies live here: shelf-entry normalization (listing fields plus
//! the read-status date gate) and detail-page normalization (tag curation
//! and rating-distribution parsing on top of the shared field rules).
//!
//! The canonical rating policy: the source scores on a 0-5 scale, we serve
//! 0-100, so ratings are multiplied by 20. Integer fields that fail to
//! parse stay absent (`None`) rather than turning into 0.

use crate::api::types::{AuthorRecord, BookRecord, Review, ShelfTag};
use crate::models::{Author, Book, ReadStatus};
use chrono::{DateTime, Datelike, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Source date format for started/finished reading timestamps,
/// e.g. `Mon Jan 02 10:26:57 -0800 2023`
const READ_DATE_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

/// Reading-status, ownership, and meta labels that are noise as book tags
static DEFAULT_STOPLIST: Lazy<Vec<String>> = Lazy::new(|| {
    [
        "to-read",
        "currently-reading",
        "read",
        "owned",
        "owned-books",
        "books-i-own",
        "my-books",
        "my-library",
        "library",
        "favorites",
        "favourites",
        "wish-list",
        "wishlist",
        "to-buy",
        "kindle",
        "ebook",
        "ebooks",
        "audiobook",
        "audiobooks",
        "default",
        "all-time-favorites",
    ]
    .into_iter()
    .map(String::from)
    .collect()
});

/// Near-duplicate spellings collapsed to one canonical tag
static DEFAULT_SYNONYMS: Lazy<BTreeMap<String, String>> = Lazy::new(|| {
    [
        ("non-fiction", "nonfiction"),
        ("non-fiction-", "nonfiction"),
        ("nonfiction-", "nonfiction"),
        ("sci-fi", "science-fiction"),
        ("scifi", "science-fiction"),
        ("sf", "science-fiction"),
        ("ya", "young-adult"),
        ("biographies", "biography"),
        ("memoirs", "memoir"),
    ]
    .into_iter()
    .map(|(a, b)| (a.to_string(), b.to_string()))
    .collect()
});

/// Tag curation rules for the details normalizer.
///
/// Owned as data rather than inline literals so the lists can evolve via
/// configuration without code changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurationRules {
    /// A tag must be used by more than this many taggers to survive
    pub min_taggers: i64,

    /// Maximum surviving tags, in filtered order
    pub max_tags: usize,

    /// Labels dropped outright
    pub stoplist: Vec<String>,

    /// Spelling variants mapped to their canonical tag
    pub synonyms: BTreeMap<String, String>,
}

impl Default for CurationRules {
    fn default() -> Self {
        Self {
            min_taggers: 1,
            max_tags: 10,
            stoplist: DEFAULT_STOPLIST.clone(),
            synonyms: DEFAULT_SYNONYMS.clone(),
        }
    }
}

/// Maps raw parsed XML into domain records
#[derive(Debug, Clone)]
pub struct BookNormalizer {
    /// Catalog site base URL, used for canonical book URLs
    site_url: String,
    rules: CurationRules,
}

impl BookNormalizer {
    pub fn new(site_url: impl Into<String>, rules: CurationRules) -> Self {
        Self {
            site_url: site_url.into().trim_end_matches('/').to_string(),
            rules,
        }
    }

    /// Canonical public URL for a book id
    pub fn book_url(&self, book_id: &str) -> String {
        format!("{}/book/show/{}", self.site_url, book_id)
    }

    /// Shelf policy: normalize one listing entry into a [`Book`].
    ///
    /// Detail-only fields (tags, rating distribution) stay absent.
    pub fn normalize_shelf_entry(&self, review: &Review) -> Book {
        let book = &review.book;
        let id = book.id.as_str().to_string();

        Book {
            url: self.book_url(&id),
            id,
            title: book.title.as_str().to_string(),
            description: book.description.as_str().to_string(),
            authors: book
                .authors
                .authors
                .iter()
                .map(|a| self.normalize_author(a))
                .collect(),
            number_of_pages: parse_int(book.num_pages.as_str()),
            average_rating: normalize_rating(book.average_rating.as_str()),
            ratings_count: parse_count(book.ratings_count.as_str()),
            text_reviews_count: parse_count(book.text_reviews_count.as_str()),
            published: parse_int(book.publication_year.as_str()),
            rating_distribution: None,
            tags: None,
        }
    }

    /// Build the read status for a shelf entry.
    ///
    /// `None` unless the start date parses in the source's fixed format;
    /// there is no partially-filled status.
    pub fn read_status(&self, review: &Review) -> Option<ReadStatus> {
        let started = parse_read_date(review.started_at.as_str())?;
        Some(ReadStatus {
            started_reading: started,
            finished_reading: parse_read_date(review.read_at.as_str()),
        })
    }

    /// Detail policy: normalize a details document into a [`Book`] with
    /// curated tags and the parsed rating distribution.
    pub fn normalize_details(&self, book: &BookRecord) -> Book {
        self.normalize_details_at(book, Utc::now().year())
    }

    fn normalize_details_at(&self, book: &BookRecord, current_year: i32) -> Book {
        let id = book.id.as_str().to_string();

        Book {
            url: self.book_url(&id),
            id,
            title: book.title.as_str().to_string(),
            description: book.description.as_str().to_string(),
            authors: book
                .authors
                .authors
                .iter()
                .map(|a| self.normalize_author(a))
                .collect(),
            number_of_pages: parse_int(book.num_pages.as_str()),
            average_rating: normalize_rating(book.average_rating.as_str()),
            ratings_count: parse_count(book.ratings_count.as_str()),
            text_reviews_count: parse_count(book.text_reviews_count.as_str()),
            published: parse_int(book.work.original_publication_year.as_str()),
            rating_distribution: Some(parse_rating_distribution(book.work.rating_dist.as_str())),
            tags: Some(self.curate_tags(&book.popular_shelves.shelves, current_year)),
        }
    }

    fn normalize_author(&self, author: &AuthorRecord) -> Author {
        Author {
            id: author.id.as_str().to_string(),
            name: author.name.as_str().to_string(),
            average_rating: normalize_rating(author.average_rating.as_str()),
            ratings_count: parse_count(author.ratings_count.as_str()),
            text_reviews_count: parse_count(author.text_reviews_count.as_str()),
        }
    }

    /// Curate the community tag listing.
    ///
    /// In order: drop tags with too few taggers, stoplisted labels, and
    /// stale `read-in-<year>` style tags mentioning the current year; then
    /// collapse synonym spellings (first occurrence wins) and cap the list.
    fn curate_tags(&self, shelves: &[ShelfTag], current_year: i32) -> Vec<String> {
        let year = current_year.to_string();
        let mut tags: Vec<String> = Vec::new();

        for shelf in shelves {
            if shelf.taggers() <= self.rules.min_taggers {
                continue;
            }
            let name = shelf.name.trim();
            if name.is_empty() || self.rules.stoplist.iter().any(|s| s == name) {
                continue;
            }
            if name.contains(&year) {
                continue;
            }

            let canonical = self
                .rules
                .synonyms
                .get(name)
                .cloned()
                .unwrap_or_else(|| name.to_string());

            if !tags.contains(&canonical) {
                tags.push(canonical);
            }
            if tags.len() >= self.rules.max_tags {
                break;
            }
        }

        tags
    }
}

/// Integer parse that keeps absence absent: an unparseable or missing field
/// is `None`, never 0.
fn parse_int(raw: &str) -> Option<i64> {
    raw.parse().ok()
}

/// Counter parse matching the source's zero-default behavior
fn parse_count(raw: &str) -> i64 {
    raw.parse().unwrap_or(0)
}

/// Canonical rating normalization: 0-5 source scale onto 0-100
fn normalize_rating(raw: &str) -> f64 {
    raw.parse::<f64>().unwrap_or(0.0) * 20.0
}

fn parse_read_date(raw: &str) -> Option<DateTime<chrono::FixedOffset>> {
    DateTime::parse_from_str(raw, READ_DATE_FORMAT).ok()
}

/// Parse the packed `bucket:count|bucket:count|...` rating distribution,
/// keeping only the 1-5 star buckets (the source appends a `total` pair).
fn parse_rating_distribution(raw: &str) -> BTreeMap<u8, i64> {
    raw.split('|')
        .filter_map(|pair| {
            let (bucket, count) = pair.split_once(':')?;
            let bucket: u8 = bucket.trim().parse().ok()?;
            if !(1..=5).contains(&bucket) {
                return None;
            }
            let count: i64 = count.trim().parse().ok()?;
            Some((bucket, count))
        })
        .collect()
}
