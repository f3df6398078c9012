//! Domain model served to the frontend.
//!
//! These are the normalized JSON shapes the HTTP layer returns. Field names
//! serialize as camelCase to keep the wire contract stable regardless of
//! Rust naming.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A normalized book record.
///
/// `rating_distribution` and `tags` are only populated by the details
/// pipeline; shelf listings leave them absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// External catalog identifier (kept as a string, the source is not
    /// strictly numeric)
    pub id: String,
    pub title: String,
    pub description: String,
    /// Canonical public URL for the book
    pub url: String,
    /// Ordered as the source lists them
    pub authors: Vec<Author>,
    /// `None` when the source field is absent or unparseable. Serialized as
    /// null, never coerced to 0.
    pub number_of_pages: Option<i64>,
    /// 0-100 scale (source 0-5 scale multiplied by 20)
    pub average_rating: f64,
    pub ratings_count: i64,
    pub text_reviews_count: i64,
    /// Publication year
    pub published: Option<i64>,
    /// Star bucket (1-5) to ratings count, details pipeline only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating_distribution: Option<BTreeMap<u8, i64>>,
    /// Curated community tags, at most 10, details pipeline only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// A normalized author record. Rating fields follow the same 0-100 policy
/// as [`Book`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: String,
    pub name: String,
    pub average_rating: f64,
    pub ratings_count: i64,
    pub text_reviews_count: i64,
}

/// Reading progress for a shelf entry.
///
/// Only built when the source start date parses; a book with an unparseable
/// start date has no `ReadStatus` at all rather than one with null fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadStatus {
    pub started_reading: DateTime<FixedOffset>,
    pub finished_reading: Option<DateTime<FixedOffset>>,
}

/// A fully merged shelf across all pages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShelfResult {
    /// Book ids in page order, then within-page order
    pub list: Vec<String>,
    pub books: BTreeMap<String, Book>,
    /// Keyed by book id; contains only entries with a valid status
    pub read_status: BTreeMap<String, ReadStatus>,
}
