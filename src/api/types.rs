//! Raw XML wire types for the catalog API.
//!
//! These mirror the source documents as quick-xml deserializes them; the
//! normalizer turns them into the domain model. Most leaf elements carry
//! attributes (`type="integer"`, `nil="true"`) inconsistently, so scalar
//! fields decode through [`TextValue`] rather than plain strings. The root
//! element name is not checked, matching the source's single response
//! envelope.

use serde::{Deserialize, Serialize};

/// A leaf element's text content, tolerant of attributes and emptiness
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TextValue {
    #[serde(rename = "$text", default)]
    pub value: Option<String>,
}

impl TextValue {
    /// The trimmed text, or `""` for an empty element
    pub fn as_str(&self) -> &str {
        self.value.as_deref().map(str::trim).unwrap_or("")
    }

    #[cfg(test)]
    pub fn from(s: &str) -> Self {
        Self {
            value: Some(s.to_string()),
        }
    }
}

/// Shelf listing response envelope
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShelfResponse {
    #[serde(default)]
    pub reviews: ReviewsPage,
}

/// One page of shelf reviews, with the source's position counters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewsPage {
    #[serde(rename = "@start", default)]
    pub start: Option<String>,
    #[serde(rename = "@end", default)]
    pub end: Option<String>,
    #[serde(rename = "@total", default)]
    pub total: Option<String>,
    #[serde(rename = "review", default)]
    pub reviews: Vec<Review>,
}

impl ReviewsPage {
    fn counter(raw: &Option<String>) -> Option<i64> {
        raw.as_deref().and_then(|s| s.trim().parse().ok())
    }

    /// Whether the source reports more entries beyond this page.
    ///
    /// False when either counter is missing or unparseable.
    pub fn has_next_page(&self) -> bool {
        match (Self::counter(&self.end), Self::counter(&self.total)) {
            (Some(end), Some(total)) => end < total,
            _ => false,
        }
    }
}

/// A single shelf entry: the book plus the reader's progress dates
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Review {
    #[serde(default)]
    pub book: ShelfBook,
    #[serde(default)]
    pub started_at: TextValue,
    #[serde(default)]
    pub read_at: TextValue,
}

/// Book fields as they appear inside a shelf review
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShelfBook {
    #[serde(default)]
    pub id: TextValue,
    #[serde(default)]
    pub title: TextValue,
    #[serde(default)]
    pub description: TextValue,
    #[serde(default)]
    pub num_pages: TextValue,
    #[serde(default)]
    pub publication_year: TextValue,
    #[serde(default)]
    pub average_rating: TextValue,
    #[serde(default)]
    pub ratings_count: TextValue,
    #[serde(default)]
    pub text_reviews_count: TextValue,
    #[serde(default)]
    pub authors: Authors,
}

/// Wrapper element around the author list
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Authors {
    #[serde(rename = "author", default)]
    pub authors: Vec<AuthorRecord>,
}

/// A raw author record, shared by both query shapes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorRecord {
    #[serde(default)]
    pub id: TextValue,
    #[serde(default)]
    pub name: TextValue,
    #[serde(default)]
    pub average_rating: TextValue,
    #[serde(default)]
    pub ratings_count: TextValue,
    #[serde(default)]
    pub text_reviews_count: TextValue,
}

/// Book details response envelope
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookDetailsResponse {
    #[serde(default)]
    pub book: BookRecord,
}

/// Full book record from the details endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookRecord {
    #[serde(default)]
    pub id: TextValue,
    #[serde(default)]
    pub title: TextValue,
    #[serde(default)]
    pub description: TextValue,
    #[serde(default)]
    pub num_pages: TextValue,
    #[serde(default)]
    pub average_rating: TextValue,
    #[serde(default)]
    pub ratings_count: TextValue,
    #[serde(default)]
    pub text_reviews_count: TextValue,
    #[serde(default)]
    pub authors: Authors,
    #[serde(default)]
    pub work: WorkRecord,
    #[serde(default)]
    pub popular_shelves: PopularShelves,
}

/// The underlying work: canonical edition, first-publication year, and the
/// packed rating distribution
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkRecord {
    #[serde(default)]
    pub best_book_id: TextValue,
    #[serde(default)]
    pub original_publication_year: TextValue,
    #[serde(default)]
    pub rating_dist: TextValue,
}

/// Uncurated community tag listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PopularShelves {
    #[serde(rename = "shelf", default)]
    pub shelves: Vec<ShelfTag>,
}

/// A community tag with its tagger count (both are attributes in the source)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShelfTag {
    #[serde(rename = "@name", default)]
    pub name: String,
    #[serde(rename = "@count", default)]
    pub count: String,
}

impl ShelfTag {
    /// Tagger count, 0 when unparseable
    pub fn taggers(&self) -> i64 {
        self.count.trim().parse().unwrap_or(0)
    }

    #[cfg(test)]
    pub fn new(name: &str, count: i64) -> Self {
        Self {
            name: name.to_string(),
            count: count.to_string(),
        }
    }
}
