//! Error taxonomy for the API access pipeline.
//!
//! Failures fall into two outward-facing classes: the network call failed,
//! or the response body was not well-formed XML. The boundary layer maps
//! either one to a null-data response; nothing here retries.

use thiserror::Error;

/// Errors produced by [`crate::api::CatalogClient`]
#[derive(Debug, Error)]
pub enum ApiError {
    /// The outbound HTTP call failed (connect, timeout, or non-2xx status)
    #[error("network request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// The response body could not be parsed as XML
    #[error("malformed XML response: {0}")]
    Parse(#[from] quick_xml::DeError),

    /// The cache backend failed to read or write
    #[error("cache store error: {0}")]
    Cache(#[source] anyhow::Error),
}

impl ApiError {
    /// True when the failure happened before any response body was parsed
    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::Network(_))
    }

    /// True when the response arrived but was not valid XML
    pub fn is_parse(&self) -> bool {
        matches!(self, ApiError::Parse(_))
    }
}
