//! Error types for every layer of the crate.
//!
//! Each client wraps [`FetchError`] in its own error so callers can tell which
//! upstream failed, while still reaching the transport cause through
//! [`std::error::Error::source`].

use thiserror::Error;

/// Failure while fetching or decoding a JSON document.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection, TLS or protocol failure.
    #[error("HTTP request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Upstream answered with a non-success status.
    #[error("HTTP request to {url} returned status {status}")]
    Status { url: String, status: u16 },

    /// Body was not valid JSON.
    #[error("invalid JSON from {url}: {source} (body: {preview})")]
    Decode {
        url: String,
        preview: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Malformed date strings, time tuples or output formats.
#[derive(Debug, Error)]
pub enum DateError {
    #[error("unrecognized date string: {0:?}")]
    Unparseable(String),

    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: i64 },

    #[error("time tuple must have 9 fields, got {0}")]
    TupleLength(usize),

    #[error("{0} does not exist in the local timezone")]
    NonexistentLocalTime(chrono::NaiveDateTime),

    #[error("invalid date format: {0:?}")]
    InvalidFormat(String),
}

/// Errors from the Publish2 link feed.
#[derive(Debug, Error)]
pub enum Publish2Error {
    #[error("Publish2 request failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Publish2 returned a bad date: {0}")]
    Date(#[from] DateError),

    #[error("unexpected Publish2 response: {0}")]
    ResponseShape(String),
}

/// Errors from the bit.ly client.
#[derive(Debug, Error)]
pub enum ShortenError {
    #[error("bit.ly request failed: {0}")]
    Fetch(#[from] FetchError),

    /// `statusCode` was `ERROR`; carries the upstream `errorMessage`.
    #[error("bit.ly error: {0}")]
    Upstream(String),

    #[error("unexpected bit.ly response: {0}")]
    ResponseShape(String),
}

/// Errors from the Google News search.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("news search failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("unexpected news search response: missing {0}")]
    ResponseShape(&'static str),
}

/// Bad tag syntax, raised when a template is compiled.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("'{tag}' {message}")]
pub struct TemplateSyntaxError {
    pub tag: String,
    pub message: String,
}

impl TemplateSyntaxError {
    pub fn new(tag: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            message: message.into(),
        }
    }
}

/// Failure while rendering a compiled template.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Publish2(#[from] Publish2Error),

    #[error(transparent)]
    Shorten(#[from] ShortenError),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Date(#[from] DateError),

    #[error("variable {0:?} could not be resolved")]
    UnresolvedVariable(String),

    #[error("filter {filter:?} cannot be applied to {got}")]
    FilterInput { filter: String, got: &'static str },

    #[error("missing configuration: {0}")]
    Config(&'static str),
}
