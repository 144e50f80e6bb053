//! Google AJAX news search.
//!
//! Results are returned exactly as Google sends them (`title`, `url`,
//! `content`, `publisher`, ...); no typed model is built for them.

use crate::error::SearchError;
use crate::fetch::FetchJson;
use serde_json::Value;
use tracing::{info, instrument};

pub const BASE_URL: &str = "http://ajax.googleapis.com/ajax/services/search/news";
pub const PROTOCOL_VERSION: &str = "1.0";
/// `large` asks for eight results per page instead of four.
pub const RESULT_SIZE: &str = "large";

/// Request URL for `query` against `base_url`.
pub fn search_url(base_url: &str, query: &str, api_key: Option<&str>) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    serializer
        .append_pair("v", PROTOCOL_VERSION)
        .append_pair("rsz", RESULT_SIZE)
        .append_pair("q", query);
    if let Some(key) = api_key {
        serializer.append_pair("key", key);
    }
    format!("{}?{}", base_url, serializer.finish())
}

/// Pull `responseData.results` out of a search response.
pub fn extract_results(response: Value) -> Result<Vec<Value>, SearchError> {
    let Value::Object(mut body) = response else {
        return Err(SearchError::ResponseShape("responseData"));
    };
    let Some(Value::Object(mut data)) = body.remove("responseData") else {
        return Err(SearchError::ResponseShape("responseData"));
    };
    match data.remove("results") {
        Some(Value::Array(results)) => Ok(results),
        _ => Err(SearchError::ResponseShape("responseData.results")),
    }
}

/// Search Google News for `query`, sending `api_key` when one is configured.
///
/// # Arguments
///
/// * `fetcher` - Performs the GET
/// * `query` - Free-text search
/// * `api_key` - Google AJAX Search key, if any
///
/// # Returns
///
/// The raw result records in the order Google returned them.
///
/// # Errors
///
/// [`SearchError::Fetch`] when the request fails and
/// [`SearchError::ResponseShape`] when `responseData.results` is missing.
#[instrument(level = "info", skip(fetcher, api_key), fields(has_key = api_key.is_some()))]
pub async fn search_news<F: FetchJson>(
    fetcher: &F,
    query: &str,
    api_key: Option<&str>,
) -> Result<Vec<Value>, SearchError> {
    search_news_at(fetcher, BASE_URL, query, api_key).await
}

/// [`search_news`] against a different endpoint.
pub async fn search_news_at<F: FetchJson>(
    fetcher: &F,
    base_url: &str,
    query: &str,
    api_key: Option<&str>,
) -> Result<Vec<Value>, SearchError> {
    let url = search_url(base_url, query, api_key);
    let response = fetcher.fetch_json(&url, &[]).await?;
    let results = extract_results(response)?;
    info!(count = results.len(), "Fetched news results");
    Ok(results)
}
