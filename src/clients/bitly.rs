//! A small bit.ly client.
//!
//! Every call is signed with the account login and API key and asks for the
//! v2.0.1 JSON format:
//!
//! ```text
//! GET http://api.bit.ly/shorten?longUrl=...&login=...&apiKey=...&version=2.0.1&format=json
//! ```
//!
//! Responses report `statusCode` `OK` or `ERROR`; errors carry an
//! `errorMessage`, successes a `results` map keyed by the long URL.
//!
//! Results are not cached. Shortening the same URL twice costs two requests;
//! bind the result to a template variable to reuse it.

use crate::error::ShortenError;
use crate::fetch::FetchJson;
use serde_json::Value;
use std::fmt;
use tracing::{info, instrument, warn};

pub const BASE_URL: &str = "http://api.bit.ly/";
pub const API_VERSION: &str = "2.0.1";

/// bit.ly account credentials bound to a fetcher.
///
/// ```ignore
/// let bitly = Bitly::new(&fetcher, "newsroom", "R_0123456789");
/// let short = bitly.shorten("http://www.example.com/blog").await?;
/// ```
pub struct Bitly<'a, F> {
    fetcher: &'a F,
    username: String,
    api_key: String,
    base_url: String,
}

impl<'a, F: FetchJson> Bitly<'a, F> {
    pub fn new(fetcher: &'a F, username: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            fetcher,
            username: username.into(),
            api_key: api_key.into(),
            base_url: BASE_URL.to_string(),
        }
    }

    /// Point the client at another endpoint; must end with `/`.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Signed request URL for `method` with its own parameters first.
    pub fn url_for(&self, method: &str, params: &[(&str, &str)]) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params)
            .append_pair("login", &self.username)
            .append_pair("apiKey", &self.api_key)
            .append_pair("version", API_VERSION)
            .append_pair("format", "json")
            .finish();
        format!("{}{}?{}", self.base_url, method, query)
    }

    async fn api_call(&self, method: &str, params: &[(&str, &str)]) -> Result<Value, ShortenError> {
        let response = self.fetcher.fetch_json(&self.url_for(method, params), &[]).await?;

        if response.get("statusCode").and_then(Value::as_str) == Some("ERROR") {
            let message = response
                .get("errorMessage")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            warn!(%method, %message, "bit.ly returned an error");
            return Err(ShortenError::Upstream(message));
        }
        Ok(response)
    }

    /// Shorten `long_url`.
    ///
    /// # Arguments
    ///
    /// * `long_url` - The URL to shorten, sent as `longUrl`
    ///
    /// # Returns
    ///
    /// The `shortUrl` bit.ly reports for `long_url`.
    ///
    /// # Errors
    ///
    /// - [`ShortenError::Upstream`] with bit.ly's `errorMessage`
    /// - [`ShortenError::ResponseShape`] when no `results[long_url].shortUrl`
    ///   comes back
    /// - [`ShortenError::Fetch`] on transport or decoding failures
    #[instrument(level = "info", skip(self), fields(username = %self.username))]
    pub async fn shorten(&self, long_url: &str) -> Result<String, ShortenError> {
        let response = self.api_call("shorten", &[("longUrl", long_url)]).await?;

        let short_url = response
            .get("results")
            .and_then(|results| results.get(long_url))
            .and_then(|result| result.get("shortUrl"))
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ShortenError::ResponseShape(format!("no results.{long_url}.shortUrl"))
            })?;

        info!(%short_url, "Shortened URL");
        Ok(short_url.to_string())
    }
}

impl<F> fmt::Debug for Bitly<'_, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bitly")
            .field("username", &self.username)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::{FailingFetcher, StaticFetcher};
    use serde_json::json;

    #[tokio::test]
    async fn test_shorten_ok() {
        let fetcher = StaticFetcher::new(json!({
            "statusCode": "OK",
            "results": {"http://example.com": {"shortUrl": "http://sh.rt/abc"}}
        }));
        let bitly = Bitly::new(&fetcher, "newsroom", "R_key");

        assert_eq!(bitly.shorten("http://example.com").await.unwrap(), "http://sh.rt/abc");
        assert_eq!(
            fetcher.last_url(),
            "http://api.bit.ly/shorten?longUrl=http%3A%2F%2Fexample.com\
             &login=newsroom&apiKey=R_key&version=2.0.1&format=json"
        );
    }

    #[tokio::test]
    async fn test_shorten_error_carries_upstream_message() {
        let fetcher = StaticFetcher::new(json!({"statusCode": "ERROR", "errorMessage": "bad url"}));
        let err = Bitly::new(&fetcher, "u", "k").shorten("nope").await.unwrap_err();
        assert!(matches!(&err, ShortenError::Upstream(m) if m == "bad url"));
        assert_eq!(err.to_string(), "bit.ly error: bad url");
    }

    #[tokio::test]
    async fn test_shorten_missing_result() {
        let fetcher = StaticFetcher::new(json!({
            "statusCode": "OK",
            "results": {"http://other.com": {"shortUrl": "http://sh.rt/xyz"}}
        }));
        let err = Bitly::new(&fetcher, "u", "k")
            .shorten("http://example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, ShortenError::ResponseShape(_)));
    }

    #[tokio::test]
    async fn test_shorten_repeats_request() {
        let fetcher = StaticFetcher::new(json!({
            "statusCode": "OK",
            "results": {"http://example.com": {"shortUrl": "http://sh.rt/abc"}}
        }));
        let bitly = Bitly::new(&fetcher, "u", "k");
        bitly.shorten("http://example.com").await.unwrap();
        bitly.shorten("http://example.com").await.unwrap();
        assert_eq!(fetcher.urls().len(), 2);
    }

    #[tokio::test]
    async fn test_shorten_fetch_failure() {
        let err = Bitly::new(&FailingFetcher, "u", "k")
            .shorten("http://example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, ShortenError::Fetch(_)));
    }

    #[test]
    fn test_debug_hides_api_key() {
        let fetcher = StaticFetcher::default();
        let debug = format!("{:?}", Bitly::new(&fetcher, "newsroom", "R_secret"));
        assert!(debug.contains("newsroom"));
        assert!(!debug.contains("R_secret"));
    }
}
