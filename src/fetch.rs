//! Blocking-per-call JSON fetching over HTTP.
//!
//! Every client in this crate talks to its API through the [`FetchJson`]
//! trait, so a page render performs exactly one awaited GET per tag and tests
//! can substitute canned responses.
//!
//! # Architecture
//!
//! - [`FetchJson`]: the capability `fetch_json(url, headers) -> JSON`
//! - [`HttpFetcher`]: production implementation on a shared `reqwest::Client`,
//!   merging the process-wide [`DefaultHeaders`] with per-call headers
//!
//! There is no retry, caching or rate limiting: a failed request is returned
//! to the caller as-is.

use crate::config::{Config, DefaultHeaders};
use crate::error::FetchError;
use crate::utils::{redact_url, truncate_for_log};
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, instrument, warn};

/// Anything that can GET a URL and hand back the decoded JSON body.
pub trait FetchJson {
    /// GET `url` with `headers` layered over the implementation's defaults.
    ///
    /// Caller-supplied headers replace defaults of the same name
    /// (case-insensitively).
    async fn fetch_json(&self, url: &str, headers: &[(&str, &str)]) -> Result<Value, FetchError>;
}

/// Merge default headers with caller-supplied ones; callers win.
pub fn merge_headers(defaults: &DefaultHeaders, extra: &[(&str, &str)]) -> Vec<(String, String)> {
    let mut merged: Vec<(String, String)> = defaults
        .pairs()
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    for (name, value) in extra {
        match merged.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
            Some(slot) => slot.1 = value.to_string(),
            None => merged.push((name.to_string(), value.to_string())),
        }
    }
    merged
}

/// [`FetchJson`] over real HTTP.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    defaults: DefaultHeaders,
}

impl HttpFetcher {
    /// Build a fetcher from host configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - Supplies the request timeout and the default headers
    ///
    /// # Returns
    ///
    /// A fetcher over a fresh `reqwest::Client`, or the builder error if TLS
    /// initialisation fails.
    pub fn new(config: &Config) -> reqwest::Result<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self::with_client(client, config.default_headers()))
    }

    /// Wrap an existing client, e.g. one with custom proxy or TLS settings.
    ///
    /// # Arguments
    ///
    /// * `client` - Used as-is; its own timeout and default headers still apply
    /// * `defaults` - Merged into every request before the caller's headers
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let client = reqwest::Client::builder().no_proxy().build()?;
    /// let fetcher = HttpFetcher::with_client(client, config.default_headers());
    /// ```
    pub fn with_client(client: Client, defaults: DefaultHeaders) -> Self {
        Self { client, defaults }
    }

    pub fn defaults(&self) -> &DefaultHeaders {
        &self.defaults
    }

    fn header_map(&self, extra: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in merge_headers(&self.defaults, extra) {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(&value),
            ) {
                (Ok(name), Ok(value)) => {
                    map.insert(name, value);
                }
                _ => warn!(header = %name, "Skipping header that is not valid HTTP"),
            }
        }
        map
    }
}

impl FetchJson for HttpFetcher {
    #[instrument(level = "info", skip_all, fields(url = %redact_url(url)))]
    async fn fetch_json(&self, url: &str, headers: &[(&str, &str)]) -> Result<Value, FetchError> {
        let t0 = Instant::now();
        // Signed URLs carry API keys; only the redacted form leaves this function.
        let shown = redact_url(url);
        let transport = |source: reqwest::Error| FetchError::Transport {
            url: shown.clone(),
            source: source.without_url(),
        };

        let response = self
            .client
            .get(url)
            .headers(self.header_map(headers))
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Upstream returned an error status");
            return Err(FetchError::Status {
                url: shown.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(transport)?;
        let dt = t0.elapsed();
        debug!(
            bytes = body.len(),
            elapsed_ms = dt.as_millis() as u64,
            "Fetched response body"
        );

        serde_json::from_slice(&body).map_err(|source| {
            let preview = truncate_for_log(&String::from_utf8_lossy(&body), 200);
            warn!(error = %source, %preview, "Response body is not JSON");
            FetchError::Decode {
                url: shown.clone(),
                preview,
                source,
            }
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory [`FetchJson`] used by the unit tests.

    use super::*;
    use std::cell::RefCell;

    /// Replies with a canned JSON body and remembers what was asked for.
    #[derive(Debug, Default)]
    pub struct StaticFetcher {
        pub response: Value,
        pub requests: RefCell<Vec<(String, Vec<(String, String)>)>>,
    }

    impl StaticFetcher {
        pub fn new(response: Value) -> Self {
            Self {
                response,
                requests: RefCell::new(Vec::new()),
            }
        }

        pub fn urls(&self) -> Vec<String> {
            self.requests.borrow().iter().map(|(u, _)| u.clone()).collect()
        }

        pub fn last_url(&self) -> String {
            self.urls().pop().unwrap_or_default()
        }
    }

    impl FetchJson for StaticFetcher {
        async fn fetch_json(
            &self,
            url: &str,
            headers: &[(&str, &str)],
        ) -> Result<Value, FetchError> {
            self.requests.borrow_mut().push((
                url.to_string(),
                headers
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ));
            Ok(self.response.clone())
        }
    }

    /// Always fails with a non-success status.
    #[derive(Debug, Default)]
    pub struct FailingFetcher;

    impl FetchJson for FailingFetcher {
        async fn fetch_json(&self, url: &str, _: &[(&str, &str)]) -> Result<Value, FetchError> {
            Err(FetchError::Status {
                url: url.to_string(),
                status: 503,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::bitly::Bitly;
    use crate::error::ShortenError;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn defaults() -> DefaultHeaders {
        DefaultHeaders {
            user_agent: "newsutils".into(),
            referer: Some("www.example.com".into()),
        }
    }

    #[test]
    fn test_merge_keeps_defaults() {
        let merged = merge_headers(&defaults(), &[]);
        assert_eq!(
            merged,
            vec![
                ("User-Agent".to_string(), "newsutils".to_string()),
                ("Referer".to_string(), "www.example.com".to_string()),
            ]
        );
    }

    #[test]
    fn test_merge_caller_overrides_case_insensitively() {
        let merged = merge_headers(&defaults(), &[("user-agent", "custom/1.0"), ("Accept", "application/json")]);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].1, "custom/1.0");
        assert_eq!(merged[2], ("Accept".to_string(), "application/json".to_string()));
    }

    #[test]
    fn test_header_map_contains_merged_values() {
        let fetcher = HttpFetcher::with_client(Client::new(), defaults());
        let map = fetcher.header_map(&[("Referer", "other.example.com")]);
        assert_eq!(map.get("user-agent").unwrap(), "newsutils");
        assert_eq!(map.get("referer").unwrap(), "other.example.com");
    }

    #[test]
    fn test_header_map_skips_invalid_values() {
        let fetcher = HttpFetcher::with_client(Client::new(), defaults());
        let map = fetcher.header_map(&[("X-Bad", "line\nbreak")]);
        assert!(map.get("x-bad").is_none());
        assert_eq!(map.len(), 2);
    }

    /// Collects formatted log lines in memory.
    #[derive(Clone, Default)]
    struct LogCapture(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogCapture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Answers exactly one request with a bare 404.
    async fn serve_not_found() -> std::net::SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await;
            let _ = socket
                .write_all(b"HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
                .await;
        });
        addr
    }

    #[tokio::test]
    async fn test_api_key_stays_out_of_logs_and_errors() {
        let logs = LogCapture::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let addr = serve_not_found().await;
        let client = Client::builder().no_proxy().build().unwrap();
        let fetcher = HttpFetcher::with_client(client, DefaultHeaders::default());
        let err = Bitly::new(&fetcher, "newsroom", "R_SECRETKEY")
            .with_base_url(format!("http://{addr}/"))
            .shorten("http://example.com")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ShortenError::Fetch(FetchError::Status { status: 404, .. })
        ));
        assert!(!err.to_string().contains("R_SECRETKEY"));

        let out = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(out.contains("apiKey=REDACTED"), "span should show the redacted URL: {out}");
        assert!(!out.contains("R_SECRETKEY"), "key leaked into logs: {out}");
    }
}
