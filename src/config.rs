//! Read-only configuration: API credentials, site identity and HTTP defaults.
//!
//! Configuration comes from an optional YAML file, with command-line flags and
//! environment variables layered on top (see [`crate::cli::Cli`]). It is built
//! once at startup and handed out by reference.
//!
//! ```yaml
//! google_api_key: ABQIAAAA...
//! bitly_username: newsroom
//! bitly_api_key: R_0123456789
//! site_domain: www.example.com
//! ```

use serde::Deserialize;
use std::error::Error;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, instrument};

/// User agent sent when the configuration does not name one.
pub const DEFAULT_USER_AGENT: &str = "newsutils";

/// Settings supplied by the host application.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Google AJAX Search API key, sent as `key` when present.
    pub google_api_key: Option<String>,
    /// bit.ly login.
    pub bitly_username: Option<String>,
    /// bit.ly API key.
    pub bitly_api_key: Option<String>,
    /// Domain of the current site; preferred source for the `Referer` header.
    pub site_domain: Option<String>,
    /// Explicit `Referer`, used when no site domain is configured.
    pub http_referer: Option<String>,
    pub user_agent: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

impl Config {
    /// Load configuration from a YAML file.
    ///
    /// Missing keys take their defaults, so an empty file is a valid config.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid YAML.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Config = serde_yaml::from_str(&raw)?;
        debug!(
            has_google_key = config.google_api_key.is_some(),
            has_bitly = config.bitly_credentials().is_some(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Both bit.ly credentials, if configured.
    pub fn bitly_credentials(&self) -> Option<(&str, &str)> {
        match (&self.bitly_username, &self.bitly_api_key) {
            (Some(user), Some(key)) => Some((user.as_str(), key.as_str())),
            _ => None,
        }
    }

    /// Per-request timeout.
    ///
    /// # Returns
    ///
    /// `timeout_secs` as a [`Duration`], or 30 seconds when unset.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(30))
    }

    /// Headers sent with every request, computed once from this config.
    pub fn default_headers(&self) -> DefaultHeaders {
        DefaultHeaders::from_config(self)
    }
}

/// Headers merged into every outgoing request.
///
/// `Referer` is the site domain when one is configured, otherwise the explicit
/// `http_referer`, otherwise it is not sent at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultHeaders {
    pub user_agent: String,
    pub referer: Option<String>,
}

impl DefaultHeaders {
    pub fn from_config(config: &Config) -> Self {
        Self {
            user_agent: config
                .user_agent
                .clone()
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            referer: config
                .site_domain
                .clone()
                .or_else(|| config.http_referer.clone()),
        }
    }

    /// Header name/value pairs, skipping unset ones.
    pub fn pairs(&self) -> Vec<(&'static str, &str)> {
        let mut pairs = vec![("User-Agent", self.user_agent.as_str())];
        if let Some(referer) = &self.referer {
            pairs.push(("Referer", referer.as_str()));
        }
        pairs
    }
}

impl Default for DefaultHeaders {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "google_api_key: gkey\nbitly_username: newsroom\nbitly_api_key: R_abc\nsite_domain: www.example.com"
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.google_api_key.as_deref(), Some("gkey"));
        assert_eq!(config.bitly_credentials(), Some(("newsroom", "R_abc")));
        assert_eq!(config.site_domain.as_deref(), Some("www.example.com"));
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(Config::load("/nonexistent/newsutils.yaml").is_err());
    }

    #[test]
    fn test_partial_bitly_credentials() {
        let config = Config {
            bitly_username: Some("newsroom".into()),
            ..Default::default()
        };
        assert_eq!(config.bitly_credentials(), None);
    }

    #[test]
    fn test_referer_prefers_site_domain() {
        let config = Config {
            site_domain: Some("www.example.com".into()),
            http_referer: Some("fallback.example.com".into()),
            ..Default::default()
        };
        let headers = config.default_headers();
        assert_eq!(headers.referer.as_deref(), Some("www.example.com"));
        assert_eq!(headers.user_agent, DEFAULT_USER_AGENT);
    }

    #[test]
    fn test_referer_falls_back_to_override() {
        let config = Config {
            http_referer: Some("fallback.example.com".into()),
            ..Default::default()
        };
        assert_eq!(
            config.default_headers().referer.as_deref(),
            Some("fallback.example.com")
        );
    }

    #[test]
    fn test_no_referer_pair_when_unset() {
        let headers = DefaultHeaders::default();
        assert_eq!(headers.pairs(), vec![("User-Agent", "newsutils")]);
    }
}
