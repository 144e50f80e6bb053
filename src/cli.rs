//! Command-line interface definitions for newsutils.
//!
//! Credentials can come from a YAML config file, from flags, or from
//! environment variables; flags and environment win over the file.

use crate::config::Config;
use clap::{Parser, Subcommand};
use std::error::Error;

/// Command-line arguments.
///
/// # Examples
///
/// ```sh
/// # Latest NewsHour links
/// newsutils links --newsgroup NewsHour --count 5
///
/// # Shorten with credentials from the environment
/// BITLY_USERNAME=newsroom BITLY_API_KEY=R_0123 newsutils shorten http://example.com/story
///
/// # Render a template file
/// newsutils --config newsutils.yaml render page.txt --var topic=space
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML config file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Google AJAX Search API key
    #[arg(long, env = "GOOGLE_API_KEY", global = true)]
    pub google_api_key: Option<String>,

    /// bit.ly login
    #[arg(long, env = "BITLY_USERNAME", global = true)]
    pub bitly_username: Option<String>,

    /// bit.ly API key
    #[arg(long, env = "BITLY_API_KEY", global = true, hide_env_values = true)]
    pub bitly_api_key: Option<String>,

    /// Domain of the current site, sent as the Referer
    #[arg(long, env = "SITE_DOMAIN", global = true)]
    pub site_domain: Option<String>,

    /// Referer to send when no site domain is configured
    #[arg(long, env = "HTTP_REFERER", global = true)]
    pub http_referer: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Search Google News
    News {
        query: String,
    },

    /// Search the Publish2 link feed
    Links {
        /// Free-text search
        #[arg(short, long, default_value = "")]
        query: String,
        #[arg(short, long, default_value = "")]
        newsgroup: String,
        #[arg(short, long, default_value = "")]
        tag: String,
        #[arg(short, long, default_value = "")]
        source: String,
        /// Number of links to request
        #[arg(long, default_value_t = crate::models::DEFAULT_COUNT)]
        count: u32,
        /// Extra filter passed through as-is, e.g. `--filter journalist="Chris Amico"`
        #[arg(long = "filter", value_parser = parse_key_value)]
        filters: Vec<(String, String)>,
    },

    /// Shorten a URL with bit.ly
    Shorten {
        url: String,
    },

    /// Parse a date string into local time
    ParseDate {
        value: String,
        /// strftime format for the output
        #[arg(short, long)]
        format: Option<String>,
    },

    /// Render a template file
    Render {
        template: String,
        /// Context variable, `name=value`
        #[arg(long = "var", value_parser = parse_key_value)]
        vars: Vec<(String, String)>,
    },
}

/// Parse `key=value`.
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got {s:?}")),
    }
}

impl Cli {
    /// Config file values with flag and environment overrides applied.
    pub fn load_config(&self) -> Result<Config, Box<dyn Error>> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        let overrides = [
            (&mut config.google_api_key, &self.google_api_key),
            (&mut config.bitly_username, &self.bitly_username),
            (&mut config.bitly_api_key, &self.bitly_api_key),
            (&mut config.site_domain, &self.site_domain),
            (&mut config.http_referer, &self.http_referer),
        ];
        for (slot, value) in overrides {
            if value.is_some() {
                slot.clone_from(value);
            }
        }
        Ok(config)
    }
}
