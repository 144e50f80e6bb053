//! # newsutils
//!
//! Template tags and filters that pull news data from web APIs into
//! server-rendered pages:
//!
//! - **Publish2** link feeds for journalists and newsgroups ([`clients::publish2`])
//! - **bit.ly** URL shortening ([`clients::bitly`])
//! - **Google News** search ([`clients::google_news`])
//! - date helpers that turn feed timestamps into local times ([`utils`])
//!
//! ## Architecture
//!
//! 1. [`fetch`]: one GET, one decoded JSON body, default headers from [`config`]
//! 2. [`clients`]: build the query string, fetch, map the response
//! 3. [`templatetags`]: tag/filter adapters plus a minimal template host
//!
//! Every call is request-scoped. Nothing is cached, retried or shared across
//! renders apart from the read-only configuration.
//!
//! ```ignore
//! let config = Config::load("newsutils.yaml")?;
//! let fetcher = HttpFetcher::new(&config)?;
//! let services = Services::new(&fetcher, &config);
//!
//! let template = Template::compile(r#"{% publish2 get_for_newsgroup "NewsHour" 5 as links %}{{ links.title }}"#)?;
//! let html = template.render(&mut Context::new(), &services).await?;
//! ```

pub mod cli;
pub mod clients;
pub mod config;
pub mod error;
pub mod fetch;
pub mod models;
pub mod templatetags;
pub mod utils;

pub use config::Config;
pub use error::{
    DateError, FetchError, Publish2Error, RenderError, SearchError, ShortenError,
    TemplateSyntaxError,
};
pub use fetch::{FetchJson, HttpFetcher};
pub use models::{Feed, FeedQuery, Link, Tag};
pub use templatetags::{Context, ContextValue, Services, Template};
