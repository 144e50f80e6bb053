//! Template tags and filters backed by the news APIs.
//!
//! # Tags
//!
//! ```text
//! {% google_news "Barack Obama" as obama_news %}
//! {% publish2 get_for_journalist "Chris Amico" "politics" 5 as my_politics_links %}
//! {% publish2 get_for_newsgroup "NewsHour" 10 as newshour_links %}
//! {% bitly story.url as short_url %}
//! ```
//!
//! # Filters
//!
//! ```text
//! {{ link.created_date|parsedate:"%B %d, %Y" }}
//! {{ entry.updated_parsed|datetime_from_tuple }}
//! ```
//!
//! Tag syntax is checked when a [`Template`] is compiled. Rendering awaits each
//! tag's single upstream call before moving on to the next node.

pub mod context;
pub mod filters;
pub mod tags;
pub mod template;

pub use context::{Context, ContextValue};
pub use template::Template;

use crate::config::Config;

/// What tags need at render time: a fetcher and the host configuration.
#[derive(Debug)]
pub struct Services<'a, F> {
    pub fetcher: &'a F,
    pub config: &'a Config,
}

impl<'a, F> Services<'a, F> {
    pub fn new(fetcher: &'a F, config: &'a Config) -> Self {
        Self { fetcher, config }
    }
}
