//! Publish2 link search.
//!
//! Publish2 is a collaborative bookmarking tool for journalists. It has no
//! formal API, but its link search is available as a filterable JSON feed:
//!
//! ```text
//! GET http://www.publish2.com/search/links.json?q=&newsgroup=&tag=&source=&number_of_items=10
//! ```
//!
//! Filters are free text (`q`), newsgroup, tag and source; anything else the
//! feed accepts can ride along as an extra filter. Each item carries a title,
//! link, tags, publication name, submission and publication dates and the
//! submitter's public comment.

use crate::error::Publish2Error;
use crate::fetch::FetchJson;
use crate::models::{Feed, FeedQuery};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, instrument};

pub const BASE_URL: &str = "http://www.publish2.com/search/links.json";

/// Publish2 link search bound to a fetcher.
#[derive(Debug)]
pub struct Publish2Client<'a, F> {
    fetcher: &'a F,
    base_url: String,
}

impl<'a, F: FetchJson> Publish2Client<'a, F> {
    pub fn new(fetcher: &'a F) -> Self {
        Self {
            fetcher,
            base_url: BASE_URL.to_string(),
        }
    }

    /// Point the client at another endpoint (a mirror or a test server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Full request URL for `query`.
    pub fn url_for(&self, query: &FeedQuery) -> String {
        format!("{}?{}", self.base_url, query.to_query_string())
    }

    /// Fetch a filtered feed.
    ///
    /// Only `query.count` items are requested; the client never pages.
    ///
    /// # Arguments
    ///
    /// * `query` - Named filters, count and extra filters to send
    ///
    /// # Returns
    ///
    /// The feed with its links in upstream order and their dates parsed.
    ///
    /// # Errors
    ///
    /// - [`Publish2Error::Fetch`] on transport, status or JSON failures
    /// - [`Publish2Error::Date`] when a link carries an unreadable date
    /// - [`Publish2Error::ResponseShape`] when the body is not a feed object
    #[instrument(level = "info", skip_all, fields(q = %query.q, newsgroup = %query.newsgroup, tag = %query.tag, count = query.count))]
    pub async fn search(&self, query: &FeedQuery) -> Result<Feed, Publish2Error> {
        let url = self.url_for(query);
        debug!(%url, "Querying Publish2");

        let body = self.fetcher.fetch_json(&url, &[]).await?;
        let feed = Feed::from_json(body)?;

        info!(title = %feed.title, count = feed.len(), "Fetched Publish2 feed");
        Ok(feed)
    }
}

/// Search Publish2 at its public endpoint.
///
/// # Arguments
///
/// * `fetcher` - Performs the GET
/// * `query` - Filters to send; see [`FeedQuery`]
///
/// # Examples
///
/// ```ignore
/// let query = FeedQuery::new("Barack Obama").newsgroup("NewsHour").count(5);
/// let feed = publish2::search(&fetcher, &query).await?;
/// for link in &feed.items {
///     println!("{link} ({})", link.publication_date);
/// }
/// ```
pub async fn search<F: FetchJson>(fetcher: &F, query: &FeedQuery) -> Result<Feed, Publish2Error> {
    Publish2Client::new(fetcher).search(query).await
}

/// The canned lookups offered to templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Publish2Function {
    /// Links submitted by one journalist.
    ByJournalist,
    /// Links shared in one newsgroup.
    ByNewsgroup,
}

impl Publish2Function {
    /// Every function with the name templates use for it.
    pub const ALL: [(&'static str, Publish2Function); 2] = [
        ("get_for_journalist", Publish2Function::ByJournalist),
        ("get_for_newsgroup", Publish2Function::ByNewsgroup),
    ];

    pub fn name(self) -> &'static str {
        match self {
            Publish2Function::ByJournalist => "get_for_journalist",
            Publish2Function::ByNewsgroup => "get_for_newsgroup",
        }
    }

    /// Query for `subject` (a journalist or a newsgroup), optionally narrowed
    /// to a topic tag.
    ///
    /// The link feed has no named journalist filter, so the journalist travels
    /// as the extra `journalist` filter.
    pub fn query(self, subject: &str, topic: Option<&str>, count: u32) -> FeedQuery {
        let query = FeedQuery::default()
            .tag(topic.unwrap_or_default())
            .count(count);
        match self {
            Publish2Function::ByJournalist => query.filter("journalist", subject),
            Publish2Function::ByNewsgroup => query.newsgroup(subject),
        }
    }
}

impl FromStr for Publish2Function {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|(name, _)| *name == s)
            .map(|(_, function)| *function)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|(name, _)| *name).collect();
                format!("unknown Publish2 function {s:?} (expected one of {})", known.join(", "))
            })
    }
}

impl fmt::Display for Publish2Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
