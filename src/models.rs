//! Data models for the Publish2 link feed.
//!
//! - [`FeedQuery`]: the filters sent to the link search endpoint
//! - [`Feed`]: a titled, ordered list of links
//! - [`Link`]: one bookmarked story, with parsed dates and tags
//! - [`Tag`]: a label attached to a link
//!
//! Publish2 returns more fields than we model. Known fields become struct
//! fields; everything else lands untouched in an `extra` map so templates can
//! still reach it (`link.comment`, `feed.journalist`, ...).

use crate::error::Publish2Error;
use crate::utils::parse_date;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Number of items requested when the caller does not say.
pub const DEFAULT_COUNT: u32 = 10;

/// Filters for a Publish2 link search.
///
/// The named filters are always sent, empty or not; `count` travels as
/// `number_of_items`. Extra filters go after them, in key order, and never
/// replace a named filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedQuery {
    /// Free-text search.
    pub q: String,
    pub newsgroup: String,
    pub tag: String,
    pub source: String,
    /// Maximum number of links the upstream should return.
    pub count: u32,
    /// Additional filters passed through verbatim.
    pub extra: BTreeMap<String, String>,
}

impl Default for FeedQuery {
    fn default() -> Self {
        Self {
            q: String::new(),
            newsgroup: String::new(),
            tag: String::new(),
            source: String::new(),
            count: DEFAULT_COUNT,
            extra: BTreeMap::new(),
        }
    }
}

impl FeedQuery {
    const NAMED: [&'static str; 5] = ["q", "newsgroup", "tag", "source", "number_of_items"];

    /// A query with free-text search `q` and default filters.
    pub fn new(q: impl Into<String>) -> Self {
        Self {
            q: q.into(),
            ..Default::default()
        }
    }

    pub fn newsgroup(mut self, newsgroup: impl Into<String>) -> Self {
        self.newsgroup = newsgroup.into();
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    /// Add a filter Publish2 understands but this type does not name.
    pub fn filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// URL-encoded query string (`application/x-www-form-urlencoded`).
    ///
    /// ```
    /// use newsutils::models::FeedQuery;
    ///
    /// let qs = FeedQuery::new("Barack Obama").newsgroup("NewsHour").to_query_string();
    /// assert_eq!(qs, "q=Barack+Obama&newsgroup=NewsHour&tag=&source=&number_of_items=10");
    /// ```
    pub fn to_query_string(&self) -> String {
        let count = self.count.to_string();
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        serializer
            .append_pair("q", &self.q)
            .append_pair("newsgroup", &self.newsgroup)
            .append_pair("tag", &self.tag)
            .append_pair("source", &self.source)
            .append_pair("number_of_items", &count);
        for (key, value) in &self.extra {
            if !Self::NAMED.contains(&key.as_str()) {
                serializer.append_pair(key, value);
            }
        }
        serializer.finish()
    }
}

/// A label on a link.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Tag {
    pub name: String,
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// One link from a Publish2 feed.
///
/// Both dates are parsed into naive local time when the link is built; a link
/// never holds a raw date string.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Link {
    pub title: String,
    /// Target URL, read from `url` or, failing that, `link`.
    pub url: Option<String>,
    /// When the story itself was published.
    pub publication_date: NaiveDateTime,
    /// When the link was added to Publish2.
    pub created_date: NaiveDateTime,
    /// Tags in upstream order; empty when the record has none.
    pub tags: Vec<Tag>,
    /// Fields not modelled above (comment, publication name, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Link {
    /// Build a link from one raw `items` record.
    pub fn from_record(record: Value) -> Result<Self, Publish2Error> {
        let mut fields = match record {
            Value::Object(fields) => fields,
            other => {
                return Err(Publish2Error::ResponseShape(format!(
                    "link record is not an object: {other}"
                )));
            }
        };

        let title = take_string(&mut fields, "title")?.unwrap_or_default();
        let url = match take_string(&mut fields, "url")? {
            Some(url) => Some(url),
            None => take_string(&mut fields, "link")?,
        };
        let publication_date = take_date(&mut fields, "publication_date")?;
        let created_date = take_date(&mut fields, "created_date")?;

        let tags = match fields.remove("tags") {
            None | Some(Value::Null) => Vec::new(),
            Some(raw) => serde_json::from_value(raw)
                .map_err(|e| Publish2Error::ResponseShape(format!("bad tags: {e}")))?,
        };

        Ok(Self {
            title,
            url,
            publication_date,
            created_date,
            tags,
            extra: fields,
        })
    }

    /// A passthrough field by name.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

/// A Publish2 feed: a title plus links in upstream order (newest first).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Feed {
    pub title: String,
    pub items: Vec<Link>,
    /// Remaining top-level fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Feed {
    /// Build a feed from the decoded JSON body of a link search.
    pub fn from_json(body: Value) -> Result<Self, Publish2Error> {
        let mut fields = match body {
            Value::Object(fields) => fields,
            other => {
                return Err(Publish2Error::ResponseShape(format!(
                    "feed is not an object: {other}"
                )));
            }
        };

        let title = take_string(&mut fields, "title")?.unwrap_or_default();
        let items = match fields.remove("items") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(records)) => records
                .into_iter()
                .map(Link::from_record)
                .collect::<Result<Vec<_>, _>>()?,
            Some(other) => {
                return Err(Publish2Error::ResponseShape(format!(
                    "items is not an array: {other}"
                )));
            }
        };

        Ok(Self {
            title,
            items,
            extra: fields,
        })
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl fmt::Display for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

fn take_string(fields: &mut Map<String, Value>, key: &str) -> Result<Option<String>, Publish2Error> {
    match fields.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(Publish2Error::ResponseShape(format!(
            "{key} is not a string: {other}"
        ))),
    }
}

fn take_date(fields: &mut Map<String, Value>, key: &str) -> Result<NaiveDateTime, Publish2Error> {
    let raw = take_string(fields, key)?
        .ok_or_else(|| Publish2Error::ResponseShape(format!("link is missing {key}")))?;
    Ok(parse_date(&raw)?)
}
