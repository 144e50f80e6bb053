//! Rendering context: named values that tags read from and write to.

use crate::error::RenderError;
use crate::models::Feed;
use chrono::NaiveDateTime;
use serde_json::Value;
use std::collections::HashMap;

/// A value bound to a context variable.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextValue {
    /// Raw JSON, e.g. news search results.
    Json(Value),
    Feed(Feed),
    DateTime(NaiveDateTime),
    Text(String),
}

impl ContextValue {
    /// Short name of the variant, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            ContextValue::Json(Value::String(_)) | ContextValue::Text(_) => "text",
            ContextValue::Json(Value::Array(_)) => "list",
            ContextValue::Json(_) => "JSON value",
            ContextValue::Feed(_) => "feed",
            ContextValue::DateTime(_) => "datetime",
        }
    }

    /// The value as text, if it is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ContextValue::Text(s) => Some(s),
            ContextValue::Json(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Inline rendering: text as-is, feeds by title, datetimes as
    /// `YYYY-MM-DD HH:MM:SS`, other JSON compact.
    pub fn render(&self) -> String {
        match self {
            ContextValue::Text(s) => s.clone(),
            ContextValue::Json(Value::String(s)) => s.clone(),
            ContextValue::Json(Value::Null) => String::new(),
            ContextValue::Json(other) => other.to_string(),
            ContextValue::Feed(feed) => feed.to_string(),
            ContextValue::DateTime(dt) => dt.to_string(),
        }
    }

    /// Walk a dotted path (`items.0.title`) into this value.
    fn lookup<'p>(&self, mut path: impl Iterator<Item = &'p str>) -> Option<ContextValue> {
        let Some(first) = path.next() else {
            return Some(self.clone());
        };
        let mut current = match self {
            ContextValue::Json(value) => value.clone(),
            ContextValue::Feed(feed) => serde_json::to_value(feed).ok()?,
            ContextValue::Text(_) | ContextValue::DateTime(_) => return None,
        };
        for segment in std::iter::once(first).chain(path) {
            current = match current {
                Value::Object(mut map) => map.remove(segment)?,
                Value::Array(mut items) => {
                    let index: usize = segment.parse().ok()?;
                    if index >= items.len() {
                        return None;
                    }
                    items.swap_remove(index)
                }
                _ => return None,
            };
        }
        Some(ContextValue::Json(current))
    }
}

impl From<Feed> for ContextValue {
    fn from(feed: Feed) -> Self {
        ContextValue::Feed(feed)
    }
}

impl From<NaiveDateTime> for ContextValue {
    fn from(dt: NaiveDateTime) -> Self {
        ContextValue::DateTime(dt)
    }
}

impl From<String> for ContextValue {
    fn from(s: String) -> Self {
        ContextValue::Text(s)
    }
}

impl From<&str> for ContextValue {
    fn from(s: &str) -> Self {
        ContextValue::Text(s.to_string())
    }
}

impl From<Value> for ContextValue {
    fn from(value: Value) -> Self {
        ContextValue::Json(value)
    }
}

/// Variables visible to one template render.
#[derive(Debug, Clone, Default)]
pub struct Context {
    vars: HashMap<String, ContextValue>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name`, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ContextValue>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ContextValue> {
        self.vars.get(name)
    }

    /// Resolve a dotted variable reference, or `None` if any part is missing.
    pub fn lookup(&self, path: &str) -> Option<ContextValue> {
        let mut segments = path.split('.');
        let root = self.vars.get(segments.next()?)?;
        root.lookup(segments)
    }

    /// Like [`Context::lookup`], but a missing variable is an error.
    pub fn resolve(&self, path: &str) -> Result<ContextValue, RenderError> {
        self.lookup(path)
            .ok_or_else(|| RenderError::UnresolvedVariable(path.to_string()))
    }
}
