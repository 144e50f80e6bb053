//! The `google_news`, `publish2` and `bitly` template tags.
//!
//! Each tag is compiled from its [`Token`] into a node once, when the template
//! is compiled, and rendered against a [`Context`] as often as needed.
//! Rendering performs one upstream call; the result is either bound to the
//! `as <name>` variable (rendering nothing) or rendered inline.

use super::Services;
use super::context::{Context, ContextValue};
use crate::clients::bitly::Bitly;
use crate::clients::google_news::search_news;
use crate::clients::publish2::{Publish2Client, Publish2Function};
use crate::error::{RenderError, TemplateSyntaxError};
use crate::fetch::FetchJson;
use crate::models::DEFAULT_COUNT;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, instrument};

static AS_VAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.*?)\s+as\s+(\w+)$").expect("valid regex"));
static IDENTIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\w+$").expect("valid regex"));

/// The contents of one `{% ... %}` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub contents: String,
}

impl Token {
    pub fn new(contents: impl Into<String>) -> Self {
        Self {
            contents: contents.into().trim().to_string(),
        }
    }

    /// The tag name (first word).
    pub fn name(&self) -> &str {
        self.contents.split_whitespace().next().unwrap_or_default()
    }

    /// Everything after the tag name, trimmed; `None` when there is nothing.
    pub fn args(&self) -> Option<&str> {
        self.contents
            .split_once(char::is_whitespace)
            .map(|(_, rest)| rest.trim())
            .filter(|rest| !rest.is_empty())
    }

    /// Split on whitespace, keeping quoted strings (with their quotes) whole.
    pub fn split_contents(&self) -> Vec<String> {
        split_respecting_quotes(&self.contents, char::is_whitespace)
    }
}

/// Split `s` at characters matching `sep` that sit outside `"..."`/`'...'`.
/// Empty pieces are dropped.
pub(crate) fn split_respecting_quotes(s: &str, sep: impl Fn(char) -> bool) -> Vec<String> {
    let mut bits = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in s.chars() {
        match quote {
            Some(q) if c == q => {
                quote = None;
                current.push(c);
            }
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                current.push(c);
            }
            None if sep(c) => {
                if !current.is_empty() {
                    bits.push(std::mem::take(&mut current));
                }
            }
            None => current.push(c),
        }
    }
    if !current.is_empty() {
        bits.push(current);
    }
    bits
}

/// A tag or filter argument: a quoted literal, a number, or a variable path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Argument {
    Literal(String),
    Number(i64),
    Variable(String),
}

impl Argument {
    pub fn parse(bit: &str) -> Self {
        let bit = bit.trim();
        for q in ['"', '\''] {
            if bit.len() >= 2 && bit.starts_with(q) && bit.ends_with(q) {
                return Argument::Literal(bit[1..bit.len() - 1].to_string());
            }
        }
        match bit.parse::<i64>() {
            Ok(n) => Argument::Number(n),
            Err(_) => Argument::Variable(bit.to_string()),
        }
    }

    pub fn resolve(&self, context: &Context) -> Result<ContextValue, RenderError> {
        match self {
            Argument::Literal(s) => Ok(ContextValue::Text(s.clone())),
            Argument::Number(n) => Ok(ContextValue::Json(Value::from(*n))),
            Argument::Variable(path) => context.resolve(path),
        }
    }

    /// Resolve and render as plain text.
    pub fn resolve_string(&self, context: &Context) -> Result<String, RenderError> {
        Ok(self.resolve(context)?.render())
    }
}

/// Store `value` under `var_name`, or render it inline.
fn emit(context: &mut Context, var_name: Option<&str>, value: ContextValue, inline: String) -> String {
    match var_name {
        Some(name) => {
            debug!(%name, kind = value.kind(), "Bound tag result");
            context.insert(name, value);
            String::new()
        }
        None => inline,
    }
}

/// `{% google_news <query> [as <name>] %}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleNewsNode {
    pub query: Argument,
    pub var_name: Option<String>,
}

impl GoogleNewsNode {
    /// Compile a `google_news` token.
    ///
    /// ```text
    /// {% google_news "Barack Obama" %}
    /// {% google_news "Barack Obama" as obama_news %}
    /// ```
    pub fn compile(token: &Token) -> Result<Self, TemplateSyntaxError> {
        let args = token
            .args()
            .ok_or_else(|| TemplateSyntaxError::new(token.name(), "takes at least one argument"))?;

        match AS_VAR.captures(args) {
            Some(caps) => Ok(Self {
                query: Argument::parse(&caps[1]),
                var_name: Some(caps[2].to_string()),
            }),
            None => Ok(Self {
                query: Argument::parse(args),
                var_name: None,
            }),
        }
    }

    /// Inline output lists result titles, one per line.
    #[instrument(level = "info", skip_all, fields(var_name = ?self.var_name))]
    pub async fn render<F: FetchJson>(
        &self,
        context: &mut Context,
        services: &Services<'_, F>,
    ) -> Result<String, RenderError> {
        let query = self.query.resolve_string(context)?;
        let results = search_news(
            services.fetcher,
            &query,
            services.config.google_api_key.as_deref(),
        )
        .await?;

        let inline = results
            .iter()
            .filter_map(|r| r.get("title").and_then(Value::as_str))
            .join("\n");
        Ok(emit(context, self.var_name.as_deref(), Value::Array(results).into(), inline))
    }
}

/// `{% publish2 <function> <subject> [topic] [count] [as <name>] %}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publish2Node {
    pub function: Publish2Function,
    pub subject: Argument,
    pub topic: Option<Argument>,
    pub count: u32,
    pub var_name: Option<String>,
}

impl Publish2Node {
    const USAGE: &'static str = "takes a Publish2 function (get_for_journalist or get_for_newsgroup), \
         a journalist or newsgroup name, an optional topic, an optional count \
         and an optional 'as <name>'";

    /// Compile a `publish2` token.
    ///
    /// ```text
    /// {% publish2 get_for_journalist "Chris Amico" "politics" 5 as my_politics_links %}
    /// {% publish2 get_for_newsgroup "NewsHour" 10 as newshour_links %}
    /// ```
    pub fn compile(token: &Token) -> Result<Self, TemplateSyntaxError> {
        let bits = token.split_contents();
        let tag = bits.first().map(String::as_str).unwrap_or("publish2");
        let syntax = |message: String| TemplateSyntaxError::new(tag, message);

        if bits.len() < 3 {
            return Err(syntax(Self::USAGE.to_string()));
        }
        let function: Publish2Function = bits[1].parse().map_err(syntax)?;
        let subject = Argument::parse(&bits[2]);

        let mut topic = None;
        let mut count = None;
        let mut var_name = None;
        let mut rest = bits[3..].iter();

        while let Some(bit) = rest.next() {
            if bit == "as" {
                let name = rest
                    .next()
                    .filter(|name| IDENTIFIER.is_match(name))
                    .ok_or_else(|| syntax("'as' must be followed by a variable name".into()))?;
                if rest.next().is_some() {
                    return Err(syntax("'as <name>' must come last".into()));
                }
                var_name = Some(name.clone());
            } else if !bit.is_empty() && bit.chars().all(|c| c.is_ascii_digit()) {
                if count.is_some() {
                    return Err(syntax(format!("got a second count {bit:?}; {}", Self::USAGE)));
                }
                let n = bit
                    .parse::<u32>()
                    .map_err(|_| syntax(format!("count {bit:?} is too large")))?;
                count = Some(n);
            } else if topic.is_none() && count.is_none() {
                topic = Some(Argument::parse(bit));
            } else {
                return Err(syntax(format!("unexpected argument {bit:?}; {}", Self::USAGE)));
            }
        }

        Ok(Self {
            function,
            subject,
            topic,
            count: count.unwrap_or(DEFAULT_COUNT),
            var_name,
        })
    }

    /// Inline output is the feed title.
    #[instrument(level = "info", skip_all, fields(function = %self.function, var_name = ?self.var_name))]
    pub async fn render<F: FetchJson>(
        &self,
        context: &mut Context,
        services: &Services<'_, F>,
    ) -> Result<String, RenderError> {
        let subject = self.subject.resolve_string(context)?;
        let topic = self
            .topic
            .as_ref()
            .map(|t| t.resolve_string(context))
            .transpose()?;

        let query = self.function.query(&subject, topic.as_deref(), self.count);
        let feed = Publish2Client::new(services.fetcher).search(&query).await?;

        let inline = feed.to_string();
        Ok(emit(context, self.var_name.as_deref(), feed.into(), inline))
    }
}

/// `{% bitly <url> [as <name>] %}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitlyNode {
    pub url: Argument,
    pub var_name: Option<String>,
}

impl BitlyNode {
    pub fn compile(token: &Token) -> Result<Self, TemplateSyntaxError> {
        let bits = token.split_contents();
        match bits.as_slice() {
            [_, url] => Ok(Self {
                url: Argument::parse(url),
                var_name: None,
            }),
            [_, url, as_, name] if as_ == "as" && IDENTIFIER.is_match(name) => Ok(Self {
                url: Argument::parse(url),
                var_name: Some(name.clone()),
            }),
            _ => Err(TemplateSyntaxError::new(
                token.name(),
                "takes one argument, optionally followed by 'as <name>'",
            )),
        }
    }

    /// Inline output is the short URL.
    #[instrument(level = "info", skip_all, fields(var_name = ?self.var_name))]
    pub async fn render<F: FetchJson>(
        &self,
        context: &mut Context,
        services: &Services<'_, F>,
    ) -> Result<String, RenderError> {
        let (username, api_key) = services
            .config
            .bitly_credentials()
            .ok_or(RenderError::Config("bitly_username and bitly_api_key"))?;

        let long_url = self.url.resolve_string(context)?;
        let short_url = Bitly::new(services.fetcher, username, api_key)
            .shorten(&long_url)
            .await?;

        let inline = short_url.clone();
        Ok(emit(context, self.var_name.as_deref(), short_url.into(), inline))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::fetch::testing::StaticFetcher;
    use serde_json::json;

    #[test]
    fn test_split_contents_keeps_quotes() {
        let token = Token::new(r#"publish2 get_for_journalist "Chris Amico" 'politics' 5 as links"#);
        assert_eq!(
            token.split_contents(),
            vec!["publish2", "get_for_journalist", "\"Chris Amico\"", "'politics'", "5", "as", "links"]
        );
    }

    #[test]
    fn test_argument_parse() {
        assert_eq!(Argument::parse("\"a b\""), Argument::Literal("a b".into()));
        assert_eq!(Argument::parse("'x'"), Argument::Literal("x".into()));
        assert_eq!(Argument::parse("42"), Argument::Number(42));
        assert_eq!(Argument::parse("story.url"), Argument::Variable("story.url".into()));
    }

    #[test]
    fn test_google_news_compile() {
        let node = GoogleNewsNode::compile(&Token::new(r#"google_news "Barack Obama" as obama_news"#)).unwrap();
        assert_eq!(node.query, Argument::Literal("Barack Obama".into()));
        assert_eq!(node.var_name.as_deref(), Some("obama_news"));

        let inline = GoogleNewsNode::compile(&Token::new("google_news topic")).unwrap();
        assert_eq!(inline.query, Argument::Variable("topic".into()));
        assert_eq!(inline.var_name, None);
    }

    #[test]
    fn test_google_news_requires_argument() {
        let err = GoogleNewsNode::compile(&Token::new("google_news")).unwrap_err();
        assert_eq!(err.to_string(), "'google_news' takes at least one argument");
    }

    #[test]
    fn test_publish2_compile_full() {
        let token = Token::new(r#"publish2 get_for_journalist "Chris Amico" "politics" 5 as my_politics_links"#);
        let node = Publish2Node::compile(&token).unwrap();
        assert_eq!(node.function, Publish2Function::ByJournalist);
        assert_eq!(node.subject, Argument::Literal("Chris Amico".into()));
        assert_eq!(node.topic, Some(Argument::Literal("politics".into())));
        assert_eq!(node.count, 5);
        assert_eq!(node.var_name.as_deref(), Some("my_politics_links"));
    }

    #[test]
    fn test_publish2_compile_defaults() {
        let node = Publish2Node::compile(&Token::new(r#"publish2 get_for_newsgroup "NewsHour""#)).unwrap();
        assert_eq!(node.function, Publish2Function::ByNewsgroup);
        assert_eq!(node.topic, None);
        assert_eq!(node.count, DEFAULT_COUNT);
        assert_eq!(node.var_name, None);
    }

    #[test]
    fn test_publish2_unknown_function() {
        let err = Publish2Node::compile(&Token::new(r#"publish2 get_for_anyone "x""#)).unwrap_err();
        assert_eq!(err.tag, "publish2");
        assert!(err.message.contains("get_for_anyone"));
    }

    #[test]
    fn test_publish2_syntax_errors() {
        for bad in [
            "publish2",
            "publish2 get_for_newsgroup",
            r#"publish2 get_for_newsgroup "NewsHour" 10 as"#,
            r#"publish2 get_for_newsgroup "NewsHour" as links extra"#,
            r#"publish2 get_for_newsgroup "NewsHour" 10 20"#,
            r#"publish2 get_for_newsgroup "NewsHour" 10 "late topic""#,
            r#"publish2 get_for_newsgroup "NewsHour" "a" "b""#,
        ] {
            assert!(Publish2Node::compile(&Token::new(bad)).is_err(), "{bad} should not compile");
        }
    }

    #[test]
    fn test_bitly_compile() {
        assert!(BitlyNode::compile(&Token::new("bitly story.url")).is_ok());
        assert!(BitlyNode::compile(&Token::new("bitly story.url as short")).is_ok());
        let err = BitlyNode::compile(&Token::new("bitly")).unwrap_err();
        assert!(err.message.contains("one argument"));
        assert!(BitlyNode::compile(&Token::new("bitly a b c")).is_err());
    }

    #[tokio::test]
    async fn test_publish2_render_binds_feed() {
        let fetcher = StaticFetcher::new(json!({
            "title": "NewsHour",
            "items": [{
                "title": "Story",
                "url": "http://example.com/s",
                "publication_date": "2009-06-15 13:45:30",
                "created_date": "2009-06-15 14:00:00",
                "tags": [{"name": "politics"}]
            }]
        }));
        let config = Config::default();
        let services = Services::new(&fetcher, &config);
        let mut context = Context::new();

        let node = Publish2Node::compile(&Token::new(r#"publish2 get_for_newsgroup "NewsHour" 3 as links"#)).unwrap();
        assert_eq!(node.render(&mut context, &services).await.unwrap(), "");

        let Some(ContextValue::Feed(feed)) = context.get("links") else {
            panic!("feed not bound");
        };
        assert_eq!(feed.items[0].tags[0].name, "politics");
        assert!(fetcher.last_url().contains("newsgroup=NewsHour&tag=&source=&number_of_items=3"));
    }

    #[tokio::test]
    async fn test_google_news_render_inline() {
        let fetcher = StaticFetcher::new(json!({
            "responseData": {"results": [{"title": "A"}, {"title": "B"}]}
        }));
        let config = Config {
            google_api_key: Some("gkey".into()),
            ..Default::default()
        };
        let services = Services::new(&fetcher, &config);
        let mut context = Context::new();
        context.insert("topic", "space");

        let node = GoogleNewsNode::compile(&Token::new("google_news topic")).unwrap();
        assert_eq!(node.render(&mut context, &services).await.unwrap(), "A\nB");
        assert!(fetcher.last_url().ends_with("q=space&key=gkey"));
    }

    #[tokio::test]
    async fn test_bitly_render_requires_credentials() {
        let fetcher = StaticFetcher::default();
        let config = Config::default();
        let services = Services::new(&fetcher, &config);
        let node = BitlyNode::compile(&Token::new(r#"bitly "http://example.com""#)).unwrap();

        let err = node.render(&mut Context::new(), &services).await.unwrap_err();
        assert!(matches!(err, RenderError::Config(_)));
        assert!(fetcher.urls().is_empty());
    }

    #[tokio::test]
    async fn test_bitly_render_binds_short_url() {
        let fetcher = StaticFetcher::new(json!({
            "statusCode": "OK",
            "results": {"http://example.com": {"shortUrl": "http://sh.rt/abc"}}
        }));
        let config = Config {
            bitly_username: Some("newsroom".into()),
            bitly_api_key: Some("R_key".into()),
            ..Default::default()
        };
        let services = Services::new(&fetcher, &config);
        let mut context = Context::new();
        context.insert("story", json!({"url": "http://example.com"}));

        let node = BitlyNode::compile(&Token::new("bitly story.url as short")).unwrap();
        assert_eq!(node.render(&mut context, &services).await.unwrap(), "");
        assert_eq!(context.get("short"), Some(&ContextValue::Text("http://sh.rt/abc".into())));
    }

    #[tokio::test]
    async fn test_unresolved_variable() {
        let fetcher = StaticFetcher::default();
        let config = Config::default();
        let services = Services::new(&fetcher, &config);
        let node = GoogleNewsNode::compile(&Token::new("google_news missing")).unwrap();
        let err = node.render(&mut Context::new(), &services).await.unwrap_err();
        assert!(matches!(err, RenderError::UnresolvedVariable(_)));
    }
}
