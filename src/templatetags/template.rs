//! A minimal template host for the tags and filters in this crate.
//!
//! Supports literal text, `{{ variable|filter:"arg" }}` output and the tags
//! registered in [`TAGS`]. Syntax problems are reported by
//! [`Template::compile`], before anything is fetched.

use super::Services;
use super::context::Context;
use super::filters::{self, FilterFn};
use super::tags::{Argument, BitlyNode, GoogleNewsNode, Publish2Node, Token, split_respecting_quotes};
use crate::error::{RenderError, TemplateSyntaxError};
use crate::fetch::FetchJson;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, instrument};

static BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{%(.*?)%\}|\{\{(.*?)\}\}").expect("valid regex"));

/// Compiles a tag token into a node.
type CompileFn = fn(&Token) -> Result<Node, TemplateSyntaxError>;

/// Every registered tag by name.
pub const TAGS: [(&str, CompileFn); 3] = [
    ("google_news", |t: &Token| GoogleNewsNode::compile(t).map(Node::GoogleNews)),
    ("publish2", |t: &Token| Publish2Node::compile(t).map(Node::Publish2)),
    ("bitly", |t: &Token| BitlyNode::compile(t).map(Node::Bitly)),
];

/// A filter applied in a `{{ }}` expression.
#[derive(Debug, Clone)]
pub struct FilterCall {
    pub name: String,
    pub func: FilterFn,
    pub arg: Option<Argument>,
}

/// `{{ variable|filter:arg|... }}`
#[derive(Debug, Clone)]
pub struct VariableNode {
    pub variable: String,
    pub filters: Vec<FilterCall>,
}

impl VariableNode {
    pub fn compile(expr: &str) -> Result<Self, TemplateSyntaxError> {
        let mut parts = split_respecting_quotes(expr.trim(), |c| c == '|').into_iter();
        let variable = parts
            .next()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| TemplateSyntaxError::new("{{ }}", "empty variable expression"))?;

        let filters = parts
            .map(|part| {
                let (name, arg) = match part.split_once(':') {
                    Some((name, arg)) => (name.trim(), Some(Argument::parse(arg))),
                    None => (part.trim(), None),
                };
                let func = filters::lookup(name)
                    .ok_or_else(|| TemplateSyntaxError::new(name, "is not a registered filter"))?;
                Ok(FilterCall {
                    name: name.to_string(),
                    func,
                    arg,
                })
            })
            .collect::<Result<Vec<_>, TemplateSyntaxError>>()?;

        Ok(Self { variable, filters })
    }

    /// Missing variables render as nothing; filter failures are errors.
    pub fn render(&self, context: &Context) -> Result<String, RenderError> {
        let Some(mut value) = Argument::parse(&self.variable).resolve(context).ok() else {
            debug!(variable = %self.variable, "Variable not in context; rendering empty");
            return Ok(String::new());
        };
        for filter in &self.filters {
            let arg = filter
                .arg
                .as_ref()
                .map(|a| a.resolve_string(context))
                .transpose()?;
            value = (filter.func)(value, arg.as_deref())?;
        }
        Ok(value.render())
    }
}

/// One compiled piece of a template.
#[derive(Debug, Clone)]
pub enum Node {
    Text(String),
    Variable(VariableNode),
    GoogleNews(GoogleNewsNode),
    Publish2(Publish2Node),
    Bitly(BitlyNode),
}

impl Node {
    pub async fn render<F: FetchJson>(
        &self,
        context: &mut Context,
        services: &Services<'_, F>,
    ) -> Result<String, RenderError> {
        match self {
            Node::Text(text) => Ok(text.clone()),
            Node::Variable(node) => node.render(context),
            Node::GoogleNews(node) => node.render(context, services).await,
            Node::Publish2(node) => node.render(context, services).await,
            Node::Bitly(node) => node.render(context, services).await,
        }
    }
}

/// A compiled template.
#[derive(Debug, Clone)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Template {
    /// Compile `source`, failing on the first bad tag or filter.
    ///
    /// Nothing is fetched here; tag arguments are only checked for shape.
    ///
    /// # Examples
    ///
    /// ```
    /// use newsutils::Template;
    ///
    /// assert!(Template::compile(r#"{% bitly story.url as short %}{{ short }}"#).is_ok());
    /// assert!(Template::compile(r#"{% bitly %}"#).is_err());
    /// ```
    #[instrument(level = "debug", skip_all, fields(bytes = source.len()))]
    pub fn compile(source: &str) -> Result<Self, TemplateSyntaxError> {
        let mut nodes = Vec::new();
        let mut last = 0;

        for caps in BLOCK.captures_iter(source) {
            let Some(whole) = caps.get(0) else { continue };
            if whole.start() > last {
                nodes.push(Node::Text(source[last..whole.start()].to_string()));
            }
            last = whole.end();

            if let Some(tag) = caps.get(1) {
                let token = Token::new(tag.as_str());
                let compile = TAGS
                    .iter()
                    .find(|(name, _)| *name == token.name())
                    .map(|(_, compile)| *compile)
                    .ok_or_else(|| TemplateSyntaxError::new(token.name(), "is not a registered tag"))?;
                nodes.push(compile(&token)?);
            } else if let Some(expr) = caps.get(2) {
                nodes.push(Node::Variable(VariableNode::compile(expr.as_str())?));
            }
        }
        if last < source.len() {
            nodes.push(Node::Text(source[last..].to_string()));
        }

        debug!(nodes = nodes.len(), "Compiled template");
        Ok(Self { nodes })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Render every node in order; tags may bind variables for later nodes.
    #[instrument(level = "info", skip_all, fields(nodes = self.nodes.len()))]
    pub async fn render<F: FetchJson>(
        &self,
        context: &mut Context,
        services: &Services<'_, F>,
    ) -> Result<String, RenderError> {
        let mut out = String::new();
        for node in &self.nodes {
            out.push_str(&node.render(context, services).await?);
        }
        Ok(out)
    }
}
