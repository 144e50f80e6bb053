//! # newsutils
//!
//! Command-line front end for the newsutils clients and template tags.
//!
//! ## Usage
//!
//! ```sh
//! newsutils news "Barack Obama"
//! newsutils links --newsgroup NewsHour --count 5
//! newsutils shorten http://www.example.com/blog
//! newsutils parse-date "Mon, 15 Jun 2009 13:45:30 -0400" --format "%B %d, %Y %H:%M"
//! newsutils render page.txt --var topic=space
//! ```
//!
//! Set `RUST_LOG=debug` to see request URLs and timings.

use clap::Parser;
use itertools::Itertools;
use newsutils::cli::{Cli, Command};
use newsutils::clients::{bitly::Bitly, google_news, publish2};
use newsutils::utils::{format_datetime, parse_date};
use newsutils::{Context, FeedQuery, HttpFetcher, Services, Template};
use serde_json::Value;
use std::error::Error;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    let args = Cli::parse();
    debug!(command = ?args.command, config = ?args.config, "Parsed CLI arguments");

    let config = args.load_config()?;
    let fetcher = HttpFetcher::new(&config)?;
    debug!(headers = ?fetcher.defaults(), "HTTP client ready");

    let result = run(args.command, &config, &fetcher).await;
    if let Err(e) = &result {
        error!(error = %e, "Command failed");
    }

    let elapsed = start_time.elapsed();
    info!(millis = elapsed.as_millis() as u64, "Execution complete");
    result
}

async fn run(
    command: Command,
    config: &newsutils::Config,
    fetcher: &HttpFetcher,
) -> Result<(), Box<dyn Error>> {
    match command {
        Command::News { query } => {
            let results =
                google_news::search_news(fetcher, &query, config.google_api_key.as_deref()).await?;
            for result in &results {
                let field = |name: &str| result.get(name).and_then(Value::as_str).unwrap_or_default();
                println!("{}\n    {}", field("titleNoFormatting"), field("unescapedUrl"));
            }
        }

        Command::Links {
            query,
            newsgroup,
            tag,
            source,
            count,
            filters,
        } => {
            let query = filters.into_iter().fold(
                FeedQuery::new(query)
                    .newsgroup(newsgroup)
                    .tag(tag)
                    .source(source)
                    .count(count),
                |q, (key, value)| q.filter(key, value),
            );
            let feed = publish2::search(fetcher, &query).await?;

            println!("{feed}");
            for link in &feed.items {
                println!(
                    "- {} <{}>\n    published {} | added {} | tags: {}",
                    link,
                    link.url.as_deref().unwrap_or("-"),
                    link.publication_date,
                    link.created_date,
                    link.tags.iter().join(", ")
                );
            }
        }

        Command::Shorten { url } => {
            let (username, api_key) = config
                .bitly_credentials()
                .ok_or("bit.ly credentials are not configured (BITLY_USERNAME, BITLY_API_KEY)")?;
            let short_url = Bitly::new(fetcher, username, api_key).shorten(&url).await?;
            println!("{short_url}");
        }

        Command::ParseDate { value, format } => {
            let dt = parse_date(&value)?;
            match format {
                Some(format) => println!("{}", format_datetime(&dt, &format)?),
                None => println!("{dt}"),
            }
        }

        Command::Render { template, vars } => {
            let source = tokio::fs::read_to_string(&template).await?;
            let compiled = Template::compile(&source)?;

            let mut context = Context::new();
            for (name, value) in vars {
                context.insert(name, value);
            }
            let services = Services::new(fetcher, config);
            print!("{}", compiled.render(&mut context, &services).await?);
        }
    }
    Ok(())
}
