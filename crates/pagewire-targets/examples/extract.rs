//! Run one extraction from the command line and print the items as JSON.
//!
//! ```text
//! cargo run -p pagewire-targets --example extract -- tiktok-search golang 3
//! RUST_LOG=pagewire_engine=debug cargo run -p pagewire-targets --example extract -- youtube-comments r4-cftqTcdI 5
//! ```
//!
//! Browser and timing settings come from the usual config file and
//! `PAGEWIRE_*` environment overrides.

use anyhow::{bail, Context, Result};
use pagewire_browser::BrowserEngine;
use pagewire_core::{AppConfig, ExtractionRequest};
use pagewire_engine::{Extraction, Extractor};
use pagewire_targets::{TikTok, YouTube};
use serde::Serialize;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const TARGETS: &str = "tiktok-search, tiktok-user-content, tiktok-search-user, \
                       youtube-search-channel, youtube-comments, youtube-search-content";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(target), Some(term)) = (args.next(), args.next()) else {
        bail!("usage: extract <target> <term> [scrolls]\n  targets: {TARGETS}");
    };
    let scrolls = match args.next() {
        Some(value) => value.parse().context("scrolls must be a number")?,
        None => 0,
    };

    let config = AppConfig::load_with_env().context("failed to load config")?;
    let request = ExtractionRequest::new(term)
        .with_scroll_count(scrolls)
        .with_scroll_delay(config.extraction.default_scroll_delay());

    let browser = Arc::new(BrowserEngine::launch(&config.browser).await?);
    let extractor = Arc::new(Extractor::new(browser.clone(), config.extraction.clone())?);
    let tiktok = TikTok::new(extractor.clone())?;
    let youtube = YouTube::new(extractor)?;

    let outcome = match target.as_str() {
        "tiktok-search" => report(tiktok.search(&request).await),
        "tiktok-user-content" => report(tiktok.user_content(&request).await),
        "tiktok-search-user" => report(tiktok.search_user(&request).await),
        "youtube-search-channel" => report(youtube.search_channel(&request).await),
        "youtube-comments" => report(youtube.content_comments(&request).await),
        "youtube-search-content" => report(youtube.search_content(&request).await),
        other => Err(anyhow::anyhow!("unknown target '{other}'; expected one of: {TARGETS}")),
    };

    // The wrappers hold the last extractor references to the browser.
    drop((tiktok, youtube));
    match Arc::try_unwrap(browser) {
        Ok(browser) => browser.shutdown().await?,
        Err(_) => tracing::warn!("Browser still shared, leaving it to drop"),
    }

    outcome
}

fn report<T: Serialize>(extraction: Extraction<T>) -> Result<()> {
    for error in &extraction.exchange_errors {
        tracing::warn!("Skipped response: {}", error);
    }
    tracing::info!(
        "{} items from {} pages ({} scrolls)",
        extraction.items.len(),
        extraction.stats.pages,
        extraction.stats.scrolls
    );

    println!("{}", serde_json::to_string_pretty(&extraction.items)?);

    match extraction.error {
        Some(error) => Err(error).context("extraction stopped early"),
        None => Ok(()),
    }
}
