//! Ready-made extraction targets for the Pagewire engine.
//!
//! Each target pairs a [`TargetProfile`](pagewire_engine::TargetProfile)
//! with a decoder for the site's internal API. Use them directly with an
//! [`Extractor`](pagewire_engine::Extractor), or through the [`TikTok`] and
//! [`YouTube`] wrappers.
//!
//! # Example
//!
//! ```rust,no_run
//! use pagewire_browser::BrowserEngine;
//! use pagewire_core::{AppConfig, ExtractionRequest};
//! use pagewire_engine::Extractor;
//! use pagewire_targets::TikTok;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::load_with_env()?;
//! let browser = Arc::new(BrowserEngine::launch(&config.browser).await?);
//! let extractor = Arc::new(Extractor::new(browser, config.extraction.clone())?);
//!
//! let tiktok = TikTok::new(extractor)?;
//! let request = ExtractionRequest::new("golang")
//!     .with_scroll_count(3)
//!     .with_scroll_delay(config.extraction.default_scroll_delay());
//! let videos = tiktok.search(&request).await.into_result()?;
//! println!("{} videos", videos.len());
//! # Ok(())
//! # }
//! ```

mod lenient;
pub mod site;
pub mod tiktok;
pub mod youtube;

pub use site::{SiteTarget, UrlBuilder};
pub use tiktok::TikTok;
pub use youtube::YouTube;
