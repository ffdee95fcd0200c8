//! Extraction targets.
//!
//! A target bundles everything that differs between sites: where the page
//! lives, which responses carry the data, which element marks the content,
//! how to scroll, and how to decode. The engine itself is the same for all.

use crate::decoder::ResponseDecoder;
use pagewire_core::TargetId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use url::Url;

/// Scroll to the bottom of the document.
pub const SCROLL_TO_BOTTOM: &str = "window.scrollTo(0, document.body.scrollHeight);";

/// Site-specific selectors and scripts for one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetProfile {
    /// Browser URL pattern of the data responses (`*` wildcards)
    pub intercept_pattern: String,
    /// Extra substring an intercepted URL must contain to be decoded
    pub url_contains: Option<String>,
    /// Element whose visibility marks the initial content
    pub content_selector: String,
    /// Elements counted before each scroll
    pub item_selector: String,
    /// Script that triggers the next page load
    pub scroll_script: String,
    /// Script run once after the initial content appears
    pub prime_script: Option<String>,
    /// Script returning inline first-page data to decode
    pub seed_script: Option<String>,
    /// Hard cap on scroll commands regardless of the request
    pub max_scrolls: Option<u32>,
}

impl TargetProfile {
    /// Profile scrolling the document body.
    #[must_use]
    pub fn new(
        intercept_pattern: impl Into<String>,
        content_selector: impl Into<String>,
        item_selector: impl Into<String>,
    ) -> Self {
        Self {
            intercept_pattern: intercept_pattern.into(),
            url_contains: None,
            content_selector: content_selector.into(),
            item_selector: item_selector.into(),
            scroll_script: SCROLL_TO_BOTTOM.to_string(),
            prime_script: None,
            seed_script: None,
            max_scrolls: None,
        }
    }

    #[must_use]
    pub fn with_url_contains(mut self, fragment: impl Into<String>) -> Self {
        self.url_contains = Some(fragment.into());
        self
    }

    #[must_use]
    pub fn with_scroll_script(mut self, script: impl Into<String>) -> Self {
        self.scroll_script = script.into();
        self
    }

    #[must_use]
    pub fn with_prime_script(mut self, script: impl Into<String>) -> Self {
        self.prime_script = Some(script.into());
        self
    }

    #[must_use]
    pub fn with_seed_script(mut self, script: impl Into<String>) -> Self {
        self.seed_script = Some(script.into());
        self
    }

    #[must_use]
    pub fn with_max_scrolls(mut self, max_scrolls: u32) -> Self {
        self.max_scrolls = Some(max_scrolls);
        self
    }

    /// Scroll budget for a request, after the profile's own cap.
    #[must_use]
    pub fn effective_budget(&self, requested: u32) -> u32 {
        self.max_scrolls
            .map_or(requested, |cap| requested.min(cap))
    }

    /// Whether an intercepted URL should be decoded.
    #[must_use]
    pub fn accepts_url(&self, url: &str) -> bool {
        self.url_contains
            .as_deref()
            .map_or(true, |fragment| url.contains(fragment))
    }
}

/// Everything the engine needs to extract from one site.
pub trait Target: Send + Sync {
    /// Decoder for this target's responses
    type Decoder: ResponseDecoder;

    /// Stable identifier, used in logs
    fn id(&self) -> &TargetId;

    /// Selectors and scripts
    fn profile(&self) -> &TargetProfile;

    /// Shared decoder handed to every decode task
    fn decoder(&self) -> Arc<Self::Decoder>;

    /// Page to open for a search term, handle, or id
    fn page_url(&self, term: &str) -> Result<Url, url::ParseError>;
}

/// Item type produced by a target.
pub type ItemOf<T> = <<T as Target>::Decoder as ResponseDecoder>::Item;
