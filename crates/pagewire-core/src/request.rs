//! The caller-supplied description of one extraction.

use crate::error::PagewireError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Delay between scroll triggers when the caller does not pick one.
pub const DEFAULT_SCROLL_DELAY: Duration = Duration::from_secs(2);

/// Immutable input to one extraction call.
///
/// `scroll_count` is the number of scroll commands the session may issue
/// after the initial page load; zero means "first page only".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionRequest {
    /// Search term, user handle, or video id, depending on the target
    pub term: String,
    /// Maximum number of scroll commands
    pub scroll_count: u32,
    /// Minimum delay between consecutive scroll triggers
    #[serde(with = "duration_millis")]
    pub scroll_delay: Duration,
}

impl ExtractionRequest {
    /// First-page-only request for `term` with the default scroll delay.
    #[must_use]
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            scroll_count: 0,
            scroll_delay: DEFAULT_SCROLL_DELAY,
        }
    }

    /// Set the scroll budget.
    #[must_use]
    pub fn with_scroll_count(mut self, scroll_count: u32) -> Self {
        self.scroll_count = scroll_count;
        self
    }

    /// Set the inter-scroll delay.
    #[must_use]
    pub fn with_scroll_delay(mut self, scroll_delay: Duration) -> Self {
        self.scroll_delay = scroll_delay;
        self
    }

    /// Reject requests that cannot address any page.
    pub fn validate(&self) -> Result<(), PagewireError> {
        if self.term.trim().is_empty() {
            return Err(PagewireError::Validation(
                "extraction term cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[allow(clippy::cast_possible_truncation)]
    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
