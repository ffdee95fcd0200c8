//! Error types for extraction sessions.
//!
//! [`ExtractError`] ends a session; [`ExchangeError`] and [`DecodeError`]
//! stay local to one intercepted exchange and never abort the session.

use pagewire_browser::BrowserError;
use pagewire_core::ConfigError;
use std::time::Duration;
use thiserror::Error;

/// Session-fatal errors.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Invalid extraction settings, reported before any session starts
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The request cannot address a page
    #[error("invalid extraction request: {0}")]
    InvalidRequest(String),

    /// The page failed to load
    #[error("navigation to {url} failed: {source}")]
    Navigation {
        /// Page URL
        url: String,
        /// Underlying browser error
        #[source]
        source: BrowserError,
    },

    /// The content container never became visible
    #[error("content {selector} did not appear within {timeout:?}")]
    ElementTimeout {
        /// Container selector
        selector: String,
        /// Bounded wait that expired
        timeout: Duration,
    },

    /// A scroll, prime, or seed script failed
    #[error("script evaluation failed: {0}")]
    ScriptEvaluation(#[source] BrowserError),

    /// Any other browser command failed
    #[error("browser error: {0}")]
    Browser(#[from] BrowserError),

    /// The caller cancelled the session
    #[error("extraction cancelled")]
    Cancelled,

    /// The session deadline passed
    #[error("extraction exceeded its {0:?} deadline")]
    DeadlineExceeded(Duration),
}

/// Errors local to one intercepted exchange.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// The paused response body could not be read
    #[error("failed to read response body from {url}: {source}")]
    Read {
        /// Exchange URL
        url: String,
        /// Underlying browser error
        #[source]
        source: BrowserError,
    },

    /// The paused response could not be handed back to the page
    #[error("failed to release exchange {url}: {source}")]
    Release {
        /// Exchange URL
        url: String,
        /// Underlying browser error
        #[source]
        source: BrowserError,
    },

    /// The body did not decode
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        /// Exchange URL
        url: String,
        /// Decoder error
        #[source]
        source: DecodeError,
    },
}

impl ExchangeError {
    /// URL of the exchange that failed.
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Read { url, .. } | Self::Release { url, .. } | Self::Decode { url, .. } => url,
        }
    }

    /// Whether the body was read but did not decode.
    #[must_use]
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }
}

/// Errors raised by response decoders.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The body is not valid JSON
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The body is JSON but not of any shape the decoder knows
    #[error("unexpected payload shape: {0}")]
    Schema(String),

    /// The decoder panicked on this body
    #[error("decoder panicked: {0}")]
    Panicked(String),
}

/// Result type for session-level operations.
pub type Result<T> = std::result::Result<T, ExtractError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_error_display() {
        let err = ExtractError::ElementTimeout {
            selector: "[data-e2e=\"user-post-item-list\"]".to_string(),
            timeout: Duration::from_secs(30),
        };
        assert_eq!(
            err.to_string(),
            "content [data-e2e=\"user-post-item-list\"] did not appear within 30s"
        );

        let err = ExtractError::Navigation {
            url: "https://tiktok.com/@nobody".to_string(),
            source: BrowserError::Navigation("net::ERR_ABORTED".to_string()),
        };
        assert!(err.to_string().contains("https://tiktok.com/@nobody"));
    }

    #[test]
    fn test_exchange_error_accessors() {
        let source = serde_json::from_slice::<serde_json::Value>(b"<html>")
            .expect_err("html is not json");
        let err = ExchangeError::Decode {
            url: "https://www.youtube.com/youtubei/v1/next".to_string(),
            source: DecodeError::from(source),
        };
        assert!(err.is_decode());
        assert_eq!(err.url(), "https://www.youtube.com/youtubei/v1/next");

        let err = ExchangeError::Read {
            url: "https://a.test/api".to_string(),
            source: BrowserError::Closed,
        };
        assert!(!err.is_decode());
    }

    #[test]
    fn test_config_error_conversion() {
        let err: ExtractError = ConfigError::NoConfigDir.into();
        assert!(matches!(err, ExtractError::Config(_)));
    }
}
