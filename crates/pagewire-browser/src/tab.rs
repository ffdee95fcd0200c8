use crate::error::Result;
use futures::stream::BoxStream;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Opaque handle of one paused network exchange.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExchangeHandle(String);

impl ExchangeHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExchangeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A response paused by the browser before delivery to the page.
///
/// The page stays blocked on it until [`BrowserTab::release`] is called.
#[derive(Debug, Clone)]
pub struct InterceptedExchange {
    pub handle: ExchangeHandle,
    pub url: String,
}

/// Paused exchanges in the order the browser reports them.
pub type ExchangeStream = BoxStream<'static, InterceptedExchange>;

/// Commands the extraction engine issues against one browser tab.
#[async_trait::async_trait]
pub trait BrowserTab: Send + Sync {
    /// Navigate to a URL and wait for the load to finish
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Wait until an element matching `selector` is visible
    async fn wait_visible(&self, selector: &str, timeout: Duration) -> Result<()>;

    /// Evaluate a script and return its JSON value (`Null` for `undefined`)
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value>;

    /// Count the nodes matching `selector`
    async fn query_nodes(&self, selector: &str) -> Result<usize>;

    /// Pause every response whose URL matches `url_pattern` (`*` wildcards)
    /// and stream them to the caller
    async fn enable_interception(&self, url_pattern: &str) -> Result<ExchangeStream>;

    /// Read the body of a paused response
    async fn read_body(&self, handle: &ExchangeHandle) -> Result<Vec<u8>>;

    /// Let a paused response continue to the page unmodified
    async fn release(&self, handle: &ExchangeHandle) -> Result<()>;

    /// Close the tab
    async fn close(&self) -> Result<()>;
}

/// Source of fresh tabs, one per extraction session.
#[async_trait::async_trait]
pub trait TabProvider: Send + Sync {
    async fn open_tab(&self) -> Result<Arc<dyn BrowserTab>>;
}

/// Translate a `*`-wildcard URL pattern into a matcher.
///
/// Mirrors the browser's own pattern semantics so in-memory tabs can filter
/// the same way.
pub fn pattern_matches(pattern: &str, url: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == url;
    }

    let mut rest = url;
    for (index, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        if index == 0 {
            match rest.strip_prefix(part) {
                Some(tail) => rest = tail,
                None => return false,
            }
        } else if index == parts.len() - 1 {
            return rest.ends_with(part);
        } else {
            match rest.find(part) {
                Some(pos) => rest = &rest[pos + part.len()..],
                None => return false,
            }
        }
    }
    true
}
