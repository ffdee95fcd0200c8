//! In-memory tab that replays a scripted sequence of paginated responses.

#![allow(dead_code)]

use async_trait::async_trait;
use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures::StreamExt;
use pagewire_browser::{
    pattern_matches, BrowserError, BrowserTab, ExchangeHandle, ExchangeStream,
    InterceptedExchange, Result as BrowserResult, TabProvider,
};
use pagewire_core::{ExtractionConfig, TargetId};
use pagewire_engine::{
    parse_json, DecodeError, DecodedPage, Extractor, ResponseDecoder, Target, TargetProfile,
    SCROLL_TO_BOTTOM,
};
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::{HashMap, VecDeque};
use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use url::Url;

pub const SEED_SCRIPT: &str = "window.__feedData";
pub const INTERCEPT_PATTERN: &str = "*/api/*";

/// One response the fake site serves.
#[derive(Debug, Clone)]
pub struct Response {
    pub url: String,
    pub body: Vec<u8>,
}

impl Response {
    pub fn page(n: u32, items: Range<u32>, has_more: bool) -> Self {
        let body = serde_json::json!({
            "items": items.collect::<Vec<_>>(),
            "has_more": has_more,
        });
        Self {
            url: format!("https://feed.test/api/list?page={n}"),
            body: serde_json::to_vec(&body).expect("serialize page"),
        }
    }

    pub fn malformed(n: u32) -> Self {
        Self {
            url: format!("https://feed.test/api/list?page={n}"),
            body: b"<html>rate limited</html>".to_vec(),
        }
    }

    pub fn at(url: &str, body: &[u8]) -> Self {
        Self {
            url: url.to_string(),
            body: body.to_vec(),
        }
    }
}

/// What the fake site does.
#[derive(Debug, Clone, Default)]
pub struct Scenario {
    /// Served during navigation
    pub initial: Vec<Response>,
    /// Served by the nth scroll
    pub on_scroll: Vec<Vec<Response>>,
    /// Value returned by the seed script
    pub seed: Option<serde_json::Value>,
    pub fail_navigate: bool,
    pub never_visible: bool,
    /// Index of the scroll that throws
    pub fail_scroll_at: Option<usize>,
    /// URLs whose bodies cannot be read
    pub unreadable: Vec<String>,
}

impl Scenario {
    /// `pages` pages of `per_page` items, the last one reporting no more.
    pub fn paged(pages: u32, per_page: u32) -> Self {
        let page = |n: u32| {
            Response::page(n, n * per_page..(n + 1) * per_page, n + 1 < pages)
        };
        Self {
            initial: vec![page(0)],
            on_scroll: (1..pages).map(|n| vec![page(n)]).collect(),
            ..Self::default()
        }
    }
}

pub struct MockTab {
    scenario: Scenario,
    pattern: Mutex<Option<String>>,
    tx: UnboundedSender<InterceptedExchange>,
    rx: Mutex<Option<UnboundedReceiver<InterceptedExchange>>>,
    bodies: Mutex<HashMap<String, Response>>,
    release_calls: Mutex<HashMap<String, usize>>,
    next_id: AtomicUsize,
    emitted: AtomicUsize,
    released: watch::Sender<usize>,
    scrolls: AtomicUsize,
    closed: AtomicBool,
}

impl MockTab {
    pub fn new(scenario: Scenario) -> Arc<Self> {
        let (tx, rx) = unbounded();
        let (released, _) = watch::channel(0);
        Arc::new(Self {
            scenario,
            pattern: Mutex::new(None),
            tx,
            rx: Mutex::new(Some(rx)),
            bodies: Mutex::new(HashMap::new()),
            release_calls: Mutex::new(HashMap::new()),
            next_id: AtomicUsize::new(1),
            emitted: AtomicUsize::new(0),
            released,
            scrolls: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        })
    }

    /// Successful scroll scripts.
    pub fn scrolls(&self) -> usize {
        self.scrolls.load(Ordering::SeqCst)
    }

    pub fn emitted(&self) -> usize {
        self.emitted.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// How often each emitted exchange was released.
    pub fn release_counts(&self) -> Vec<usize> {
        let bodies = self.bodies.lock();
        let calls = self.release_calls.lock();
        bodies
            .keys()
            .map(|id| calls.get(id).copied().unwrap_or(0))
            .collect()
    }

    fn emit(&self, responses: &[Response]) {
        let Some(pattern) = self.pattern.lock().clone() else {
            return;
        };
        for response in responses {
            if !pattern_matches(&pattern, &response.url) {
                continue;
            }
            let id = format!(
                "interception-job-{}.0",
                self.next_id.fetch_add(1, Ordering::SeqCst)
            );
            self.bodies.lock().insert(id.clone(), response.clone());
            self.emitted.fetch_add(1, Ordering::SeqCst);
            let _ = self.tx.unbounded_send(InterceptedExchange {
                handle: ExchangeHandle::new(id),
                url: response.url.clone(),
            });
        }
    }
}

#[async_trait]
impl BrowserTab for MockTab {
    async fn navigate(&self, url: &str) -> BrowserResult<()> {
        if self.scenario.fail_navigate {
            return Err(BrowserError::Navigation(format!(
                "{url}: net::ERR_NAME_NOT_RESOLVED"
            )));
        }
        self.emit(&self.scenario.initial);
        Ok(())
    }

    async fn wait_visible(&self, selector: &str, timeout: Duration) -> BrowserResult<()> {
        if self.scenario.never_visible {
            tokio::time::sleep(timeout).await;
            return Err(BrowserError::Timeout(selector.to_string()));
        }
        // Content renders once the page has received every paused response.
        let target = self.emitted();
        let mut rx = self.released.subscribe();
        let rendered = async move { rx.wait_for(|n| *n >= target).await.map(|_| ()) };
        match tokio::time::timeout(timeout, rendered).await {
            Ok(Ok(())) => Ok(()),
            _ => Err(BrowserError::Timeout(selector.to_string())),
        }
    }

    async fn evaluate(&self, script: &str) -> BrowserResult<serde_json::Value> {
        if script == SEED_SCRIPT {
            return Ok(self.scenario.seed.clone().unwrap_or_default());
        }
        if script == SCROLL_TO_BOTTOM {
            let n = self.scrolls.load(Ordering::SeqCst);
            if self.scenario.fail_scroll_at == Some(n) {
                return Err(BrowserError::Evaluation(
                    "Cannot read properties of null (reading 'scrollHeight')".to_string(),
                ));
            }
            self.scrolls.fetch_add(1, Ordering::SeqCst);
            if let Some(responses) = self.scenario.on_scroll.get(n) {
                self.emit(responses);
            }
        }
        Ok(serde_json::Value::Null)
    }

    async fn query_nodes(&self, _selector: &str) -> BrowserResult<usize> {
        Ok(self.emitted())
    }

    async fn enable_interception(&self, url_pattern: &str) -> BrowserResult<ExchangeStream> {
        *self.pattern.lock() = Some(url_pattern.to_string());
        let rx = self
            .rx
            .lock()
            .take()
            .ok_or_else(|| BrowserError::Interception("already enabled".to_string()))?;
        Ok(rx.boxed())
    }

    async fn read_body(&self, handle: &ExchangeHandle) -> BrowserResult<Vec<u8>> {
        let response = self
            .bodies
            .lock()
            .get(handle.as_str())
            .cloned()
            .ok_or_else(|| BrowserError::Interception(format!("unknown exchange {handle}")))?;
        if self.scenario.unreadable.contains(&response.url) {
            return Err(BrowserError::Interception(format!(
                "No resource with given identifier found: {handle}"
            )));
        }
        Ok(response.body)
    }

    async fn release(&self, handle: &ExchangeHandle) -> BrowserResult<()> {
        *self
            .release_calls
            .lock()
            .entry(handle.as_str().to_string())
            .or_insert(0) += 1;
        self.released.send_modify(|n| *n += 1);
        Ok(())
    }

    async fn close(&self) -> BrowserResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Hands out prepared tabs in order.
pub struct MockProvider {
    tabs: Mutex<VecDeque<Arc<MockTab>>>,
    opened: AtomicUsize,
}

impl MockProvider {
    pub fn new(tabs: Vec<Arc<MockTab>>) -> Arc<Self> {
        Arc::new(Self {
            tabs: Mutex::new(tabs.into()),
            opened: AtomicUsize::new(0),
        })
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TabProvider for MockProvider {
    async fn open_tab(&self) -> BrowserResult<Arc<dyn BrowserTab>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        let tab = self.tabs.lock().pop_front().ok_or(BrowserError::Closed)?;
        Ok(tab as Arc<dyn BrowserTab>)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Listing {
    items: Vec<u32>,
    has_more: bool,
}

pub struct ListingDecoder;

impl ResponseDecoder for ListingDecoder {
    type Item = u32;

    fn decode(&self, body: &[u8]) -> Result<DecodedPage<u32>, DecodeError> {
        let listing: Listing = parse_json(body)?;
        Ok(DecodedPage::new(listing.items, listing.has_more))
    }
}

/// Decoder that panics on every body, standing in for a decoder bug.
pub struct PanickingDecoder;

impl ResponseDecoder for PanickingDecoder {
    type Item = u32;

    fn decode(&self, _body: &[u8]) -> Result<DecodedPage<u32>, DecodeError> {
        panic!("index out of bounds: the len is 0 but the index is 0")
    }
}

/// Target for the fake feed site.
pub struct FeedTarget<D = ListingDecoder> {
    id: TargetId,
    profile: TargetProfile,
    decoder: Arc<D>,
}

impl FeedTarget {
    pub fn new() -> Self {
        Self::with_decoder(ListingDecoder)
    }

    pub fn with_profile(customize: impl FnOnce(TargetProfile) -> TargetProfile) -> Self {
        let mut target = Self::new();
        target.profile = customize(target.profile);
        target
    }
}

impl<D: ResponseDecoder> FeedTarget<D> {
    pub fn with_decoder(decoder: D) -> Self {
        Self {
            id: TargetId::new("feed-search").expect("valid target id"),
            profile: TargetProfile::new(INTERCEPT_PATTERN, "#feed", "#feed .card"),
            decoder: Arc::new(decoder),
        }
    }
}

impl<D: ResponseDecoder> Target for FeedTarget<D> {
    type Decoder = D;

    fn id(&self) -> &TargetId {
        &self.id
    }

    fn profile(&self) -> &TargetProfile {
        &self.profile
    }

    fn decoder(&self) -> Arc<D> {
        Arc::clone(&self.decoder)
    }

    fn page_url(&self, term: &str) -> Result<Url, url::ParseError> {
        let mut url = Url::parse("https://feed.test/search")?;
        url.query_pairs_mut().append_pair("q", term);
        Ok(url)
    }
}

pub fn test_config() -> ExtractionConfig {
    ExtractionConfig {
        default_scroll_delay_ms: 0,
        element_timeout_secs: 1,
        idle_timeout_secs: 0,
        session_timeout_secs: 20,
        teardown_grace_ms: 2000,
        error_capacity: 64,
    }
}

pub fn extractor(tabs: Vec<Arc<MockTab>>, config: ExtractionConfig) -> (Extractor, Arc<MockProvider>) {
    let provider = MockProvider::new(tabs);
    let extractor = Extractor::new(provider.clone(), config).expect("valid config");
    (extractor, provider)
}
