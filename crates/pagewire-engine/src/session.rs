//! Extraction sessions.
//!
//! One call to [`Extractor::extract`] owns one tab from open to close. It
//! enables interception before navigating, runs the listener and the driver
//! concurrently, and always tears down in the same order: stop the driver,
//! stop the listener, wait for in-flight decode tasks, drain the sinks,
//! close the tab.

use crate::driver::{Driver, DriverProgress, DriverState, Seed};
use crate::error::{ExchangeError, ExtractError};
use crate::gate::ScrollGate;
use crate::listener::{spawn_listener, ExchangeCounters, ListenerContext};
use crate::pacer::Pacer;
use crate::sink::{ErrorSink, ItemSink};
use crate::target::{ItemOf, Target};
use pagewire_browser::{BrowserTab, TabProvider};
use pagewire_core::{ExtractionConfig, ExtractionRequest, SessionId, Timestamp};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// What happened during one session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    pub session_id: SessionId,
    pub started_at: Timestamp,
    pub finished_at: Option<Timestamp>,
    /// Scroll budget after the target's cap
    pub budget: u32,
    /// Exchanges the listener received
    pub exchanges: usize,
    /// Exchanges handed back to the page
    pub released: usize,
    /// Exchanges that decoded successfully
    pub decoded: usize,
    /// Pages counted by the pacer, seed page included
    pub pages: u32,
    pub scrolls: u32,
    /// Exchange errors that did not fit in the error log
    pub dropped_errors: usize,
}

impl SessionStats {
    fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            started_at: Timestamp::now(),
            finished_at: None,
            budget: 0,
            exchanges: 0,
            released: 0,
            decoded: 0,
            pages: 0,
            scrolls: 0,
            dropped_errors: 0,
        }
    }
}

/// Outcome of one session.
///
/// Items gathered before a fatal error are kept; `error` says why the
/// session stopped early.
#[derive(Debug)]
pub struct Extraction<T> {
    /// Items in arrival order, each page contiguous
    pub items: Vec<T>,
    /// Per-exchange failures that did not stop the session
    pub exchange_errors: Vec<ExchangeError>,
    /// The error that ended the session, if any
    pub error: Option<ExtractError>,
    pub stats: SessionStats,
}

impl<T> Extraction<T> {
    fn failed(error: ExtractError, mut stats: SessionStats) -> Self {
        stats.finished_at = Some(Timestamp::now());
        Self {
            items: Vec::new(),
            exchange_errors: Vec::new(),
            error: Some(error),
            stats,
        }
    }

    /// Whether the session ran to completion.
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// Items, or the fatal error if there was one.
    pub fn into_result(self) -> Result<Vec<T>, ExtractError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.items),
        }
    }
}

/// Runs extraction sessions against tabs from a [`TabProvider`].
///
/// Sessions share nothing but the provider, so one extractor can serve
/// many concurrent calls.
pub struct Extractor {
    tabs: Arc<dyn TabProvider>,
    config: ExtractionConfig,
}

impl Extractor {
    /// Create an extractor. Fails on invalid extraction settings.
    pub fn new(tabs: Arc<dyn TabProvider>, config: ExtractionConfig) -> Result<Self, ExtractError> {
        config.validate()?;
        Ok(Self { tabs, config })
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Run one session to completion.
    pub async fn extract<T: Target>(
        &self,
        target: &T,
        request: &ExtractionRequest,
    ) -> Extraction<ItemOf<T>> {
        self.extract_with_cancel(target, request, CancellationToken::new())
            .await
    }

    /// Run one session that stops early when `cancel` fires.
    pub async fn extract_with_cancel<T: Target>(
        &self,
        target: &T,
        request: &ExtractionRequest,
        cancel: CancellationToken,
    ) -> Extraction<ItemOf<T>> {
        let session_id = SessionId::generate();
        let span = tracing::info_span!(
            "extract",
            session = %session_id,
            target = %target.id(),
            term = %request.term,
        );
        self.run_session(target, request, cancel, session_id)
            .instrument(span)
            .await
    }

    async fn run_session<T: Target>(
        &self,
        target: &T,
        request: &ExtractionRequest,
        cancel: CancellationToken,
        session_id: SessionId,
    ) -> Extraction<ItemOf<T>> {
        let mut stats = SessionStats::new(session_id);
        let profile = target.profile();

        if let Err(e) = request.validate() {
            return Extraction::failed(ExtractError::InvalidRequest(e.to_string()), stats);
        }
        let url = match target.page_url(&request.term) {
            Ok(url) => url,
            Err(e) => {
                return Extraction::failed(
                    ExtractError::InvalidRequest(format!("cannot build page URL: {e}")),
                    stats,
                )
            }
        };
        stats.budget = profile.effective_budget(request.scroll_count);

        tracing::info!(
            "Starting extraction from {} (budget={}, delay={:?})",
            url,
            stats.budget,
            request.scroll_delay
        );

        let tab = match self.tabs.open_tab().await {
            Ok(tab) => tab,
            Err(e) => return Extraction::failed(ExtractError::Browser(e), stats),
        };

        let exchanges = match tab.enable_interception(&profile.intercept_pattern).await {
            Ok(exchanges) => exchanges,
            Err(e) => {
                close_tab(tab.as_ref()).await;
                return Extraction::failed(ExtractError::Browser(e), stats);
            }
        };

        let session = cancel.child_token();
        let listener_stop = session.child_token();

        let pacer = Pacer::new(stats.budget, request.scroll_delay);
        let (gate_writer, gate_reader) = ScrollGate::new(pacer);
        let pacer_view = gate_writer.view();
        let (items, item_sink) = ItemSink::spawn();
        let errors = ErrorSink::new(self.config.error_capacity);
        let counters = Arc::new(ExchangeCounters::default());
        let decoder = target.decoder();

        // The seed page owns the first round, taken before any exchange can.
        let seed = match &profile.seed_script {
            Some(script) => gate_writer.acquire().await.map(|round| Seed {
                script: script.clone(),
                decoder: Arc::clone(&decoder),
                items: items.clone(),
                errors: errors.clone(),
                round,
                cancel: session.clone(),
            }),
            None => None,
        };

        let listener = spawn_listener(
            ListenerContext {
                tab: Arc::clone(&tab),
                decoder,
                items: items.clone(),
                errors: errors.clone(),
                gate: gate_writer,
                counters: Arc::clone(&counters),
                profile: Arc::new(profile.clone()),
                budget: stats.budget,
                session: session.clone(),
            },
            exchanges,
            listener_stop.clone(),
        );

        drop(items);

        let driver = Driver {
            tab: tab.as_ref(),
            profile,
            url: url.as_str(),
            budget: stats.budget,
            element_timeout: self.config.element_timeout(),
            idle_timeout: self
                .config
                .idle_timeout()
                .map(|idle| idle + request.scroll_delay),
            seed,
        };

        let mut progress = DriverProgress::default();
        let outcome = run_bounded(
            driver.run(gate_reader, &mut progress),
            &session,
            self.config.session_timeout(),
        )
        .await;
        if progress.state != DriverState::Done {
            tracing::debug!("Driver stopped in state {:?}", progress.state);
        }

        // Pacer delays are moot once the driver is gone.
        session.cancel();
        listener_stop.cancel();
        self.await_listener(listener).await;

        let items = item_sink.drain().await;
        let (exchange_errors, dropped_errors) = errors.drain();
        close_tab(tab.as_ref()).await;

        stats.exchanges = counters.seen();
        stats.released = counters.released();
        stats.decoded = counters.decoded();
        stats.pages = pacer_view.pages().await;
        stats.scrolls = progress.scrolls;
        stats.dropped_errors = dropped_errors;
        stats.finished_at = Some(Timestamp::now());

        let error = outcome.err();
        match &error {
            None => tracing::info!(
                "Extracted {} items from {} pages ({} exchange errors)",
                items.len(),
                stats.pages,
                exchange_errors.len()
            ),
            Some(e) => tracing::warn!(
                "Extraction stopped with {} items: {}",
                items.len(),
                e
            ),
        }

        Extraction {
            items,
            exchange_errors,
            error,
            stats,
        }
    }

    async fn await_listener(&self, mut listener: tokio::task::JoinHandle<()>) {
        let grace = self.config.teardown_grace();
        match tokio::time::timeout(grace, &mut listener).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("Listener task failed: {}", e),
            Err(_) => {
                tracing::warn!("Decode tasks still running after {:?}, aborting", grace);
                listener.abort();
                let _ = listener.await;
            }
        }
    }
}

/// Run the driver under the caller's token and the session deadline.
async fn run_bounded<F>(
    driver: F,
    session: &CancellationToken,
    deadline: Option<Duration>,
) -> Result<(), ExtractError>
where
    F: std::future::Future<Output = Result<(), ExtractError>>,
{
    let deadline = async {
        match deadline {
            Some(limit) => {
                tokio::time::sleep(limit).await;
                limit
            }
            None => std::future::pending().await,
        }
    };

    // Cancellation wins over a driver that stopped because of it.
    tokio::select! {
        biased;
        () = session.cancelled() => Err(ExtractError::Cancelled),
        result = driver => result,
        limit = deadline => Err(ExtractError::DeadlineExceeded(limit)),
    }
}

async fn close_tab(tab: &dyn BrowserTab) {
    if let Err(e) = tab.close().await {
        tracing::warn!("Failed to close tab: {}", e);
    }
}
