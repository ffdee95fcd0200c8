//! Interception listener.
//!
//! Consumes paused exchanges and runs one decode task per exchange. Every
//! task reads the body, releases the exchange exactly once, decodes, hands
//! the page to the item sink, and then takes its turn at the scroll gate.
//!
//! Pages are numbered in arrival order, the seed page (if any) being page
//! zero. Only pages within the scroll budget reach the item sink; later ones
//! are decoded and counted but their items are dropped.

use crate::decoder::{decode_guarded, DecodedPage, ResponseDecoder};
use crate::error::ExchangeError;
use crate::gate::GateWriter;
use crate::sink::{ErrorSink, SinkHandle};
use crate::target::TargetProfile;
use futures::{FutureExt, StreamExt};
use pagewire_browser::{BrowserTab, ExchangeStream, InterceptedExchange};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

/// Exchange counters, readable after the listener is gone.
#[derive(Debug, Default)]
pub struct ExchangeCounters {
    seen: AtomicUsize,
    released: AtomicUsize,
    decoded: AtomicUsize,
}

impl ExchangeCounters {
    pub fn seen(&self) -> usize {
        self.seen.load(Ordering::Relaxed)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::Relaxed)
    }

    pub fn decoded(&self) -> usize {
        self.decoded.load(Ordering::Relaxed)
    }
}

/// What every decode task needs.
pub(crate) struct ListenerContext<D: ResponseDecoder> {
    pub tab: Arc<dyn BrowserTab>,
    pub decoder: Arc<D>,
    pub items: SinkHandle<D::Item>,
    pub errors: ErrorSink,
    pub gate: GateWriter,
    pub counters: Arc<ExchangeCounters>,
    pub profile: Arc<TargetProfile>,
    /// Scroll budget; pages numbered above it are not admitted
    pub budget: u32,
    /// Cancels pacer delays
    pub session: CancellationToken,
}

impl<D: ResponseDecoder> Clone for ListenerContext<D> {
    fn clone(&self) -> Self {
        Self {
            tab: Arc::clone(&self.tab),
            decoder: Arc::clone(&self.decoder),
            items: self.items.clone(),
            errors: self.errors.clone(),
            gate: self.gate.clone(),
            counters: Arc::clone(&self.counters),
            profile: Arc::clone(&self.profile),
            budget: self.budget,
            session: self.session.clone(),
        }
    }
}

impl<D: ResponseDecoder> ListenerContext<D> {
    async fn release(&self, exchange: &InterceptedExchange) -> Result<(), ExchangeError> {
        self.tab
            .release(&exchange.handle)
            .await
            .map_err(|source| ExchangeError::Release {
                url: exchange.url.clone(),
                source,
            })?;
        self.counters.released.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Run the listener until `stop` fires or the stream ends.
///
/// Exchanges still buffered when `stop` fires are released without being
/// decoded. The returned task finishes after every decode task has.
pub(crate) fn spawn_listener<D: ResponseDecoder>(
    ctx: ListenerContext<D>,
    mut exchanges: ExchangeStream,
    stop: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tasks = JoinSet::new();
        let mut next_page = u32::from(ctx.profile.seed_script.is_some());

        loop {
            let exchange = tokio::select! {
                () = stop.cancelled() => break,
                next = exchanges.next() => match next {
                    Some(exchange) => exchange,
                    None => {
                        tracing::debug!("Exchange stream ended");
                        break;
                    }
                },
            };
            ctx.counters.seen.fetch_add(1, Ordering::Relaxed);

            if !ctx.profile.accepts_url(&exchange.url) {
                tracing::debug!("Releasing unrelated {}", exchange.url);
                tasks.spawn(release_only(ctx.clone(), exchange));
                continue;
            }
            let page = next_page;
            next_page = next_page.saturating_add(1);
            tracing::debug!("Intercepted page {} from {}", page, exchange.url);
            tasks.spawn(handle_exchange(ctx.clone(), exchange, page <= ctx.budget));
        }

        while let Some(Some(exchange)) = exchanges.next().now_or_never() {
            ctx.counters.seen.fetch_add(1, Ordering::Relaxed);
            tasks.spawn(release_only(ctx.clone(), exchange));
        }
        drop(exchanges);
        drop(ctx);

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                if e.is_panic() {
                    tracing::error!("Decode task panicked: {}", e);
                }
            }
        }
    })
}

async fn release_only<D: ResponseDecoder>(ctx: ListenerContext<D>, exchange: InterceptedExchange) {
    if let Err(e) = ctx.release(&exchange).await {
        tracing::debug!("{}", e);
    }
}

async fn handle_exchange<D: ResponseDecoder>(
    ctx: ListenerContext<D>,
    exchange: InterceptedExchange,
    admit: bool,
) {
    let has_more = match read_and_decode(&ctx, &exchange).await {
        Ok(page) => {
            ctx.counters.decoded.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                "Decoded {} items from {} (has_more={})",
                page.items.len(),
                exchange.url,
                page.has_more
            );
            if !admit {
                tracing::debug!("Budget spent, dropping page from {}", exchange.url);
            } else if !ctx.items.accept(page.items) {
                tracing::warn!("Item sink closed, dropping page from {}", exchange.url);
            }
            page.has_more
        }
        Err(e) => {
            tracing::warn!("{}", e);
            ctx.errors.push(e);
            false
        }
    };

    let Some(mut round) = ctx.gate.acquire().await else {
        tracing::debug!("Gate closed before {} could report", exchange.url);
        return;
    };
    let decision = round.pacer().should_continue(has_more, &ctx.session).await;
    round.resolve(decision).await;
}

async fn read_and_decode<D: ResponseDecoder>(
    ctx: &ListenerContext<D>,
    exchange: &InterceptedExchange,
) -> Result<DecodedPage<D::Item>, ExchangeError> {
    let body = ctx.tab.read_body(&exchange.handle).await;
    // Release before looking at the read result: the page is blocked on it.
    let released = ctx.release(exchange).await;

    let body = body.map_err(|source| ExchangeError::Read {
        url: exchange.url.clone(),
        source,
    })?;
    released?;

    decode_guarded(ctx.decoder.as_ref(), &body).map_err(|source| ExchangeError::Decode {
        url: exchange.url.clone(),
        source,
    })
}
