//! Page driver.
//!
//! Navigates, waits for the first content, then issues one scroll per
//! positive decision read from the scroll gate. The driver never decodes
//! intercepted traffic itself; the only data it touches directly is the
//! optional seed page embedded in the document, which it decides on while
//! holding the gate's first round.

use crate::decoder::{decode_guarded, ResponseDecoder};
use crate::error::{DecodeError, ExchangeError, ExtractError};
use crate::gate::{GateReader, Round};
use crate::sink::{ErrorSink, SinkHandle};
use crate::target::TargetProfile;
use pagewire_browser::{BrowserError, BrowserTab};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Where the driver is in its run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DriverState {
    #[default]
    Navigating,
    WaitingForInitialContent,
    ScrollLoop,
    Done,
}

/// Progress readable after the driver future is dropped.
#[derive(Debug, Default)]
pub(crate) struct DriverProgress {
    pub state: DriverState,
    pub scrolls: u32,
}

impl DriverProgress {
    fn enter(&mut self, state: DriverState) {
        tracing::debug!("Driver {:?} -> {:?}", self.state, state);
        self.state = state;
    }
}

/// Inline first page evaluated out of the document.
///
/// `round` is taken before the listener starts, so no exchange can reach
/// the sink or the pacer ahead of the seed page.
pub(crate) struct Seed<D: ResponseDecoder> {
    pub script: String,
    pub decoder: Arc<D>,
    pub items: SinkHandle<D::Item>,
    pub errors: ErrorSink,
    pub round: Round,
    /// Cancels the pacer delay
    pub cancel: CancellationToken,
}

pub(crate) struct Driver<'a, D: ResponseDecoder> {
    pub tab: &'a dyn BrowserTab,
    pub profile: &'a TargetProfile,
    pub url: &'a str,
    pub budget: u32,
    pub element_timeout: Duration,
    /// Longest wait for a gate decision before finishing early
    pub idle_timeout: Option<Duration>,
    pub seed: Option<Seed<D>>,
}

impl<D: ResponseDecoder> Driver<'_, D> {
    pub async fn run(
        mut self,
        mut gate: GateReader,
        progress: &mut DriverProgress,
    ) -> Result<(), ExtractError> {
        tracing::debug!("Navigating to {}", self.url);
        self.tab
            .navigate(self.url)
            .await
            .map_err(|source| ExtractError::Navigation {
                url: self.url.to_string(),
                source,
            })?;

        progress.enter(DriverState::WaitingForInitialContent);
        self.wait_for_content().await?;

        if let Some(script) = &self.profile.prime_script {
            self.tab
                .evaluate(script)
                .await
                .map_err(ExtractError::ScriptEvaluation)?;
        }
        if let Some(seed) = self.seed.take() {
            if !self.follow_seed(seed, progress).await? {
                tracing::info!("Finished on the seed page");
                progress.enter(DriverState::Done);
                return Ok(());
            }
        } else {
            progress.enter(DriverState::ScrollLoop);
        }

        loop {
            let baton = match self.idle_timeout {
                Some(limit) => match tokio::time::timeout(limit, gate.next()).await {
                    Ok(baton) => baton,
                    Err(_) => {
                        tracing::warn!("No new page within {:?}, finishing", limit);
                        break;
                    }
                },
                None => gate.next().await,
            };
            let Some(baton) = baton else {
                tracing::debug!("Gate closed");
                break;
            };
            if !baton.decision() {
                break;
            }

            // Hold the baton until the scroll is issued.
            self.scroll().await?;
            progress.scrolls += 1;
            drop(baton);
        }

        tracing::info!("Finished after {} scrolls", progress.scrolls);
        progress.enter(DriverState::Done);
        Ok(())
    }

    async fn wait_for_content(&self) -> Result<(), ExtractError> {
        let selector = &self.profile.content_selector;
        match self.tab.wait_visible(selector, self.element_timeout).await {
            Ok(()) => Ok(()),
            Err(BrowserError::Timeout(_)) => Err(ExtractError::ElementTimeout {
                selector: selector.clone(),
                timeout: self.element_timeout,
            }),
            Err(e) => Err(ExtractError::Browser(e)),
        }
    }

    /// Decode the seed page and run its decision through the pacer, issuing
    /// the first scroll while the seed's round is still held. Returns whether
    /// the scroll loop should follow.
    async fn follow_seed(
        &self,
        seed: Seed<D>,
        progress: &mut DriverProgress,
    ) -> Result<bool, ExtractError> {
        let has_more = self.decode_seed(&seed).await?;
        let Seed {
            mut round, cancel, ..
        } = seed;

        if self.budget == 0 {
            round.pacer().record_seed_page();
            tracing::debug!("No scrolls requested");
            return Ok(false);
        }
        if !round.pacer().should_continue(has_more, &cancel).await {
            return Ok(false);
        }

        progress.enter(DriverState::ScrollLoop);
        self.scroll().await?;
        progress.scrolls += 1;
        drop(round);
        Ok(true)
    }

    async fn decode_seed(&self, seed: &Seed<D>) -> Result<bool, ExtractError> {
        let value = self
            .tab
            .evaluate(&seed.script)
            .await
            .map_err(ExtractError::ScriptEvaluation)?;
        let decoded = serde_json::to_vec(&value)
            .map_err(DecodeError::from)
            .and_then(|body| decode_guarded(seed.decoder.as_ref(), &body));

        match decoded {
            Ok(page) => {
                tracing::debug!(
                    "Seed page carried {} items (has_more={})",
                    page.items.len(),
                    page.has_more
                );
                seed.items.accept(page.items);
                Ok(page.has_more)
            }
            Err(source) => {
                let error = ExchangeError::Decode {
                    url: self.url.to_string(),
                    source,
                };
                tracing::warn!("{}", error);
                seed.errors.push(error);
                Ok(false)
            }
        }
    }

    async fn scroll(&self) -> Result<(), ExtractError> {
        let nodes = self
            .tab
            .query_nodes(&self.profile.item_selector)
            .await
            .map_err(ExtractError::Browser)?;
        tracing::debug!("{} items on page, scrolling", nodes);

        self.tab
            .evaluate(&self.profile.scroll_script)
            .await
            .map_err(ExtractError::ScriptEvaluation)?;
        Ok(())
    }
}
