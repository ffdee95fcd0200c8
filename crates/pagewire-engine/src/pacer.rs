//! Scroll pacing.
//!
//! The pacer enforces the scroll delay and the scroll budget. It counts
//! loaded pages: the initial page is page one and scroll `n` loads page
//! `n + 1`, so a budget of `k` allows `k + 1` pages.

use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Delay and budget state for one session.
///
/// Owned by the scroll gate; only the holder of the current round can call
/// [`Pacer::should_continue`].
#[derive(Debug)]
pub struct Pacer {
    budget: u32,
    delay: Duration,
    pages: u32,
}

impl Pacer {
    pub fn new(budget: u32, delay: Duration) -> Self {
        Self {
            budget,
            delay,
            pages: 0,
        }
    }

    /// Count a page that arrived without an intercepted exchange.
    pub fn record_seed_page(&mut self) {
        self.pages = self.pages.saturating_add(1);
    }

    /// Pages counted so far.
    pub fn pages(&self) -> u32 {
        self.pages
    }

    pub fn budget(&self) -> u32 {
        self.budget
    }

    /// Decide whether another scroll should follow the page just decoded.
    ///
    /// Sleeps the scroll delay first, then counts the page whatever the
    /// outcome. Returns `false` on cancellation, when the budget is spent,
    /// or when the page said there is nothing more.
    pub async fn should_continue(&mut self, prior_has_next: bool, cancel: &CancellationToken) -> bool {
        let cancelled = tokio::select! {
            () = tokio::time::sleep(self.delay) => false,
            () = cancel.cancelled() => true,
        };
        self.pages = self.pages.saturating_add(1);

        if cancelled {
            tracing::debug!("Pacer cancelled after {} pages", self.pages);
            return false;
        }
        self.decide(prior_has_next)
    }

    fn decide(&self, prior_has_next: bool) -> bool {
        if self.pages > self.budget {
            tracing::debug!(
                "Scroll budget of {} spent after {} pages",
                self.budget,
                self.pages
            );
            return false;
        }
        prior_has_next
    }
}
