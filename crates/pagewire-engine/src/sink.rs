//! Result and error sinks shared by decode tasks.
//!
//! [`ItemSink`] appends whole decoded pages through a channel to a single
//! collector task, so items from one exchange stay contiguous and in order.
//! [`ErrorSink`] keeps per-exchange errors up to a fixed capacity.

use crate::error::ExchangeError;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Append-only collector of decoded items.
pub struct ItemSink<T> {
    collector: JoinHandle<Vec<T>>,
}

/// Cloneable producer side of an [`ItemSink`].
pub struct SinkHandle<T> {
    tx: mpsc::UnboundedSender<Vec<T>>,
}

impl<T> Clone for SinkHandle<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T: Send + 'static> ItemSink<T> {
    /// Start a collector task.
    pub fn spawn() -> (SinkHandle<T>, Self) {
        let (tx, mut rx) = mpsc::unbounded_channel::<Vec<T>>();
        let collector = tokio::spawn(async move {
            let mut items = Vec::new();
            while let Some(page) = rx.recv().await {
                items.extend(page);
            }
            items
        });
        (SinkHandle { tx }, Self { collector })
    }

    /// Wait for every handle to drop, then return the items in arrival order.
    pub async fn drain(self) -> Vec<T> {
        match self.collector.await {
            Ok(items) => items,
            Err(e) => {
                tracing::error!("Item collector failed: {}", e);
                Vec::new()
            }
        }
    }
}

impl<T> SinkHandle<T> {
    /// Append one decoded page. Returns `false` once the sink is gone.
    pub fn accept(&self, items: Vec<T>) -> bool {
        if items.is_empty() {
            return true;
        }
        self.tx.send(items).is_ok()
    }
}

/// Bounded log of per-exchange errors.
#[derive(Clone)]
pub struct ErrorSink {
    inner: Arc<Mutex<ErrorLog>>,
}

struct ErrorLog {
    errors: Vec<ExchangeError>,
    capacity: usize,
    dropped: usize,
}

impl ErrorSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ErrorLog {
                errors: Vec::new(),
                capacity,
                dropped: 0,
            })),
        }
    }

    /// Record an error, counting it as dropped when the log is full.
    pub fn push(&self, error: ExchangeError) {
        let mut log = self.inner.lock();
        if log.errors.len() < log.capacity {
            log.errors.push(error);
        } else {
            log.dropped += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take the recorded errors and the number that did not fit.
    pub fn drain(&self) -> (Vec<ExchangeError>, usize) {
        let mut log = self.inner.lock();
        let dropped = std::mem::take(&mut log.dropped);
        (std::mem::take(&mut log.errors), dropped)
    }
}
