//! The scroll gate: a one-slot handoff between decode tasks and the driver.
//!
//! Decode tasks take turns. A task [`acquire`](GateWriter::acquire)s a
//! [`Round`], which grants exclusive use of the [`Pacer`], then resolves it
//! into a single decision. The decision travels to the driver as a
//! [`Baton`] that still holds the round, so the next task cannot run the
//! pacer until the driver has acted on the previous decision and dropped
//! the baton.
//!
//! When the driver drops its [`GateReader`], pending and future writes fail
//! immediately instead of blocking.

use crate::pacer::Pacer;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, OwnedMutexGuard};

/// Constructor for a gate pair.
pub struct ScrollGate;

impl ScrollGate {
    /// Create a gate around the session's pacer.
    pub fn new(pacer: Pacer) -> (GateWriter, GateReader) {
        let (tx, rx) = mpsc::channel(1);
        let writer = GateWriter {
            pacer: Arc::new(Mutex::new(pacer)),
            tx,
        };
        (writer, GateReader { rx })
    }
}

/// Write side, cloned into every decode task.
#[derive(Clone)]
pub struct GateWriter {
    pacer: Arc<Mutex<Pacer>>,
    tx: mpsc::Sender<Baton>,
}

impl GateWriter {
    /// Wait for this task's turn. Returns `None` once the reader is gone.
    pub async fn acquire(&self) -> Option<Round> {
        if self.tx.is_closed() {
            return None;
        }
        let guard = tokio::select! {
            guard = Arc::clone(&self.pacer).lock_owned() => guard,
            () = self.tx.closed() => return None,
        };
        Some(Round {
            guard,
            tx: self.tx.clone(),
        })
    }

    /// Read-only view of the pacer that outlives the gate.
    pub fn view(&self) -> PacerView {
        PacerView(Arc::clone(&self.pacer))
    }
}

/// Exclusive turn at the gate.
#[derive(Debug)]
pub struct Round {
    guard: OwnedMutexGuard<Pacer>,
    tx: mpsc::Sender<Baton>,
}

impl Round {
    pub fn pacer(&mut self) -> &mut Pacer {
        &mut self.guard
    }

    /// Hand the decision to the driver. Returns `false` if nobody is
    /// listening any more; the round is released either way.
    pub async fn resolve(self, decision: bool) -> bool {
        let Self { guard, tx } = self;
        let baton = Baton {
            decision,
            _round: guard,
        };
        // Capacity is one and the previous baton released this round's
        // lock before we could take it, so the slot is always free.
        if tx.send(baton).await.is_err() {
            tracing::debug!("Gate closed, dropping decision {}", decision);
            return false;
        }
        true
    }
}

/// A decision in flight. Dropping it opens the next round.
pub struct Baton {
    decision: bool,
    _round: OwnedMutexGuard<Pacer>,
}

impl Baton {
    pub fn decision(&self) -> bool {
        self.decision
    }
}

/// Read side, owned by the driver.
pub struct GateReader {
    rx: mpsc::Receiver<Baton>,
}

impl GateReader {
    /// Next decision, or `None` once every writer is gone.
    pub async fn next(&mut self) -> Option<Baton> {
        self.rx.recv().await
    }
}

/// Shared handle used to report pacer state after the session.
pub struct PacerView(Arc<Mutex<Pacer>>);

impl PacerView {
    pub async fn pages(&self) -> u32 {
        self.0.lock().await.pages()
    }
}
