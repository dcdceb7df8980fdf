//! Progress reporting and cancellation of a running sweep.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
    mpsc::Sender,
};

/// Shared cancellation flag, checked at grid-point boundaries.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the sweep.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Outbound progress channel of a simulation run.
///
/// Sends completion percentages in `[0, 100]` to an optional sink. Each value
/// sent is strictly greater than the previous one and the last is exactly
/// 100. A disconnected sink is ignored: the run keeps going.
///
/// A reporter is consumed by the run it observes, which closes the sink when
/// the run ends.
#[derive(Debug, Default)]
pub struct Progress {
    sink: Option<Sender<f64>>,
    cancel: CancelToken,
    total: usize,
    completed: usize,
    last_sent: Option<f64>,
}

impl Progress {
    /// Reporter without a sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reporter that sends percentages to `sink`.
    pub fn with_sink(sink: Sender<f64>) -> Self {
        Self {
            sink: Some(sink),
            ..Self::default()
        }
    }

    /// Observe `cancel` at every grid-point boundary.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Start tracking a sweep over `total` grid points.
    pub(crate) fn start(&mut self, total: usize) {
        self.total = total;
        self.completed = 0;
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Mark one more grid point as done and report the new percentage.
    pub fn advance(&mut self) {
        self.completed = (self.completed + 1).min(self.total);
        let pct = if self.completed == self.total {
            100.0
        } else {
            100.0 * self.completed as f64 / self.total as f64
        };
        self.emit(pct);
    }

    fn emit(&mut self, pct: f64) {
        if self.last_sent.is_some_and(|last| pct <= last) {
            return;
        }
        self.last_sent = Some(pct);
        if let Some(sink) = &self.sink {
            // The receiver may have stopped listening.
            sink.send(pct).ok();
        }
    }
}
