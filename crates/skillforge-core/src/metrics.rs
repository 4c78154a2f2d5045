//! Process-wide atomic counters.
//!
//! Every run in the process bumps the same counters, so the values are
//! totals for the process and never describe a single run. Per-run figures
//! (rounds, duration) are carried by the `run.finished` event instead.
//! [`Metrics::flush`] reports the totals once, when the process is done.

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    runs_started: AtomicU64,
    rounds_executed: AtomicU64,
    tool_calls: AtomicU64,
    tool_failures: AtomicU64,
    events_emitted: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            runs_started: AtomicU64::new(0),
            rounds_executed: AtomicU64::new(0),
            tool_calls: AtomicU64::new(0),
            tool_failures: AtomicU64::new(0),
            events_emitted: AtomicU64::new(0),
        }
    }

    pub fn inc_runs_started(&self) {
        self.runs_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_rounds(&self) {
        self.rounds_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_tool_calls(&self) {
        self.tool_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_tool_failures(&self) {
        self.tool_failures.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "tool_failures", "counter incremented");
    }

    pub fn inc_events_emitted(&self) {
        self.events_emitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Emit the process totals as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "process_totals",
            runs_started = self.runs_started(),
            rounds_executed = self.rounds_executed(),
            tool_calls = self.tool_calls(),
            tool_failures = self.tool_failures(),
            events_emitted = self.events_emitted(),
        );
    }

    pub fn runs_started(&self) -> u64 {
        self.runs_started.load(Ordering::Relaxed)
    }

    pub fn rounds_executed(&self) -> u64 {
        self.rounds_executed.load(Ordering::Relaxed)
    }

    pub fn tool_calls(&self) -> u64 {
        self.tool_calls.load(Ordering::Relaxed)
    }

    pub fn tool_failures(&self) -> u64 {
        self.tool_failures.load(Ordering::Relaxed)
    }

    pub fn events_emitted(&self) -> u64 {
        self.events_emitted.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.runs_started.store(0, Ordering::Relaxed);
        self.rounds_executed.store(0, Ordering::Relaxed);
        self.tool_calls.store(0, Ordering::Relaxed);
        self.tool_failures.store(0, Ordering::Relaxed);
        self.events_emitted.store(0, Ordering::Relaxed);
    }
}
