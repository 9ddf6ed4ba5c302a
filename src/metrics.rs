// Dispatcher metrics
//
// Lightweight counters for what went through the command queue

use crate::models::ExecutionResult;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Command dispatcher metrics
///
/// Uses atomic operations so the UI thread and the worker can both record
/// without locks. Logged on shutdown.
#[derive(Debug)]
pub struct Metrics {
    /// Commands handed to `submit`
    pub commands_submitted: AtomicU64,

    /// Commands that returned status 0
    pub commands_succeeded: AtomicU64,

    /// Commands that returned a non-zero status
    pub commands_failed: AtomicU64,

    /// Commands skipped by a quit before they reached the executor
    pub commands_cancelled: AtomicU64,

    /// Quit requests forwarded to the executor
    pub quit_requests: AtomicU64,

    /// Total time spent inside the executor in milliseconds
    pub total_execution_time_ms: AtomicU64,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            commands_submitted: AtomicU64::new(0),
            commands_succeeded: AtomicU64::new(0),
            commands_failed: AtomicU64::new(0),
            commands_cancelled: AtomicU64::new(0),
            quit_requests: AtomicU64::new(0),
            total_execution_time_ms: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_submitted(&self) {
        self.commands_submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_quit(&self) {
        self.quit_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the outcome of one command
    pub fn record_result(&self, result: &ExecutionResult) {
        if result.cancelled {
            self.commands_cancelled.fetch_add(1, Ordering::Relaxed);
            return;
        }

        if result.is_success() {
            self.commands_succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.commands_failed.fetch_add(1, Ordering::Relaxed);
        }
        self.total_execution_time_ms
            .fetch_add(result.duration.as_millis() as u64, Ordering::Relaxed);
    }

    /// Commands that reached the executor
    pub fn commands_executed(&self) -> u64 {
        self.commands_succeeded.load(Ordering::Relaxed)
            + self.commands_failed.load(Ordering::Relaxed)
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Average time spent per executed command in milliseconds
    pub fn avg_execution_time_ms(&self) -> f64 {
        let total = self.total_execution_time_ms.load(Ordering::Relaxed);
        let count = self.commands_executed();
        if count > 0 {
            total as f64 / count as f64
        } else {
            0.0
        }
    }

    pub fn log_summary(&self) {
        tracing::info!("=== Command Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Commands: {} submitted, {} succeeded, {} failed, {} cancelled",
            self.commands_submitted.load(Ordering::Relaxed),
            self.commands_succeeded.load(Ordering::Relaxed),
            self.commands_failed.load(Ordering::Relaxed),
            self.commands_cancelled.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Execution time: {:.2}s (avg: {:.2}ms per command), quit requests: {}",
            self.total_execution_time_ms.load(Ordering::Relaxed) as f64 / 1000.0,
            self.avg_execution_time_ms(),
            self.quit_requests.load(Ordering::Relaxed)
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
