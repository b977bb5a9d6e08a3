// Performance metrics module
//
// Provides lightweight metrics tracking for processed jobs

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Process-wide job metrics
///
/// Uses atomic operations so concurrent jobs can record without locks.
/// Shared as `Arc<Metrics>` between the orchestrator and its channel sinks.
#[derive(Debug)]
pub struct Metrics {
    /// Jobs that produced an output archive
    pub jobs_succeeded: AtomicUsize,

    /// Jobs that ended in the terminal failure state
    pub jobs_failed: AtomicUsize,

    /// Warning events across all jobs
    pub warnings_emitted: AtomicU64,

    /// Non-fatal error events across all jobs
    pub errors_emitted: AtomicU64,

    /// Total job processing time in milliseconds
    pub total_processing_time_ms: AtomicU64,

    /// Events delivered to a consumer
    pub events_emitted: AtomicU64,

    /// Events dropped because the consumer disconnected
    pub events_dropped: AtomicU64,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            jobs_succeeded: AtomicUsize::new(0),
            jobs_failed: AtomicUsize::new(0),
            warnings_emitted: AtomicU64::new(0),
            errors_emitted: AtomicU64::new(0),
            total_processing_time_ms: AtomicU64::new(0),
            events_emitted: AtomicU64::new(0),
            events_dropped: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_job_succeeded(&self, duration: Duration) {
        self.jobs_succeeded.fetch_add(1, Ordering::Relaxed);
        self.record_processing_time(duration);
    }

    pub fn record_job_failed(&self, duration: Duration) {
        self.jobs_failed.fetch_add(1, Ordering::Relaxed);
        self.record_processing_time(duration);
    }

    pub fn record_warnings(&self, count: usize) {
        self.warnings_emitted
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_errors(&self, count: usize) {
        self.errors_emitted.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_event_emitted(&self) {
        self.events_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_event_dropped(&self) {
        self.events_dropped.fetch_add(1, Ordering::Relaxed);
    }

    fn record_processing_time(&self, duration: Duration) {
        self.total_processing_time_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn events_emitted(&self) -> u64 {
        self.events_emitted.load(Ordering::Relaxed)
    }

    pub fn events_dropped(&self) -> u64 {
        self.events_dropped.load(Ordering::Relaxed)
    }

    /// Get total uptime
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Average processing time per finished job in milliseconds
    pub fn avg_job_time_ms(&self) -> f64 {
        let total = self.total_processing_time_ms.load(Ordering::Relaxed);
        let count = self.jobs_succeeded.load(Ordering::Relaxed)
            + self.jobs_failed.load(Ordering::Relaxed);
        if count > 0 {
            total as f64 / count as f64
        } else {
            0.0
        }
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        tracing::info!("=== Processing Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Jobs: {} succeeded, {} failed (avg: {:.2}ms per job)",
            self.jobs_succeeded.load(Ordering::Relaxed),
            self.jobs_failed.load(Ordering::Relaxed),
            self.avg_job_time_ms()
        );
        tracing::info!(
            "Events: {} emitted, {} dropped, {} warnings, {} errors",
            self.events_emitted(),
            self.events_dropped(),
            self.warnings_emitted.load(Ordering::Relaxed),
            self.errors_emitted.load(Ordering::Relaxed)
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
