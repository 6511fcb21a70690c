// Performance metrics for the deal evaluation system
//
// Tracks cache effectiveness and per-operation timings so slow evaluations
// show up in logs before they show up in checkout latency.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Threshold above which an operation is counted (and logged) as slow
const SLOW_OPERATION_THRESHOLD_MS: u64 = 100;

/// Operations tracked by the metrics
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Full checkout evaluation (eligibility + selection)
    CheckoutEvaluation,
    /// Single-deal eligibility check
    EligibilityCheck,
    /// Usage recording at checkout commit
    UsageRecording,
    /// Usage statistics aggregation
    StatsQuery,
}

impl Operation {
    const COUNT: usize = 4;

    fn index(self) -> usize {
        match self {
            Operation::CheckoutEvaluation => 0,
            Operation::EligibilityCheck => 1,
            Operation::UsageRecording => 2,
            Operation::StatsQuery => 3,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Operation::CheckoutEvaluation => "checkout evaluation",
            Operation::EligibilityCheck => "eligibility check",
            Operation::UsageRecording => "usage recording",
            Operation::StatsQuery => "stats query",
        }
    }

    fn all() -> [Operation; Self::COUNT] {
        [
            Operation::CheckoutEvaluation,
            Operation::EligibilityCheck,
            Operation::UsageRecording,
            Operation::StatsQuery,
        ]
    }
}

#[derive(Debug)]
struct OperationCounters {
    count: AtomicU64,
    total_time_us: AtomicU64,
    slow_count: AtomicU64,
}

impl OperationCounters {
    fn new() -> Self {
        Self {
            count: AtomicU64::new(0),
            total_time_us: AtomicU64::new(0),
            slow_count: AtomicU64::new(0),
        }
    }
}

#[derive(Debug)]
struct MetricsInner {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    operations: [OperationCounters; Operation::COUNT],
}

/// Performance metrics for the deal engine, cheap to clone and share
#[derive(Debug, Clone)]
pub struct PerformanceMetrics {
    inner: Arc<MetricsInner>,
}

impl PerformanceMetrics {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                cache_hits: AtomicU64::new(0),
                cache_misses: AtomicU64::new(0),
                operations: [
                    OperationCounters::new(),
                    OperationCounters::new(),
                    OperationCounters::new(),
                    OperationCounters::new(),
                ],
            }),
        }
    }

    /// Record a deal-cache hit
    pub fn record_cache_hit(&self) {
        self.inner.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a deal-cache miss
    pub fn record_cache_miss(&self) {
        self.inner.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Cache hit rate in [0.0, 1.0]; zero when nothing has been recorded
    pub fn cache_hit_rate(&self) -> f64 {
        let hits = self.inner.cache_hits.load(Ordering::Relaxed);
        let misses = self.inner.cache_misses.load(Ordering::Relaxed);
        let total = hits + misses;

        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    /// Start timing an operation; the timer records on drop or `complete`
    pub fn start(&self, operation: Operation) -> OperationTimer {
        OperationTimer {
            start: Instant::now(),
            operation,
            metrics: self.clone(),
            recorded: false,
        }
    }

    /// Number of completed runs of an operation
    pub fn operation_count(&self, operation: Operation) -> u64 {
        self.inner.operations[operation.index()]
            .count
            .load(Ordering::Relaxed)
    }

    /// Average duration of an operation in milliseconds
    pub fn avg_time_ms(&self, operation: Operation) -> f64 {
        let counters = &self.inner.operations[operation.index()];
        let count = counters.count.load(Ordering::Relaxed);
        let total_us = counters.total_time_us.load(Ordering::Relaxed);

        if count == 0 {
            0.0
        } else {
            (total_us as f64 / count as f64) / 1000.0
        }
    }

    /// Number of runs that crossed the slow threshold
    pub fn slow_count(&self, operation: Operation) -> u64 {
        self.inner.operations[operation.index()]
            .slow_count
            .load(Ordering::Relaxed)
    }

    fn record(&self, operation: Operation, duration: Duration) {
        let counters = &self.inner.operations[operation.index()];
        counters.count.fetch_add(1, Ordering::Relaxed);
        counters
            .total_time_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);

        if duration.as_millis() as u64 > SLOW_OPERATION_THRESHOLD_MS {
            counters.slow_count.fetch_add(1, Ordering::Relaxed);
            tracing::warn!("Slow {}: {}ms", operation.label(), duration.as_millis());
        }
    }

    /// Log a one-line-per-operation summary
    pub fn log_summary(&self) {
        tracing::info!(
            "Deal engine cache: {:.1}% hit rate ({} hits, {} misses)",
            self.cache_hit_rate() * 100.0,
            self.inner.cache_hits.load(Ordering::Relaxed),
            self.inner.cache_misses.load(Ordering::Relaxed),
        );
        for operation in Operation::all() {
            tracing::info!(
                "Deal engine {}: {} runs, avg {:.2}ms, {} slow",
                operation.label(),
                self.operation_count(operation),
                self.avg_time_ms(operation),
                self.slow_count(operation),
            );
        }
    }
}

impl Default for PerformanceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Timer guard for one operation run
pub struct OperationTimer {
    start: Instant,
    operation: Operation,
    metrics: PerformanceMetrics,
    recorded: bool,
}

impl OperationTimer {
    /// Complete the timer and record the duration
    pub fn complete(mut self) {
        self.record_once();
    }

    fn record_once(&mut self) {
        if !self.recorded {
            self.recorded = true;
            self.metrics.record(self.operation, self.start.elapsed());
        }
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        self.record_once();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_hit_rate_empty() {
        let metrics = PerformanceMetrics::new();
        assert_eq!(metrics.cache_hit_rate(), 0.0);
    }

    #[test]
    fn test_cache_hit_rate() {
        let metrics = PerformanceMetrics::new();
        metrics.record_cache_hit();
        metrics.record_cache_hit();
        metrics.record_cache_hit();
        metrics.record_cache_miss();

        assert!((metrics.cache_hit_rate() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_timer_records_on_drop() {
        let metrics = PerformanceMetrics::new();
        {
            let _timer = metrics.start(Operation::CheckoutEvaluation);
        }

        assert_eq!(metrics.operation_count(Operation::CheckoutEvaluation), 1);
        assert_eq!(metrics.operation_count(Operation::UsageRecording), 0);
    }

    #[test]
    fn test_timer_records_once() {
        let metrics = PerformanceMetrics::new();
        let timer = metrics.start(Operation::StatsQuery);
        timer.complete();

        assert_eq!(metrics.operation_count(Operation::StatsQuery), 1);
    }

    #[test]
    fn test_metrics_shared_across_clones() {
        let metrics = PerformanceMetrics::new();
        let clone = metrics.clone();
        clone.record_cache_miss();

        assert_eq!(metrics.cache_hit_rate(), 0.0);
        metrics.record_cache_hit();
        assert!((clone.cache_hit_rate() - 0.5).abs() < f64::EPSILON);
    }
}
