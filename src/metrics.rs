//! Prometheus metrics for bulk actions and job waits

use crate::models::ActionKind;
use prometheus::{
    register_counter_vec, register_histogram, register_int_counter, CounterVec, Histogram,
    HistogramOpts, IntCounter, Opts, Registry,
};
use std::sync::Arc;
use std::time::Duration;

const WAIT_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 300.0];

/// Metrics for dispatch and wait operations
#[derive(Clone)]
pub struct GroupOpMetrics {
    /// Bulk action submissions by action and result
    pub dispatch_total: Arc<CounterVec>,

    /// Wait outcomes: finished, aborted, timeout, failed
    pub wait_outcomes_total: Arc<CounterVec>,

    /// Status polls that failed transiently and were retried
    pub poll_retries_total: Arc<IntCounter>,

    /// Time spent in `wait`
    pub wait_duration_seconds: Arc<Histogram>,
}

/// How a `wait` call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Finished,
    Aborted,
    Timeout,
    Failed,
}

impl WaitOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitOutcome::Finished => "finished",
            WaitOutcome::Aborted => "aborted",
            WaitOutcome::Timeout => "timeout",
            WaitOutcome::Failed => "failed",
        }
    }
}

impl GroupOpMetrics {
    /// Create metrics registered in the default registry
    pub fn new() -> Result<Self, prometheus::Error> {
        let dispatch_total = register_counter_vec!(
            "group_ops_dispatch_total",
            "Total number of bulk action submissions",
            &["action", "result"] // result: accepted, rejected, failed
        )?;

        let wait_outcomes_total = register_counter_vec!(
            "group_ops_wait_outcomes_total",
            "Total number of job waits by outcome",
            &["outcome"]
        )?;

        let poll_retries_total = register_int_counter!(
            "group_ops_poll_retries_total",
            "Total number of retried job status polls"
        )?;

        let wait_duration_seconds = register_histogram!(
            "group_ops_wait_duration_seconds",
            "Time spent waiting for jobs in seconds",
            WAIT_BUCKETS.to_vec()
        )?;

        Ok(Self {
            dispatch_total: Arc::new(dispatch_total),
            wait_outcomes_total: Arc::new(wait_outcomes_total),
            poll_retries_total: Arc::new(poll_retries_total),
            wait_duration_seconds: Arc::new(wait_duration_seconds),
        })
    }

    /// Create metrics with custom registry
    pub fn with_registry(registry: &Registry) -> Result<Self, prometheus::Error> {
        let dispatch_total = CounterVec::new(
            Opts::new(
                "group_ops_dispatch_total",
                "Total number of bulk action submissions",
            ),
            &["action", "result"],
        )?;
        registry.register(Box::new(dispatch_total.clone()))?;

        let wait_outcomes_total = CounterVec::new(
            Opts::new(
                "group_ops_wait_outcomes_total",
                "Total number of job waits by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(wait_outcomes_total.clone()))?;

        let poll_retries_total = IntCounter::new(
            "group_ops_poll_retries_total",
            "Total number of retried job status polls",
        )?;
        registry.register(Box::new(poll_retries_total.clone()))?;

        let wait_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "group_ops_wait_duration_seconds",
                "Time spent waiting for jobs in seconds",
            )
            .buckets(WAIT_BUCKETS.to_vec()),
        )?;
        registry.register(Box::new(wait_duration_seconds.clone()))?;

        Ok(Self {
            dispatch_total: Arc::new(dispatch_total),
            wait_outcomes_total: Arc::new(wait_outcomes_total),
            poll_retries_total: Arc::new(poll_retries_total),
            wait_duration_seconds: Arc::new(wait_duration_seconds),
        })
    }

    /// Record a submission attempt
    pub fn record_dispatch(&self, action: ActionKind, result: &str) {
        self.dispatch_total
            .with_label_values(&[action.as_str(), result])
            .inc();
    }

    /// Record retried polls
    pub fn record_poll_retries(&self, count: u64) {
        self.poll_retries_total.inc_by(count);
    }

    /// Record how a wait ended and how long it took
    pub fn record_wait(&self, outcome: WaitOutcome, elapsed: Duration) {
        self.wait_outcomes_total
            .with_label_values(&[outcome.as_str()])
            .inc();
        self.wait_duration_seconds.observe(elapsed.as_secs_f64());
    }
}
