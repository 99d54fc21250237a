//! Job monitor
//!
//! Polls a job's cluster-side status until it is terminal or the caller's
//! timeout elapses. The clock is injectable so timeout and backoff behavior
//! can be driven without real delays.

use crate::cluster_api::ClusterApi;
use crate::config::PollConfig;
use crate::error::{GroupOpError, Result};
use crate::metrics::{GroupOpMetrics, WaitOutcome};
use crate::models::{Job, JobId, JobStatus};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Floor for the delay between polls
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Time source and sleep primitive used while polling
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    async fn sleep(&self, duration: Duration);
}

/// Real time, via tokio's timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Interval, backoff and retry bounds for status polling
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    /// Delay before the second poll
    pub interval: Duration,
    /// Upper bound for the backed-off delay
    pub max_interval: Duration,
    /// Growth factor applied after every poll; 1 means a fixed interval
    pub backoff_factor: u32,
    /// Consecutive transient poll failures tolerated
    pub max_retries: usize,
}

impl Default for PollPolicy {
    fn default() -> Self {
        PollPolicy::from_config(&PollConfig::default())
    }
}

impl PollPolicy {
    pub fn from_config(config: &PollConfig) -> Self {
        PollPolicy {
            interval: Duration::from_millis(config.poll_interval_ms),
            max_interval: Duration::from_millis(config.max_poll_interval_ms),
            backoff_factor: config.backoff_factor.max(1),
            max_retries: config.max_poll_retries,
        }
    }

    /// Fixed-interval policy
    pub fn fixed(interval: Duration, max_retries: usize) -> Self {
        PollPolicy {
            interval,
            max_interval: interval,
            backoff_factor: 1,
            max_retries,
        }
    }

    /// Delay to use after `current`
    pub fn next_interval(&self, current: Duration) -> Duration {
        current
            .checked_mul(self.backoff_factor)
            .unwrap_or(self.max_interval)
            .min(self.max_interval)
    }

    /// Check if a failed poll should be retried given the failures so far
    pub fn should_retry(&self, failures: usize, error: &GroupOpError) -> bool {
        failures < self.max_retries && error.should_retry()
    }
}

/// What the poll loop does after observing one poll result
#[derive(Debug)]
enum Step {
    Done(Result<Job>),
    Sleep(Duration),
}

/// Client-side state of one `wait` call
///
/// Keyed by a single job id and owned by one call; nothing is shared
/// between concurrent waits.
#[derive(Debug)]
struct WaitState<'a> {
    job_id: &'a JobId,
    policy: &'a PollPolicy,
    started: Instant,
    deadline: Option<Instant>,
    interval: Duration,
    failures: usize,
    retries: u64,
    last_status: Option<JobStatus>,
}

impl<'a> WaitState<'a> {
    fn new(job_id: &'a JobId, policy: &'a PollPolicy, started: Instant, timeout: Duration) -> Self {
        WaitState {
            job_id,
            policy,
            started,
            // An unrepresentable deadline means waiting without bound
            deadline: started.checked_add(timeout),
            interval: policy.interval,
            failures: 0,
            retries: 0,
            last_status: None,
        }
    }

    fn advance(&mut self, polled: Result<Job>, now: Instant) -> Step {
        match polled {
            Ok(job) => {
                self.failures = 0;
                self.last_status = Some(job.status);
                match job.status {
                    JobStatus::Finished => return Step::Done(Ok(job)),
                    JobStatus::Aborted => {
                        return Step::Done(Err(GroupOpError::JobAborted {
                            job_id: self.job_id.to_string(),
                            error: job
                                .error
                                .unwrap_or_else(|| "aborted without error detail".to_string()),
                        }))
                    }
                    JobStatus::Submitted | JobStatus::Running => {
                        debug!("Job {} is {}", self.job_id, job.status);
                    }
                }
            }
            Err(e) if self.policy.should_retry(self.failures, &e) => {
                self.failures += 1;
                self.retries += 1;
                warn!(
                    "Status poll for job {} failed (attempt {}), retrying: {}",
                    self.job_id, self.failures, e
                );
            }
            Err(e) if e.should_retry() => {
                return Step::Done(Err(GroupOpError::PollFailed {
                    job_id: self.job_id.to_string(),
                    attempts: self.failures + 1,
                    last_error: e.to_string(),
                }))
            }
            Err(e) => return Step::Done(Err(e)),
        }

        let remaining = self.remaining(now).unwrap_or(self.interval);
        if remaining.is_zero() {
            return self.expire(now);
        }

        let nap = self.interval.max(MIN_POLL_INTERVAL).min(remaining);
        self.interval = self.policy.next_interval(self.interval);
        Step::Sleep(nap)
    }

    /// Time left before the deadline; `None` when waiting without bound
    fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    /// Give up: the deadline passed, possibly while a poll was in flight
    fn expire(&self, now: Instant) -> Step {
        Step::Done(Err(GroupOpError::JobTimeout {
            job_id: self.job_id.to_string(),
            waited: now.saturating_duration_since(self.started),
            last_status: self
                .last_status
                .map(|s| s.as_str())
                .unwrap_or("unknown")
                .to_string(),
        }))
    }
}

/// Polls job status until a terminal state or a timeout
#[derive(Clone)]
pub struct JobMonitor {
    api: Arc<dyn ClusterApi>,
    clock: Arc<dyn Clock>,
    policy: PollPolicy,
    metrics: Option<Arc<GroupOpMetrics>>,
}

impl JobMonitor {
    pub fn new(api: Arc<dyn ClusterApi>, policy: PollPolicy) -> Self {
        Self {
            api,
            clock: Arc::new(TokioClock),
            policy,
            metrics: None,
        }
    }

    /// Replace the clock, e.g. with a manual clock in tests
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Enable Prometheus metrics
    pub fn with_metrics(mut self, metrics: Arc<GroupOpMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Wait for `job_id` to reach a terminal state
    ///
    /// # Returns
    /// * `Ok(Job)` once the job is `Finished`
    /// * `Err(JobAborted)` if the cluster aborted it, with the reported error
    /// * `Err(JobTimeout)` if `timeout` elapsed first, including while a
    ///   status poll was still in flight; the job may still be running on
    ///   the cluster and is left untouched
    /// * `Err(PollFailed)` if status polls kept failing transiently
    /// * `Err(JobNotFound)` or another non-transient error from the status call
    pub async fn wait(&self, job_id: &JobId, timeout: Duration) -> Result<Job> {
        let started = self.clock.now();
        let mut state = WaitState::new(job_id, &self.policy, started, timeout);
        debug!("Waiting up to {:?} for job {}", timeout, job_id);

        let result = loop {
            let step = match self.poll_until_deadline(job_id, &state).await {
                Some(polled) => state.advance(polled, self.clock.now()),
                None => state.expire(self.clock.now()),
            };
            match step {
                Step::Done(result) => break result,
                Step::Sleep(nap) => self.clock.sleep(nap).await,
            }
        };

        let elapsed = self.clock.now().saturating_duration_since(started);
        let outcome = match &result {
            Ok(_) => {
                info!("Job {} finished after {:?}", job_id, elapsed);
                WaitOutcome::Finished
            }
            Err(GroupOpError::JobAborted { error, .. }) => {
                warn!("Job {} aborted: {}", job_id, error);
                WaitOutcome::Aborted
            }
            Err(GroupOpError::JobTimeout { last_status, .. }) => {
                warn!(
                    "Gave up waiting for job {} after {:?} (last status: {})",
                    job_id, elapsed, last_status
                );
                WaitOutcome::Timeout
            }
            Err(e) => {
                warn!("Waiting for job {} failed: {}", job_id, e);
                WaitOutcome::Failed
            }
        };
        if let Some(metrics) = &self.metrics {
            metrics.record_wait(outcome, elapsed);
            metrics.record_poll_retries(state.retries);
        }

        result
    }

    /// One status poll, abandoned if the deadline passes first
    ///
    /// Returns `None` when the deadline won. The in-flight request is
    /// dropped; the job itself is not touched.
    async fn poll_until_deadline(
        &self,
        job_id: &JobId,
        state: &WaitState<'_>,
    ) -> Option<Result<Job>> {
        let Some(remaining) = state.remaining(self.clock.now()) else {
            return Some(self.api.get_job_status(job_id).await);
        };

        tokio::select! {
            biased;
            polled = self.api.get_job_status(job_id) => Some(polled),
            _ = self.clock.sleep(remaining) => {
                debug!("Status poll for job {} still in flight at the deadline", job_id);
                None
            }
        }
    }

    /// Wait for several jobs concurrently, one task per job
    ///
    /// Results are returned in the order of `job_ids`; one job's failure does
    /// not cut the others short.
    pub async fn wait_all(&self, job_ids: Vec<JobId>, timeout: Duration) -> Vec<Result<Job>> {
        let mut tasks = Vec::with_capacity(job_ids.len());

        for job_id in job_ids {
            let monitor = self.clone();
            tasks.push(tokio::spawn(async move {
                monitor.wait(&job_id, timeout).await
            }));
        }

        let mut results = Vec::with_capacity(tasks.len());
        for task in tasks {
            let result = task.await.unwrap_or_else(|e| {
                Err(GroupOpError::Transport(format!("Wait task join error: {}", e)))
            });
            results.push(result);
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActionKind;

    fn job(status: JobStatus, error: Option<&str>) -> Job {
        Job {
            id: JobId::new("j-1"),
            action: ActionKind::Evict,
            bucket: "b".to_string(),
            provider: crate::models::Provider::Gcp,
            status,
            created_at: 0,
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn test_poll_policy_backoff() {
        let policy = PollPolicy {
            interval: Duration::from_millis(100),
            max_interval: Duration::from_millis(350),
            backoff_factor: 2,
            max_retries: 3,
        };
        assert_eq!(policy.next_interval(Duration::from_millis(100)), Duration::from_millis(200));
        assert_eq!(policy.next_interval(Duration::from_millis(200)), Duration::from_millis(350));
        assert_eq!(policy.next_interval(Duration::MAX), Duration::from_millis(350));
    }

    #[test]
    fn test_poll_policy_fixed() {
        let policy = PollPolicy::fixed(Duration::from_millis(50), 1);
        assert_eq!(policy.next_interval(Duration::from_millis(50)), Duration::from_millis(50));
    }

    #[test]
    fn test_poll_policy_should_retry() {
        let policy = PollPolicy::fixed(Duration::from_millis(10), 2);
        let transient = GroupOpError::Transport("reset".to_string());
        assert!(policy.should_retry(0, &transient));
        assert!(policy.should_retry(1, &transient));
        assert!(!policy.should_retry(2, &transient));
        assert!(!policy.should_retry(0, &GroupOpError::JobNotFound("x".to_string())));
    }

    #[test]
    fn test_state_running_then_finished() {
        let policy = PollPolicy::fixed(Duration::from_millis(100), 3);
        let id = JobId::new("j-1");
        let t0 = Instant::now();
        let mut state = WaitState::new(&id, &policy, t0, Duration::from_secs(1));

        match state.advance(Ok(job(JobStatus::Running, None)), t0) {
            Step::Sleep(d) => assert_eq!(d, Duration::from_millis(100)),
            other => panic!("expected sleep, got {:?}", other),
        }
        match state.advance(Ok(job(JobStatus::Finished, None)), t0 + Duration::from_millis(100)) {
            Step::Done(Ok(j)) => assert_eq!(j.status, JobStatus::Finished),
            other => panic!("expected finished, got {:?}", other),
        }
    }

    #[test]
    fn test_state_aborted_carries_error() {
        let policy = PollPolicy::default();
        let id = JobId::new("j-1");
        let t0 = Instant::now();
        let mut state = WaitState::new(&id, &policy, t0, Duration::from_secs(1));

        match state.advance(Ok(job(JobStatus::Aborted, Some("disk full"))), t0) {
            Step::Done(Err(GroupOpError::JobAborted { error, .. })) => assert_eq!(error, "disk full"),
            other => panic!("expected aborted, got {:?}", other),
        }
    }

    #[test]
    fn test_state_sleep_clamped_to_deadline_then_timeout() {
        let policy = PollPolicy::fixed(Duration::from_millis(400), 3);
        let id = JobId::new("j-1");
        let t0 = Instant::now();
        let mut state = WaitState::new(&id, &policy, t0, Duration::from_millis(500));

        let t1 = t0 + Duration::from_millis(300);
        match state.advance(Ok(job(JobStatus::Running, None)), t1) {
            Step::Sleep(d) => assert_eq!(d, Duration::from_millis(200)),
            other => panic!("expected sleep, got {:?}", other),
        }
        let t2 = t0 + Duration::from_millis(500);
        match state.advance(Ok(job(JobStatus::Running, None)), t2) {
            Step::Done(Err(GroupOpError::JobTimeout { waited, last_status, .. })) => {
                assert_eq!(waited, Duration::from_millis(500));
                assert_eq!(last_status, "running");
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[test]
    fn test_state_transient_failures_then_poll_failed() {
        let policy = PollPolicy::fixed(Duration::from_millis(10), 2);
        let id = JobId::new("j-1");
        let t0 = Instant::now();
        let mut state = WaitState::new(&id, &policy, t0, Duration::from_secs(10));
        let blip = || Err(GroupOpError::Transport("connection refused".to_string()));

        assert!(matches!(state.advance(blip(), t0), Step::Sleep(_)));
        assert!(matches!(state.advance(blip(), t0), Step::Sleep(_)));
        match state.advance(blip(), t0) {
            Step::Done(Err(GroupOpError::PollFailed { attempts, .. })) => assert_eq!(attempts, 3),
            other => panic!("expected poll failure, got {:?}", other),
        }
    }

    #[test]
    fn test_state_success_resets_failures() {
        let policy = PollPolicy::fixed(Duration::from_millis(10), 1);
        let id = JobId::new("j-1");
        let t0 = Instant::now();
        let mut state = WaitState::new(&id, &policy, t0, Duration::from_secs(10));
        let blip = || Err(GroupOpError::Timeout("slow".to_string()));

        assert!(matches!(state.advance(blip(), t0), Step::Sleep(_)));
        assert!(matches!(state.advance(Ok(job(JobStatus::Running, None)), t0), Step::Sleep(_)));
        assert!(matches!(state.advance(blip(), t0), Step::Sleep(_)));
    }

    #[test]
    fn test_state_expire_mid_poll() {
        let policy = PollPolicy::fixed(Duration::from_millis(100), 3);
        let id = JobId::new("j-1");
        let t0 = Instant::now();
        let mut state = WaitState::new(&id, &policy, t0, Duration::from_millis(300));

        assert_eq!(state.remaining(t0 + Duration::from_millis(120)), Some(Duration::from_millis(180)));
        assert!(matches!(state.advance(Ok(job(JobStatus::Submitted, None)), t0), Step::Sleep(_)));
        match state.expire(t0 + Duration::from_millis(300)) {
            Step::Done(Err(GroupOpError::JobTimeout { waited, last_status, .. })) => {
                assert_eq!(waited, Duration::from_millis(300));
                assert_eq!(last_status, "submitted");
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[test]
    fn test_state_unbounded_wait_has_no_remaining() {
        let policy = PollPolicy::default();
        let id = JobId::new("j-1");
        let state = WaitState::new(&id, &policy, Instant::now(), Duration::MAX);
        assert_eq!(state.remaining(Instant::now()), None);
    }

    #[test]
    fn test_state_job_not_found_is_final() {
        let policy = PollPolicy::default();
        let id = JobId::new("j-1");
        let t0 = Instant::now();
        let mut state = WaitState::new(&id, &policy, t0, Duration::from_secs(10));

        match state.advance(Err(GroupOpError::JobNotFound("j-1".to_string())), t0) {
            Step::Done(Err(GroupOpError::JobNotFound(_))) => {}
            other => panic!("expected not found, got {:?}", other),
        }
    }
}
