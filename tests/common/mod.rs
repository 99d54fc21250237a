// In-memory cluster and manual clock shared by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use object_group_ops::{
    ActionKind, Bucket, Clock, ClusterApi, GroupOpError, Job, JobId, JobStatus, ListRequest,
    ObjectEntry, ObjectPage, ObjectRange, Result, SelectionPayload,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Route engine logs to the test harness; repeated calls are no-ops
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// How a simulated job behaves when polled
#[derive(Debug, Clone)]
pub enum JobScript {
    /// Report `running` for this many polls, then apply the action and finish
    FinishAfter(usize),
    /// Never leave `running`
    NeverFinish,
    /// Report `running` for this many polls, then abort with the message
    AbortAfter(usize, String),
}

struct SimJob {
    job: Job,
    names: Vec<String>,
    script: JobScript,
    polls: usize,
}

#[derive(Default)]
struct State {
    // bucket name -> object name -> cached
    buckets: HashMap<String, BTreeMap<String, bool>>,
    jobs: HashMap<JobId, SimJob>,
    next_id: usize,
}

/// Cluster that executes bulk actions in memory once their job is polled to completion
pub struct SimCluster {
    state: Mutex<State>,
    script: Mutex<JobScript>,
    submissions: AtomicUsize,
    polls: AtomicUsize,
    failing_polls: AtomicUsize,
}

impl SimCluster {
    pub fn new() -> Self {
        SimCluster {
            state: Mutex::new(State::default()),
            script: Mutex::new(JobScript::FinishAfter(1)),
            submissions: AtomicUsize::new(0),
            polls: AtomicUsize::new(0),
            failing_polls: AtomicUsize::new(0),
        }
    }

    /// Script applied to jobs submitted from now on
    pub fn set_script(&self, script: JobScript) {
        *self.script.lock().unwrap() = script;
    }

    /// Fail the next `count` status polls with a transport error
    pub fn fail_next_polls(&self, count: usize) {
        self.failing_polls.store(count, Ordering::SeqCst);
    }

    /// Put objects named `prefix{i}suffix` for `i` in `0..count`, all cached
    pub fn put_objects(&self, bucket: &Bucket, prefix: &str, suffix: &str, count: usize) -> Vec<String> {
        let names: Vec<String> = (0..count).map(|i| format!("{}{}{}", prefix, i, suffix)).collect();
        let mut state = self.state.lock().unwrap();
        let objects = state.buckets.entry(bucket.name.clone()).or_default();
        for name in &names {
            objects.insert(name.clone(), true);
        }
        names
    }

    pub fn submissions(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    fn expand(selection: &SelectionPayload) -> Vec<String> {
        match selection {
            SelectionPayload::List { names } => names.clone(),
            SelectionPayload::Range {
                prefix,
                start,
                stop,
                step,
                suffix,
                ..
            } => ObjectRange::new(prefix.as_str(), *start, *stop, *step, suffix.as_str())
                .map(|r| r.names())
                .unwrap_or_default(),
        }
    }

    fn apply(state: &mut State, bucket: &str, action: ActionKind, names: &[String]) {
        let objects = state.buckets.entry(bucket.to_string()).or_default();
        for name in names {
            match action {
                ActionKind::Delete => {
                    objects.remove(name);
                }
                ActionKind::Evict => {
                    if let Some(cached) = objects.get_mut(name) {
                        *cached = false;
                    }
                }
                ActionKind::Prefetch => {
                    if let Some(cached) = objects.get_mut(name) {
                        *cached = true;
                    }
                }
            }
        }
    }
}

#[async_trait]
impl ClusterApi for SimCluster {
    async fn submit_bulk_action(
        &self,
        bucket: &Bucket,
        selection: &SelectionPayload,
        action: ActionKind,
    ) -> Result<JobId> {
        self.submissions.fetch_add(1, Ordering::SeqCst);
        let script = self.script.lock().unwrap().clone();
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = JobId::new(format!("job-{}", state.next_id));
        let job = Job {
            id: id.clone(),
            action,
            bucket: bucket.name.clone(),
            provider: bucket.provider,
            status: JobStatus::Running,
            created_at: 0,
            error: None,
        };
        state.jobs.insert(
            id.clone(),
            SimJob {
                job,
                names: Self::expand(selection),
                script,
                polls: 0,
            },
        );
        Ok(id)
    }

    async fn get_job_status(&self, job_id: &JobId) -> Result<Job> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let failing = self.failing_polls.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_polls.store(failing - 1, Ordering::SeqCst);
            return Err(GroupOpError::Transport("connection reset by peer".to_string()));
        }

        let mut state = self.state.lock().unwrap();
        let (bucket, action, names) = {
            let sim = state
                .jobs
                .get_mut(job_id)
                .ok_or_else(|| GroupOpError::JobNotFound(job_id.to_string()))?;
            if sim.job.status.is_terminal() {
                return Ok(sim.job.clone());
            }
            sim.polls += 1;
            match sim.script.clone() {
                JobScript::FinishAfter(n) if sim.polls > n => {
                    sim.job.status = JobStatus::Finished;
                    (sim.job.bucket.clone(), sim.job.action, sim.names.clone())
                }
                JobScript::AbortAfter(n, message) if sim.polls > n => {
                    sim.job.status = JobStatus::Aborted;
                    sim.job.error = Some(message);
                    return Ok(sim.job.clone());
                }
                _ => return Ok(sim.job.clone()),
            }
        };
        Self::apply(&mut state, &bucket, action, &names);
        Ok(state.jobs[job_id].job.clone())
    }

    async fn list_objects(&self, bucket: &Bucket, request: &ListRequest) -> Result<ObjectPage> {
        let state = self.state.lock().unwrap();
        let Some(objects) = state.buckets.get(&bucket.name) else {
            return Err(GroupOpError::from_http_status(404, "bucket does not exist"));
        };
        let want_cached = request.props.split(',').any(|p| p == "cached");

        let mut entries: Vec<ObjectEntry> = objects
            .iter()
            .filter(|(name, _)| name.starts_with(&request.prefix))
            .filter(|(name, _)| match &request.continuation_token {
                Some(token) => name.as_str() > token.as_str(),
                None => true,
            })
            .map(|(name, cached)| {
                let mut entry = ObjectEntry::new(name.clone());
                if want_cached {
                    entry.cached = Some(*cached);
                }
                entry
            })
            .collect();

        let mut continuation_token = None;
        if request.page_size > 0 && entries.len() > request.page_size {
            entries.truncate(request.page_size);
            continuation_token = entries.last().map(|e| e.name.clone());
        }
        Ok(ObjectPage {
            entries,
            continuation_token,
        })
    }
}

/// Clock whose time only moves when something sleeps on it
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        ManualClock {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    pub fn elapsed(&self) -> Duration {
        *self.offset.lock().unwrap()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        *self.offset.lock().unwrap() += duration;
        self.sleeps.lock().unwrap().push(duration);
        tokio::task::yield_now().await;
    }
}
