//! Client facade tying the dispatcher, monitor and reporter together

use crate::cluster_api::{ClusterApi, HttpClusterApi};
use crate::config::ClientConfig;
use crate::dispatcher::JobDispatcher;
use crate::error::Result;
use crate::metrics::GroupOpMetrics;
use crate::models::{ActionKind, Bucket, Job, JobId, ObjectEntry, ObjectProp};
use crate::monitor::{Clock, JobMonitor, PollPolicy};
use crate::object_range::ObjectRange;
use crate::reporter::CacheStateReporter;
use crate::selection::{self, Selection};
use prometheus::Registry;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Entry point for object-group operations against one cluster
///
/// Holds no state beyond its collaborators: every dispatch, wait and list is
/// self-contained given its arguments, and the client can be shared across
/// tasks to run many jobs at once.
pub struct GroupOpsClient {
    dispatcher: JobDispatcher,
    monitor: JobMonitor,
    reporter: CacheStateReporter,
    default_wait_timeout: Duration,
    registry: Option<Registry>,
}

impl GroupOpsClient {
    /// Create a client speaking HTTP to `config.endpoint`
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let api = Arc::new(HttpClusterApi::new(config)?);
        info!("Object-group client targeting {}", config.endpoint);
        Self::with_api(api, config)
    }

    /// Create a client over any [`ClusterApi`] implementation
    pub fn with_api(api: Arc<dyn ClusterApi>, config: &ClientConfig) -> Result<Self> {
        config.validate()?;

        let mut dispatcher = JobDispatcher::new(api.clone());
        let mut monitor = JobMonitor::new(api.clone(), PollPolicy::from_config(&config.poll));
        let reporter = CacheStateReporter::new(api).with_page_size(config.list_page_size);

        let registry = if config.enable_metrics {
            let registry = Registry::new();
            let metrics = Arc::new(GroupOpMetrics::with_registry(&registry)?);
            dispatcher = dispatcher.with_metrics(metrics.clone());
            monitor = monitor.with_metrics(metrics);
            Some(registry)
        } else {
            None
        };

        Ok(GroupOpsClient {
            dispatcher,
            monitor,
            reporter,
            default_wait_timeout: config.default_wait_timeout(),
            registry,
        })
    }

    /// Replace the clock used while waiting
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.monitor = self.monitor.with_clock(clock);
        self
    }

    /// Registry holding this client's metrics, when enabled
    pub fn registry(&self) -> Option<&Registry> {
        self.registry.as_ref()
    }

    /// Build a selection from exactly one of an explicit list or a range
    pub fn build_selection(
        names: Option<Vec<String>>,
        range: Option<ObjectRange>,
    ) -> Result<Selection> {
        selection::build_selection(names, range)
    }

    /// Submit a bulk action and return its job id without waiting for it
    pub async fn dispatch(
        &self,
        bucket: &Bucket,
        selection: &Selection,
        action: ActionKind,
    ) -> Result<JobId> {
        self.dispatcher.dispatch(bucket, selection, action).await
    }

    /// Wait for a job to finish, abort, or outlast `timeout`
    pub async fn wait(&self, job_id: &JobId, timeout: Duration) -> Result<Job> {
        self.monitor.wait(job_id, timeout).await
    }

    /// [`wait`](Self::wait) with the configured default timeout
    pub async fn wait_default(&self, job_id: &JobId) -> Result<Job> {
        self.monitor.wait(job_id, self.default_wait_timeout).await
    }

    /// Wait for several jobs concurrently; results follow input order
    pub async fn wait_all(&self, job_ids: Vec<JobId>, timeout: Duration) -> Vec<Result<Job>> {
        self.monitor.wait_all(job_ids, timeout).await
    }

    /// List objects under `prefix` with the requested properties
    pub async fn list(
        &self,
        bucket: &Bucket,
        prefix: &str,
        props: &[ObjectProp],
    ) -> Result<Vec<ObjectEntry>> {
        self.reporter.list(bucket, prefix, props).await
    }

    /// Bind a selection in `bucket` for a subsequent delete, evict or prefetch
    pub fn objects<'a>(&'a self, bucket: &'a Bucket, selection: Selection) -> ObjectGroup<'a> {
        ObjectGroup {
            client: self,
            bucket,
            selection,
        }
    }
}

/// A selection of objects in one bucket, ready for a bulk action
pub struct ObjectGroup<'a> {
    client: &'a GroupOpsClient,
    bucket: &'a Bucket,
    selection: Selection,
}

impl ObjectGroup<'_> {
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub async fn delete(&self) -> Result<JobId> {
        self.client
            .dispatch(self.bucket, &self.selection, ActionKind::Delete)
            .await
    }

    pub async fn evict(&self) -> Result<JobId> {
        self.client
            .dispatch(self.bucket, &self.selection, ActionKind::Evict)
            .await
    }

    pub async fn prefetch(&self) -> Result<JobId> {
        self.client
            .dispatch(self.bucket, &self.selection, ActionKind::Prefetch)
            .await
    }
}
