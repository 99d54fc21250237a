//! Job dispatcher: validates a bulk action locally, then hands it to the cluster

use crate::cluster_api::ClusterApi;
use crate::error::{GroupOpError, Result};
use crate::metrics::GroupOpMetrics;
use crate::models::{ActionKind, Bucket, JobId};
use crate::selection::Selection;
use crate::tiering;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Submits bulk actions and returns their job ids without waiting for them
pub struct JobDispatcher {
    api: Arc<dyn ClusterApi>,
    metrics: Option<Arc<GroupOpMetrics>>,
}

impl JobDispatcher {
    pub fn new(api: Arc<dyn ClusterApi>) -> Self {
        Self { api, metrics: None }
    }

    /// Enable Prometheus metrics
    pub fn with_metrics(mut self, metrics: Arc<GroupOpMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Submit `action` over `selection` in `bucket`
    ///
    /// Local checks run first and in this order: the tiering guard for
    /// evict/prefetch, then selection emptiness. Only if both pass is a single
    /// submission call made. The call returns as soon as the cluster accepts
    /// the job; execution across storage targets happens asynchronously.
    ///
    /// # Returns
    /// * `Ok(JobId)` once the cluster acknowledged the job
    /// * `Err(GroupOpError)` on validation failure (no network call made) or
    ///   when the submission itself fails (no job exists)
    pub async fn dispatch(
        &self,
        bucket: &Bucket,
        selection: &Selection,
        action: ActionKind,
    ) -> Result<JobId> {
        if let Err(e) = self.validate(bucket, selection, action) {
            self.record(action, "rejected");
            return Err(e);
        }

        let payload = selection.to_payload();
        debug!(
            "Dispatching {} of {} objects in bucket {}",
            action,
            selection.len(),
            bucket
        );

        match self.api.submit_bulk_action(bucket, &payload, action).await {
            Ok(job_id) => {
                info!("Cluster accepted {} job {} for bucket {}", action, job_id, bucket);
                self.record(action, "accepted");
                Ok(job_id)
            }
            Err(e) => {
                warn!("Failed to submit {} for bucket {}: {}", action, bucket, e);
                self.record(action, "failed");
                Err(e)
            }
        }
    }

    fn validate(&self, bucket: &Bucket, selection: &Selection, action: ActionKind) -> Result<()> {
        tiering::check_action(bucket, action)?;
        if selection.is_empty() {
            return Err(GroupOpError::EmptySelection);
        }
        Ok(())
    }

    fn record(&self, action: ActionKind, result: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_dispatch(action, result);
        }
    }
}
