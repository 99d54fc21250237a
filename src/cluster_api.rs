//! Cluster control-plane API
//!
//! [`ClusterApi`] is the seam between the group-operation engine and the
//! cluster. [`HttpClusterApi`] speaks the gateway's HTTP/JSON protocol:
//!
//! - `POST /v1/buckets/{bucket}?provider=..` with `{"action", "value"}` submits
//!   a bulk action and answers with the job id as plain text
//! - `GET /v1/jobs/{id}` returns the job snapshot
//! - `GET /v1/buckets/{bucket}?provider=..&prefix=..&props=..` lists one page
//!   of objects

use crate::config::ClientConfig;
use crate::error::{GroupOpError, Result};
use crate::models::{ActionKind, Bucket, Job, JobId, ObjectEntry};
use crate::selection::SelectionPayload;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Parameters for one page of an object listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListRequest {
    pub prefix: String,
    /// Comma-separated property names
    pub props: String,
    /// 0 leaves the page size to the cluster
    pub page_size: usize,
    pub continuation_token: Option<String>,
}

/// One page of listed objects
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectPage {
    #[serde(default)]
    pub entries: Vec<ObjectEntry>,
    /// Token for the next page; absent or empty on the last page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continuation_token: Option<String>,
}

/// Bulk action submission body
#[derive(Debug, Serialize)]
struct ActionMsg<'a> {
    action: &'static str,
    value: &'a SelectionPayload,
}

/// Control-plane calls the engine depends on
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// Hand a bulk action to the cluster; returns once the cluster accepted it
    async fn submit_bulk_action(
        &self,
        bucket: &Bucket,
        selection: &SelectionPayload,
        action: ActionKind,
    ) -> Result<JobId>;

    /// Current snapshot of a job
    async fn get_job_status(&self, job_id: &JobId) -> Result<Job>;

    /// One page of objects in `bucket`
    async fn list_objects(&self, bucket: &Bucket, request: &ListRequest) -> Result<ObjectPage>;
}

/// [`ClusterApi`] over the gateway's HTTP interface
#[derive(Debug, Clone)]
pub struct HttpClusterApi {
    client: Client,
    base: Url,
}

impl HttpClusterApi {
    /// Create a client for the configured endpoint
    pub fn new(config: &ClientConfig) -> Result<Self> {
        config.validate()?;

        let base = Url::parse(&config.endpoint).map_err(|e| {
            GroupOpError::ConfigError(format!("Invalid endpoint '{}': {}", config.endpoint, e))
        })?;

        let client = Client::builder()
            .timeout(config.request_timeout())
            .pool_max_idle_per_host(10)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| GroupOpError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(HttpClusterApi { client, base })
    }

    /// Endpoint URL with `segments` appended, each percent-encoded
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| {
                GroupOpError::ConfigError(format!("Endpoint '{}' cannot be a base URL", self.base))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Map non-success responses to errors, keeping the body as the message
    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                debug!("Failed to read body of {} response: {}", status, e);
                String::new()
            }
        };
        let message = if body.trim().is_empty() {
            status.canonical_reason().unwrap_or("no reason").to_string()
        } else {
            body.trim().to_string()
        };
        Err(GroupOpError::from_http_status(status.as_u16(), message))
    }
}

#[async_trait]
impl ClusterApi for HttpClusterApi {
    async fn submit_bulk_action(
        &self,
        bucket: &Bucket,
        selection: &SelectionPayload,
        action: ActionKind,
    ) -> Result<JobId> {
        let url = self.url(&["v1", "buckets", &bucket.name])?;
        let body = ActionMsg {
            action: action.wire_name(),
            value: selection,
        };
        debug!("Submitting {} to {} for bucket {}", action.wire_name(), url, bucket);

        let response = self
            .client
            .post(url)
            .query(&[("provider", bucket.provider.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!("Bulk action submission failed for bucket {}: {}", bucket, e);
                GroupOpError::from(e)
            })?;

        let response = Self::check_status(response).await?;
        let text = response.text().await?;
        let id = text.trim().trim_matches('"');
        if id.is_empty() {
            return Err(GroupOpError::ParseError(
                "Cluster accepted the action but returned no job id".to_string(),
            ));
        }
        Ok(JobId::new(id))
    }

    async fn get_job_status(&self, job_id: &JobId) -> Result<Job> {
        let url = self.url(&["v1", "jobs", job_id.as_str()])?;
        let response = self.client.get(url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(GroupOpError::JobNotFound(job_id.to_string()));
        }

        let response = Self::check_status(response).await?;
        let bytes = response.bytes().await?;
        let job: Job = serde_json::from_slice(&bytes)?;
        Ok(job)
    }

    async fn list_objects(&self, bucket: &Bucket, request: &ListRequest) -> Result<ObjectPage> {
        let url = self.url(&["v1", "buckets", &bucket.name])?;
        let mut query: Vec<(&str, String)> = vec![
            ("provider", bucket.provider.as_str().to_string()),
            ("prefix", request.prefix.clone()),
            ("props", request.props.clone()),
        ];
        if request.page_size > 0 {
            query.push(("page_size", request.page_size.to_string()));
        }
        if let Some(token) = &request.continuation_token {
            query.push(("continuation_token", token.clone()));
        }

        let response = self.client.get(url).query(&query).send().await?;
        let response = Self::check_status(response).await?;
        let bytes = response.bytes().await?;
        let mut page: ObjectPage = serde_json::from_slice(&bytes)?;
        if page.continuation_token.as_deref() == Some("") {
            page.continuation_token = None;
        }
        Ok(page)
    }
}
