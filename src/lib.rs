//! Object Group Operations
//!
//! Bulk delete, evict and prefetch over groups of objects in a storage
//! cluster, run as asynchronous cluster-tracked jobs.
//!
//! # Overview
//!
//! A caller selects objects in a bucket, either by explicit names or by a
//! generated name range, and hands a bulk action for them to the cluster.
//! The cluster answers with a job id right away and fans the work out across
//! its storage targets. The caller then polls the job until it finishes,
//! aborts or the caller gives up, and can list the bucket afterwards to
//! confirm the resulting cache state.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use object_group_ops::{Bucket, ClientConfig, GroupOpsClient, ObjectProp, ObjectRange, Provider, Selection};
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = GroupOpsClient::from_config(&ClientConfig::with_endpoint("http://gateway:8080"))?;
//! let bucket = Bucket::new("training-data", Provider::Aws);
//!
//! // shard-1.tar, shard-3.tar, shard-5.tar, shard-7.tar
//! let range = ObjectRange::new("shard-", 1, 8, 2, ".tar")?;
//! let job_id = client.objects(&bucket, Selection::range(range)).prefetch().await?;
//! client.wait(&job_id, Duration::from_secs(30)).await?;
//!
//! for entry in client.list(&bucket, "shard-", &[ObjectProp::Cached]).await? {
//!     println!("{} cached={}", entry.name, entry.is_cached());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`ObjectRange`]: generates names `prefix + i + suffix` for `i` in `[start, stop)` by `step`
//! - [`Selection`]: an explicit name list or a range, exactly one of them
//! - [`tiering`]: rejects evict/prefetch for buckets without a remote tier, before any network call
//! - [`JobDispatcher`]: validates and submits a bulk action, returning its [`JobId`]
//! - [`JobMonitor`]: polls a job to a terminal state or a timeout, with an injectable [`Clock`]
//! - [`CacheStateReporter`]: lists objects with their `cached` flag
//! - [`ClusterApi`]: the control-plane seam, implemented over HTTP by [`HttpClusterApi`]
//! - [`GroupOpsClient`]: facade over all of the above
//!
//! # Configuration
//!
//! ```yaml
//! endpoint: "http://gateway:8080"
//! request_timeout_ms: 30000
//! default_wait_timeout_ms: 30000
//! poll:
//!   poll_interval_ms: 200
//!   max_poll_interval_ms: 2000
//!   backoff_factor: 2
//!   max_poll_retries: 3
//! ```
//!
//! See [`ClientConfig`] for every option.
//!
//! # Error Handling
//!
//! All failures are reported through [`GroupOpError`]:
//!
//! ```rust,no_run
//! use object_group_ops::{GroupOpError, GroupOpsClient, JobId};
//! use std::time::Duration;
//!
//! # async fn run(client: GroupOpsClient, job_id: JobId) {
//! match client.wait(&job_id, Duration::from_secs(10)).await {
//!     Ok(job) => println!("{} finished", job.id),
//!     Err(GroupOpError::JobAborted { error, .. }) => eprintln!("aborted: {}", error),
//!     Err(GroupOpError::JobTimeout { .. }) => eprintln!("still running, stopped waiting"),
//!     Err(e) => eprintln!("wait failed: {}", e),
//! }
//! # }
//! ```

pub mod config;
pub mod models;
pub mod error;
pub mod object_range;
pub mod selection;
pub mod tiering;
pub mod cluster_api;
pub mod dispatcher;
pub mod monitor;
pub mod reporter;
pub mod metrics;
pub mod client;

// Re-export commonly used types
pub use config::{ClientConfig, PollConfig};
pub use models::{ActionKind, Bucket, Job, JobId, JobStatus, ObjectEntry, ObjectProp, Provider};
pub use error::{GroupOpError, Result};
pub use object_range::{generate, ObjectRange, RangeNames};
pub use selection::{build_selection, Selection, SelectionPayload};
pub use cluster_api::{ClusterApi, HttpClusterApi, ListRequest, ObjectPage};
pub use dispatcher::JobDispatcher;
pub use monitor::{Clock, JobMonitor, PollPolicy, TokioClock};
pub use reporter::CacheStateReporter;
pub use metrics::{GroupOpMetrics, WaitOutcome};
pub use client::{GroupOpsClient, ObjectGroup};
