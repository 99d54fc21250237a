//! Error types for object-group operations

use std::time::Duration;
use thiserror::Error;

/// Result type alias for object-group operations
pub type Result<T> = std::result::Result<T, GroupOpError>;

/// Error types that can occur while selecting, dispatching, or awaiting a bulk action
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GroupOpError {
    #[error("Invalid object range: {0}")]
    InvalidRange(String),

    #[error("Selection contains no objects")]
    EmptySelection,

    #[error("Selection must name either an object list or a range, not both")]
    AmbiguousSelection,

    #[error("Action '{action}' requires a remote-backed bucket, but '{bucket}' uses provider '{provider}'")]
    InvalidBucketProvider {
        bucket: String,
        provider: String,
        action: String,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Network timeout: {0}")]
    Timeout(String),

    #[error("Cluster rejected request: {status} - {message}")]
    ClusterClientError { status: u16, message: String },

    #[error("Cluster returned server error: {status} - {message}")]
    ClusterServerError { status: u16, message: String },

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Job {job_id} aborted: {error}")]
    JobAborted { job_id: String, error: String },

    #[error("Timed out after {waited:?} waiting for job {job_id} (last seen: {last_status})")]
    JobTimeout {
        job_id: String,
        waited: Duration,
        last_status: String,
    },

    #[error("Polling job {job_id} failed after {attempts} attempts: {last_error}")]
    PollFailed {
        job_id: String,
        attempts: usize,
        last_error: String,
    },

    #[error("Metrics error: {0}")]
    MetricsError(String),
}

impl From<reqwest::Error> for GroupOpError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GroupOpError::Timeout(err.to_string())
        } else if err.is_decode() {
            GroupOpError::ParseError(err.to_string())
        } else if let Some(status) = err.status() {
            GroupOpError::from_http_status(status.as_u16(), err.to_string())
        } else {
            GroupOpError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for GroupOpError {
    fn from(err: serde_json::Error) -> Self {
        GroupOpError::ParseError(err.to_string())
    }
}

impl From<prometheus::Error> for GroupOpError {
    fn from(err: prometheus::Error) -> Self {
        GroupOpError::MetricsError(err.to_string())
    }
}

impl GroupOpError {
    /// Client-side validation failure, detected before any network call
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            GroupOpError::InvalidRange(_)
                | GroupOpError::EmptySelection
                | GroupOpError::AmbiguousSelection
                | GroupOpError::InvalidBucketProvider { .. }
        )
    }

    /// Network or transport-level failure
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            GroupOpError::Transport(_)
                | GroupOpError::Timeout(_)
                | GroupOpError::ClusterServerError { .. }
                | GroupOpError::PollFailed { .. }
        )
    }

    /// Determine if a failed status poll should be retried
    ///
    /// Only transient failures qualify: connectivity loss, request timeouts and
    /// 5xx responses. Validation errors, 4xx responses, unknown jobs and job
    /// outcomes are final.
    pub fn should_retry(&self) -> bool {
        match self {
            GroupOpError::Transport(_) => true,
            GroupOpError::Timeout(_) => true,
            GroupOpError::ClusterServerError { .. } => true,

            GroupOpError::InvalidRange(_) => false,
            GroupOpError::EmptySelection => false,
            GroupOpError::AmbiguousSelection => false,
            GroupOpError::InvalidBucketProvider { .. } => false,
            GroupOpError::ConfigError(_) => false,
            GroupOpError::ClusterClientError { .. } => false,
            GroupOpError::ParseError(_) => false,
            GroupOpError::JobNotFound(_) => false,

            // Already terminal or already retried
            GroupOpError::JobAborted { .. } => false,
            GroupOpError::JobTimeout { .. } => false,
            GroupOpError::PollFailed { .. } => false,
            GroupOpError::MetricsError(_) => false,
        }
    }

    /// Create an error from an HTTP status code
    ///
    /// Automatically categorizes as 4xx or 5xx error
    pub fn from_http_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        if (400..500).contains(&status) {
            GroupOpError::ClusterClientError { status, message }
        } else if (500..600).contains(&status) {
            GroupOpError::ClusterServerError { status, message }
        } else {
            GroupOpError::Transport(format!("HTTP {}: {}", status, message))
        }
    }
}
