//! Core data structures shared by the selector, dispatcher, monitor and reporter

use crate::error::{GroupOpError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Storage provider a bucket is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Native cluster-local storage, no remote tier
    Ais,
    Aws,
    Gcp,
    Azure,
    Hdfs,
    /// Plain HTTP origin
    Ht,
}

impl Provider {
    /// Short name used on the wire and in `provider://bucket` notation
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Ais => "ais",
            Provider::Aws => "aws",
            Provider::Gcp => "gcp",
            Provider::Azure => "azure",
            Provider::Hdfs => "hdfs",
            Provider::Ht => "ht",
        }
    }

    /// Whether objects of this provider live in a remote store with the
    /// cluster acting as a cache in front of it
    pub fn has_remote_tier(&self) -> bool {
        !matches!(self, Provider::Ais)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = GroupOpError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ais" => Ok(Provider::Ais),
            "aws" | "s3" => Ok(Provider::Aws),
            "gcp" | "gs" => Ok(Provider::Gcp),
            "azure" | "az" => Ok(Provider::Azure),
            "hdfs" => Ok(Provider::Hdfs),
            "ht" => Ok(Provider::Ht),
            other => Err(GroupOpError::ParseError(format!(
                "Unknown bucket provider '{}'",
                other
            ))),
        }
    }
}

/// A named bucket bound to one provider
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bucket {
    pub name: String,
    pub provider: Provider,
}

impl Bucket {
    pub fn new(name: impl Into<String>, provider: Provider) -> Self {
        Bucket {
            name: name.into(),
            provider,
        }
    }

    /// Bucket on native cluster storage
    pub fn native(name: impl Into<String>) -> Self {
        Bucket::new(name, Provider::Ais)
    }

    /// Parse `provider://name`; a bare name is a native bucket
    pub fn parse(uri: &str) -> Result<Self> {
        let (provider, name) = match uri.split_once("://") {
            Some((provider, name)) => (provider.parse::<Provider>()?, name),
            None => (Provider::Ais, uri),
        };
        let name = name.trim_end_matches('/');
        if name.is_empty() || name.contains('/') {
            return Err(GroupOpError::ParseError(format!(
                "Invalid bucket name in '{}'",
                uri
            )));
        }
        Ok(Bucket::new(name, provider))
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.provider, self.name)
    }
}

/// Bulk action applied to a selection of objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Delete,
    Evict,
    Prefetch,
}

impl ActionKind {
    /// Action name understood by the cluster's bucket endpoint
    pub fn wire_name(&self) -> &'static str {
        match self {
            ActionKind::Delete => "delete-listrange",
            ActionKind::Evict => "evict-listrange",
            ActionKind::Prefetch => "prefetch-listrange",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Delete => "delete",
            ActionKind::Evict => "evict",
            ActionKind::Prefetch => "prefetch",
        }
    }

    /// Evict and prefetch only make sense for buckets with a remote tier
    pub fn requires_remote_tier(&self) -> bool {
        matches!(self, ActionKind::Evict | ActionKind::Prefetch)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cluster-unique job identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        JobId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        JobId::new(id)
    }
}

/// Cluster-reported job state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Submitted,
    Running,
    Finished,
    Aborted,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Finished | JobStatus::Aborted)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Submitted => "submitted",
            JobStatus::Running => "running",
            JobStatus::Finished => "finished",
            JobStatus::Aborted => "aborted",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a job as reported by the cluster
///
/// Jobs are created at dispatch and only ever change state on the cluster
/// side; the client polls them and never mutates them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub action: ActionKind,
    pub bucket: String,
    #[serde(default = "default_provider")]
    pub provider: Provider,
    pub status: JobStatus,
    /// Creation time, milliseconds since the Unix epoch
    #[serde(default)]
    pub created_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn default_provider() -> Provider {
    Provider::Ais
}

/// Object property that can be requested when listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectProp {
    Name,
    Size,
    Version,
    Checksum,
    Atime,
    Cached,
    Status,
    Copies,
    Location,
}

impl ObjectProp {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectProp::Name => "name",
            ObjectProp::Size => "size",
            ObjectProp::Version => "version",
            ObjectProp::Checksum => "checksum",
            ObjectProp::Atime => "atime",
            ObjectProp::Cached => "cached",
            ObjectProp::Status => "status",
            ObjectProp::Copies => "copies",
            ObjectProp::Location => "location",
        }
    }

    /// Render a property list as the comma-separated query value, always
    /// including `name` and without duplicates
    pub fn join(props: &[ObjectProp]) -> String {
        let mut all: Vec<ObjectProp> = Vec::with_capacity(props.len() + 1);
        all.push(ObjectProp::Name);
        for prop in props {
            if !all.contains(prop) {
                all.push(*prop);
            }
        }
        all.iter().map(|p| p.as_str()).collect::<Vec<_>>().join(",")
    }
}

/// One listed object
///
/// `cached` is only meaningful when the `cached` property was requested;
/// otherwise it is `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectEntry {
    pub name: String,
    #[serde(default = "default_ok")]
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub atime: Option<String>,
    /// Remaining properties, passed through as reported
    #[serde(flatten)]
    pub other: BTreeMap<String, serde_json::Value>,
}

fn default_ok() -> bool {
    true
}

impl ObjectEntry {
    pub fn new(name: impl Into<String>) -> Self {
        ObjectEntry {
            name: name.into(),
            ok: true,
            cached: None,
            size: None,
            version: None,
            atime: None,
            other: BTreeMap::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.ok
    }

    /// True only when caching state was requested and the object is cached
    pub fn is_cached(&self) -> bool {
        self.cached.unwrap_or(false)
    }
}
