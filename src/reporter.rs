//! Cache state reporter: read-only object listings used to verify outcomes

use crate::cluster_api::{ClusterApi, ListRequest};
use crate::error::{GroupOpError, Result};
use crate::models::{Bucket, ObjectEntry, ObjectProp};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Lists objects with their properties, following pagination
///
/// Listings take no locks and are not coordinated with running jobs. The
/// `cached` flag reflects each target's local state at read time, so it is
/// only comparable to an action's intent once that action's job is terminal.
pub struct CacheStateReporter {
    api: Arc<dyn ClusterApi>,
    page_size: usize,
}

impl CacheStateReporter {
    pub fn new(api: Arc<dyn ClusterApi>) -> Self {
        Self { api, page_size: 0 }
    }

    /// Entries per page; 0 lets the cluster decide
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// List every object in `bucket` whose name starts with `prefix`
    ///
    /// `name` is always requested. Each entry's `cached` is `Some` exactly
    /// when [`ObjectProp::Cached`] is among `props`.
    pub async fn list(
        &self,
        bucket: &Bucket,
        prefix: &str,
        props: &[ObjectProp],
    ) -> Result<Vec<ObjectEntry>> {
        let want_cached = props.contains(&ObjectProp::Cached);
        let mut request = ListRequest {
            prefix: prefix.to_string(),
            props: ObjectProp::join(props),
            page_size: self.page_size,
            continuation_token: None,
        };

        let mut entries = Vec::new();
        let mut pages = 0usize;
        let mut seen_tokens = HashSet::new();
        loop {
            let page = self.api.list_objects(bucket, &request).await?;
            pages += 1;
            entries.extend(page.entries);

            let token = match page.continuation_token {
                Some(token) if !token.is_empty() => token,
                _ => break,
            };
            // A token handed out twice would page forever
            if !seen_tokens.insert(token.clone()) {
                warn!(
                    "Listing bucket {} made no progress: continuation token '{}' repeated after {} pages",
                    bucket, token, pages
                );
                return Err(GroupOpError::ParseError(format!(
                    "Cluster repeated continuation token '{}' while listing bucket {}",
                    token, bucket
                )));
            }
            request.continuation_token = Some(token);
        }

        for entry in &mut entries {
            entry.cached = if want_cached {
                Some(entry.cached.unwrap_or(false))
            } else {
                None
            };
        }

        debug!(
            "Listed {} objects with prefix '{}' in bucket {} ({} pages)",
            entries.len(),
            prefix,
            bucket,
            pages
        );
        Ok(entries)
    }

    /// Names of objects under `prefix` that are currently cached
    pub async fn cached_names(&self, bucket: &Bucket, prefix: &str) -> Result<Vec<String>> {
        let entries = self.list(bucket, prefix, &[ObjectProp::Cached]).await?;
        Ok(entries
            .into_iter()
            .filter(|e| e.is_cached())
            .map(|e| e.name)
            .collect())
    }
}
