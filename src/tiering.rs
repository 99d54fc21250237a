//! Tiering policy guard
//!
//! Evict and prefetch move objects between the cluster cache and a remote
//! store, so they are rejected up front for buckets that have no remote tier.

use crate::error::{GroupOpError, Result};
use crate::models::{ActionKind, Bucket};
use tracing::debug;

/// Check that `action` is applicable to `bucket`'s provider
///
/// Pure function of the provider and the action; never touches the network.
/// `Delete` is valid for every provider.
pub fn check_action(bucket: &Bucket, action: ActionKind) -> Result<()> {
    if action.requires_remote_tier() && !bucket.provider.has_remote_tier() {
        debug!(
            "Rejecting {} for bucket {}: provider has no remote tier",
            action, bucket
        );
        return Err(GroupOpError::InvalidBucketProvider {
            bucket: bucket.name.clone(),
            provider: bucket.provider.to_string(),
            action: action.to_string(),
        });
    }
    Ok(())
}
