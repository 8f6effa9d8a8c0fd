//! Storage bucket configuration.

use crate::env::{
    ENV_STORAGE_DOCUMENTS, ENV_STORAGE_PHOTOS, ENV_STORAGE_RECEIPTS, ENV_STORAGE_REPORTS, EnvMap,
};
use dernek_domain::BucketId;
use serde::{Deserialize, Serialize};

/// Bucket ids used by the dashboard, each overridable from the environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageBuckets {
    /// Uploaded beneficiary and member documents.
    pub documents: BucketId,
    /// Donation receipts.
    pub receipts: BucketId,
    /// Photos.
    pub photos: BucketId,
    /// Generated reports.
    pub reports: BucketId,
}

impl StorageBuckets {
    /// Resolve bucket ids, falling back to the bucket name for unset entries.
    #[must_use]
    pub fn from_map(env: &EnvMap) -> Self {
        Self {
            documents: bucket(env, ENV_STORAGE_DOCUMENTS, "documents"),
            receipts: bucket(env, ENV_STORAGE_RECEIPTS, "receipts"),
            photos: bucket(env, ENV_STORAGE_PHOTOS, "photos"),
            reports: bucket(env, ENV_STORAGE_REPORTS, "reports"),
        }
    }
}

impl Default for StorageBuckets {
    fn default() -> Self {
        Self::from_map(&EnvMap::new())
    }
}

fn bucket(env: &EnvMap, var: &str, fallback: &'static str) -> BucketId {
    env.get(var)
        .and_then(|value| BucketId::parse(value).ok())
        .unwrap_or_else(|| BucketId::from_static(fallback))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_bucket_names() {
        let buckets = StorageBuckets::default();
        assert_eq!(buckets.documents.as_str(), "documents");
        assert_eq!(buckets.receipts.as_str(), "receipts");
        assert_eq!(buckets.photos.as_str(), "photos");
        assert_eq!(buckets.reports.as_str(), "reports");
    }

    #[test]
    fn env_overrides_single_bucket() {
        let mut env = EnvMap::new();
        env.insert(ENV_STORAGE_RECEIPTS.to_owned(), " receipts_2024 ".to_owned());
        env.insert(ENV_STORAGE_PHOTOS.to_owned(), "   ".to_owned());

        let buckets = StorageBuckets::from_map(&env);
        assert_eq!(buckets.receipts.as_str(), "receipts_2024");
        assert_eq!(buckets.photos.as_str(), "photos");
    }
}
