//! Cache repository abstraction
//!
//! The orchestrator talks to the cache only through [`CacheStore`], so the
//! file-backed [`CacheManager`](super::CacheManager) and the
//! [`InMemoryCacheStore`](super::InMemoryCacheStore) are interchangeable.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::PersistenceResult;

/// A downloaded file recorded in the cache manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(rename = "ProductSlug")]
    pub product_slug: String,
    #[serde(rename = "Version")]
    pub version: String,
    #[serde(rename = "ProductFileID")]
    pub product_file_id: u64,
    #[serde(rename = "FilePath")]
    pub file_path: PathBuf,
    #[serde(rename = "DownloadedAt")]
    pub downloaded_at: DateTime<Utc>,
    #[serde(rename = "FileSize")]
    pub file_size: u64,
    /// Digest verified at download time, when the catalog published one
    #[serde(rename = "Sha256", default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

impl CacheEntry {
    /// Create an entry stamped with the current time
    pub fn new(
        product_slug: &str,
        version: &str,
        product_file_id: u64,
        file_path: &Path,
        file_size: u64,
    ) -> Self {
        Self {
            product_slug: product_slug.to_string(),
            version: version.to_string(),
            product_file_id,
            file_path: file_path.to_path_buf(),
            downloaded_at: Utc::now().trunc_subsecs(0),
            file_size,
            sha256: None,
        }
    }

    /// Attach a verified digest
    pub fn with_sha256(mut self, sha256: Option<String>) -> Self {
        self.sha256 = sha256;
        self
    }

    /// Whether the entry was downloaded before the cutoff
    pub fn is_older_than(&self, cutoff: DateTime<Utc>) -> bool {
        self.downloaded_at < cutoff
    }
}

/// Persistent key → entry store with age-based eviction
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Look up an entry, dropping it if its file no longer exists
    async fn get(
        &self,
        product_slug: &str,
        version: &str,
        product_file_id: u64,
    ) -> PersistenceResult<Option<CacheEntry>>;

    /// Insert or replace an entry
    async fn add(&self, entry: CacheEntry) -> PersistenceResult<()>;

    /// Evict entries older than `max_age_days`, deleting their files
    ///
    /// Returns the number of entries removed.
    async fn cleanup_old(&self, max_age_days: u32) -> PersistenceResult<usize>;

    /// All live entries ordered by key
    async fn entries(&self) -> Vec<CacheEntry>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_manifest_field_names() {
        let entry = CacheEntry::new("cf", "10.2.5", 7, Path::new("/cache/cf.pivotal"), 1024);
        let json = serde_json::to_value(&entry).unwrap();

        assert_eq!(json["ProductSlug"], "cf");
        assert_eq!(json["Version"], "10.2.5");
        assert_eq!(json["ProductFileID"], 7);
        assert_eq!(json["FilePath"], "/cache/cf.pivotal");
        assert_eq!(json["FileSize"], 1024);
        assert!(json.get("Sha256").is_none());
        // RFC3339 with second precision
        let stamp = json["DownloadedAt"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(stamp).is_ok());
    }

    #[test]
    fn test_reads_go_style_timestamps() {
        let raw = r#"{
            "ProductSlug": "cf",
            "Version": "6.0.22+LTS-T",
            "ProductFileID": 12,
            "FilePath": "/cache/srt.pivotal",
            "DownloadedAt": "2024-05-01T10:00:00Z",
            "FileSize": 99
        }"#;
        let entry: CacheEntry = serde_json::from_str(raw).unwrap();
        assert_eq!(entry.product_file_id, 12);
        assert_eq!(entry.sha256, None);
    }

    #[test]
    fn test_age_comparison() {
        let mut entry = CacheEntry::new("cf", "1", 1, Path::new("/x"), 1);
        entry.downloaded_at = Utc::now() - Duration::days(8);
        assert!(entry.is_older_than(Utc::now() - Duration::days(7)));
        assert!(!entry.is_older_than(Utc::now() - Duration::days(9)));
    }
}
