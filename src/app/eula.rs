//! EULA acceptance ledger
//!
//! Acceptance is tracked per product *and* version: license terms can change
//! between releases, so accepting one release never covers another. The
//! file-backed [`EulaManager`] writes the ledger through to JSON on every
//! acceptance.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::app::models::eula_key;
use crate::app::persist;
use crate::errors::PersistenceResult;

/// One accepted EULA
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EulaRecord {
    #[serde(rename = "AcceptedAt", alias = "accepted_at")]
    pub accepted_at: DateTime<Utc>,
    #[serde(rename = "ReleaseVersion", alias = "release_version")]
    pub release_version: String,
    #[serde(rename = "EULAURL", alias = "eula_url")]
    pub eula_url: String,
}

/// How the license check for a release was settled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EulaOutcome {
    /// Found in the local ledger
    AlreadyAccepted,
    /// Accepted through the catalog and recorded locally
    AcceptedRemotely,
    /// Remote acceptance failed; record locally once the download succeeds
    DeferredPendingDownload,
    /// The user must accept out of band before downloading
    ManualRequired { eula_url: String },
}

impl EulaOutcome {
    /// Whether the pipeline may proceed to download
    pub fn allows_download(&self) -> bool {
        !matches!(self, EulaOutcome::ManualRequired { .. })
    }

    /// Whether local acceptance still has to be written after the transfer
    pub fn is_deferred(&self) -> bool {
        matches!(self, EulaOutcome::DeferredPendingDownload)
    }
}

/// Persistent per-release acceptance ledger
#[async_trait]
pub trait EulaStore: Send + Sync {
    /// Exact lookup for a product and version
    async fn is_accepted_for_release(&self, product_slug: &str, version: &str) -> bool;

    /// Record acceptance with the current time, replacing any previous record
    async fn accept(
        &self,
        product_slug: &str,
        version: &str,
        eula_url: &str,
    ) -> PersistenceResult<()>;

    /// Fetch the stored record, if any
    async fn record(&self, product_slug: &str, version: &str) -> Option<EulaRecord>;
}

fn new_record(version: &str, eula_url: &str) -> EulaRecord {
    EulaRecord {
        accepted_at: Utc::now().trunc_subsecs(0),
        release_version: version.to_string(),
        eula_url: eula_url.to_string(),
    }
}

/// File-backed EULA ledger
#[derive(Debug)]
pub struct EulaManager {
    ledger_path: PathBuf,
    records: RwLock<BTreeMap<String, EulaRecord>>,
}

impl EulaManager {
    /// Open the ledger at `ledger_path`; a missing file is an empty ledger
    pub async fn new(ledger_path: impl Into<PathBuf>) -> PersistenceResult<Self> {
        let ledger_path = ledger_path.into();
        let records = persist::load_map(&ledger_path).await?;

        debug!(
            "Loaded EULA ledger {} with {} records",
            ledger_path.display(),
            records.len()
        );

        Ok(Self {
            ledger_path,
            records: RwLock::new(records),
        })
    }

    /// Get the ledger path
    pub fn ledger_path(&self) -> &Path {
        &self.ledger_path
    }

    /// Number of recorded acceptances
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl EulaStore for EulaManager {
    async fn is_accepted_for_release(&self, product_slug: &str, version: &str) -> bool {
        self.records
            .read()
            .await
            .contains_key(&eula_key(product_slug, version))
    }

    async fn accept(
        &self,
        product_slug: &str,
        version: &str,
        eula_url: &str,
    ) -> PersistenceResult<()> {
        let mut records = self.records.write().await;
        records.insert(eula_key(product_slug, version), new_record(version, eula_url));
        persist::save_map(&self.ledger_path, &records).await?;

        info!("Recorded EULA acceptance for {} {}", product_slug, version);
        Ok(())
    }

    async fn record(&self, product_slug: &str, version: &str) -> Option<EulaRecord> {
        self.records
            .read()
            .await
            .get(&eula_key(product_slug, version))
            .cloned()
    }
}

/// In-memory EULA ledger
#[derive(Debug, Default)]
pub struct InMemoryEulaStore {
    records: RwLock<BTreeMap<String, EulaRecord>>,
}

impl InMemoryEulaStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EulaStore for InMemoryEulaStore {
    async fn is_accepted_for_release(&self, product_slug: &str, version: &str) -> bool {
        self.records
            .read()
            .await
            .contains_key(&eula_key(product_slug, version))
    }

    async fn accept(
        &self,
        product_slug: &str,
        version: &str,
        eula_url: &str,
    ) -> PersistenceResult<()> {
        self.records
            .write()
            .await
            .insert(eula_key(product_slug, version), new_record(version, eula_url));
        Ok(())
    }

    async fn record(&self, product_slug: &str, version: &str) -> Option<EulaRecord> {
        self.records
            .read()
            .await
            .get(&eula_key(product_slug, version))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    const URL: &str = "https://network.pivotal.io/products/cf/releases/1";

    #[tokio::test]
    async fn test_accept_is_per_version() {
        let temp_dir = TempDir::new().unwrap();
        let ledger = EulaManager::new(temp_dir.path().join("eula.json"))
            .await
            .unwrap();

        assert!(!ledger.is_accepted_for_release("cf", "10.2.5").await);
        ledger.accept("cf", "10.2.5", URL).await.unwrap();

        assert!(ledger.is_accepted_for_release("cf", "10.2.5").await);
        assert!(!ledger.is_accepted_for_release("cf", "10.2.4").await);
        assert!(!ledger.is_accepted_for_release("p-mysql", "10.2.5").await);
    }

    #[tokio::test]
    async fn test_accept_twice_updates_timestamp_without_duplicating() {
        let temp_dir = TempDir::new().unwrap();
        let ledger = EulaManager::new(temp_dir.path().join("eula.json"))
            .await
            .unwrap();

        ledger.accept("cf", "10.2.5", URL).await.unwrap();
        {
            let mut records = ledger.records.write().await;
            let record = records.get_mut("cf-10.2.5").unwrap();
            record.accepted_at = record.accepted_at - Duration::days(3);
        }
        let before = ledger.record("cf", "10.2.5").await.unwrap().accepted_at;

        ledger.accept("cf", "10.2.5", URL).await.unwrap();
        let after = ledger.record("cf", "10.2.5").await.unwrap().accepted_at;

        assert_eq!(ledger.len().await, 1);
        assert!(after > before);
    }

    #[tokio::test]
    async fn test_ledger_persists_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state").join("eula.json");

        EulaManager::new(&path)
            .await
            .unwrap()
            .accept("cf", "6.0.22+LTS-T", URL)
            .await
            .unwrap();

        let reopened = EulaManager::new(&path).await.unwrap();
        let record = reopened.record("cf", "6.0.22+LTS-T").await.unwrap();
        assert_eq!(record.release_version, "6.0.22+LTS-T");
        assert_eq!(record.eula_url, URL);

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"EULAURL\""));
        assert!(text.contains("\"AcceptedAt\""));
    }

    #[tokio::test]
    async fn test_reads_snake_case_ledger() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("eula.json");
        std::fs::write(
            &path,
            r#"{"cf-10.2.5": {"accepted_at": "2024-05-01T10:00:00Z", "release_version": "10.2.5", "eula_url": "u"}}"#,
        )
        .unwrap();

        let ledger = EulaManager::new(&path).await.unwrap();
        assert!(ledger.is_accepted_for_release("cf", "10.2.5").await);
    }

    #[tokio::test]
    async fn test_in_memory_store() {
        let store = InMemoryEulaStore::new();
        store.accept("cf", "1.0", URL).await.unwrap();
        assert!(store.is_accepted_for_release("cf", "1.0").await);
        assert!(!store.is_accepted_for_release("cf", "1.1").await);
    }

    #[test]
    fn test_outcome_flags() {
        assert!(EulaOutcome::DeferredPendingDownload.is_deferred());
        assert!(EulaOutcome::AcceptedRemotely.allows_download());
        assert!(!EulaOutcome::ManualRequired {
            eula_url: URL.to_string()
        }
        .allows_download());
    }
}
