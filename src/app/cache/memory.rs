//! In-memory cache store
//!
//! Same contract as the file-backed manager without a manifest file. File
//! existence and eviction still go through the real filesystem so that the
//! self-healing and cleanup behavior match.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::Path;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::fs;
use tokio::sync::RwLock;

use crate::app::models::cache_key;
use crate::errors::{PersistenceError, PersistenceResult};

use super::store::{CacheEntry, CacheStore};

#[derive(Debug, Default)]
pub struct InMemoryCacheStore {
    entries: RwLock<BTreeMap<String, CacheEntry>>,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(
        &self,
        product_slug: &str,
        version: &str,
        product_file_id: u64,
    ) -> PersistenceResult<Option<CacheEntry>> {
        let key = cache_key(product_slug, version, product_file_id);
        let mut entries = self.entries.write().await;

        match entries.get(&key) {
            Some(entry) if Path::new(&entry.file_path).exists() => Ok(Some(entry.clone())),
            Some(_) => {
                entries.remove(&key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn add(&self, entry: CacheEntry) -> PersistenceResult<()> {
        let key = cache_key(&entry.product_slug, &entry.version, entry.product_file_id);
        self.entries.write().await.insert(key, entry);
        Ok(())
    }

    async fn cleanup_old(&self, max_age_days: u32) -> PersistenceResult<usize> {
        let cutoff = Utc::now() - Duration::days(i64::from(max_age_days));
        let mut entries = self.entries.write().await;
        let mut removed = 0;

        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| entry.is_older_than(cutoff))
            .map(|(key, _)| key.clone())
            .collect();

        for key in expired {
            let Some(entry) = entries.get(&key) else {
                continue;
            };

            match fs::remove_file(&entry.file_path).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(PersistenceError::RemoveFile {
                        path: entry.file_path.clone(),
                        source,
                    })
                }
            }

            entries.remove(&key);
            removed += 1;
        }

        Ok(removed)
    }

    async fn entries(&self) -> Vec<CacheEntry> {
        self.entries.read().await.values().cloned().collect()
    }
}
