//! File-backed cache manager
//!
//! This module contains the [`CacheManager`], which mirrors the cache map to a
//! JSON manifest on every mutation. The manifest is the only record of which
//! downloaded files are trusted; the files themselves live alongside it in the
//! cache directory.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::app::models::cache_key;
use crate::app::persist;
use crate::constants::files;
use crate::errors::{PersistenceError, PersistenceResult};

use super::stats::CacheStats;
use super::store::{CacheEntry, CacheStore};

/// Main cache management system
#[derive(Debug)]
pub struct CacheManager {
    /// Location of the JSON manifest
    manifest_path: PathBuf,
    /// Source of truth for the lifetime of the process
    entries: RwLock<BTreeMap<String, CacheEntry>>,
}

impl CacheManager {
    /// Open the cache manifest at `manifest_path`
    ///
    /// A missing manifest yields an empty cache.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError` if the manifest exists but cannot be read or parsed
    pub async fn new(manifest_path: impl Into<PathBuf>) -> PersistenceResult<Self> {
        let manifest_path = manifest_path.into();
        let entries = persist::load_map(&manifest_path).await?;

        info!(
            "Loaded cache manifest {} with {} entries",
            manifest_path.display(),
            entries.len()
        );

        Ok(Self {
            manifest_path,
            entries: RwLock::new(entries),
        })
    }

    /// Open the manifest stored inside a cache directory
    pub async fn in_directory(cache_dir: &Path) -> PersistenceResult<Self> {
        Self::new(cache_dir.join(files::MANIFEST_FILE_NAME)).await
    }

    /// Get the manifest path
    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    /// Number of entries currently recorded
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the cache has no entries
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Summarize entry count and total size
    pub async fn stats(&self) -> CacheStats {
        let entries = self.entries.read().await;
        let mut stats = CacheStats::new(self.manifest_path.clone());
        stats.set_entry_stats(entries.len(), entries.values().map(|e| e.file_size).sum());
        stats
    }

    /// Delete leftover `.tmp` files from interrupted transfers in `dir`
    ///
    /// Transfers killed mid-copy leave their temp file behind; nothing else
    /// cleans them up, so callers run this once at startup.
    pub async fn sweep_temp_files(&self, dir: &Path) -> PersistenceResult<usize> {
        let mut read_dir = match fs::read_dir(dir).await {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(source) => {
                return Err(PersistenceError::Read {
                    path: dir.to_path_buf(),
                    source,
                })
            }
        };

        let mut removed = 0;
        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(|source| PersistenceError::Read {
                path: dir.to_path_buf(),
                source,
            })?
        {
            let path = entry.path();
            let is_temp = path
                .file_name()
                .map(|name| name.to_string_lossy().ends_with(files::TEMP_FILE_SUFFIX))
                .unwrap_or(false);
            if !is_temp || !entry.file_type().await.map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }

            match fs::remove_file(&path).await {
                Ok(()) => {
                    debug!("Removed stale temp file {}", path.display());
                    removed += 1;
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(source) => return Err(PersistenceError::RemoveFile { path, source }),
            }
        }

        if removed > 0 {
            info!("Swept {} stale temp files from {}", removed, dir.display());
        }
        Ok(removed)
    }

    async fn save(&self, entries: &BTreeMap<String, CacheEntry>) -> PersistenceResult<()> {
        persist::save_map(&self.manifest_path, entries).await
    }
}

#[async_trait]
impl CacheStore for CacheManager {
    async fn get(
        &self,
        product_slug: &str,
        version: &str,
        product_file_id: u64,
    ) -> PersistenceResult<Option<CacheEntry>> {
        let key = cache_key(product_slug, version, product_file_id);
        let mut entries = self.entries.write().await;

        let Some(entry) = entries.get(&key) else {
            return Ok(None);
        };

        if fs::metadata(&entry.file_path).await.is_ok() {
            return Ok(Some(entry.clone()));
        }

        warn!(
            "Cached file {} is gone, dropping entry {}",
            entry.file_path.display(),
            key
        );
        entries.remove(&key);
        self.save(&entries).await?;
        Ok(None)
    }

    async fn add(&self, entry: CacheEntry) -> PersistenceResult<()> {
        let key = cache_key(&entry.product_slug, &entry.version, entry.product_file_id);
        let mut entries = self.entries.write().await;

        debug!("Caching {} at {}", key, entry.file_path.display());
        entries.insert(key, entry);
        self.save(&entries).await
    }

    async fn cleanup_old(&self, max_age_days: u32) -> PersistenceResult<usize> {
        let cutoff = Utc::now() - Duration::days(i64::from(max_age_days));
        let mut entries = self.entries.write().await;

        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| entry.is_older_than(cutoff))
            .map(|(key, _)| key.clone())
            .collect();

        let mut removed = 0;
        for key in expired {
            let Some(entry) = entries.get(&key) else {
                continue;
            };

            match fs::remove_file(&entry.file_path).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(source) => {
                    let path = entry.file_path.clone();
                    // Keep the manifest consistent with the files already deleted
                    if removed > 0 {
                        self.save(&entries).await?;
                    }
                    return Err(PersistenceError::RemoveFile { path, source });
                }
            }

            debug!("Evicted {} ({})", key, entry.file_path.display());
            entries.remove(&key);
            removed += 1;
        }

        if removed > 0 {
            self.save(&entries).await?;
            info!(
                "Cleaned up {} cache entries older than {} days",
                removed, max_age_days
            );
        }

        Ok(removed)
    }

    async fn entries(&self) -> Vec<CacheEntry> {
        self.entries.read().await.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn write_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).await.unwrap();
        path
    }

    async fn backdate(cache: &CacheManager, key: &str, days: i64) {
        let mut entries = cache.entries.write().await;
        let entry = entries.get_mut(key).unwrap();
        entry.downloaded_at = Utc::now() - Duration::days(days);
        cache.save(&entries).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_manifest_is_empty_cache() {
        let temp_dir = TempDir::new().unwrap();
        let cache = CacheManager::in_directory(temp_dir.path()).await.unwrap();

        assert!(cache.is_empty().await);
        assert_eq!(cache.get("cf", "10.2.5", 1).await.unwrap(), None);
        assert!(!cache.manifest_path().exists());
    }

    #[tokio::test]
    async fn test_add_then_get_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let cache = CacheManager::in_directory(temp_dir.path()).await.unwrap();
        let file = write_file(temp_dir.path(), "cf-10.2.5.pivotal", b"tile").await;

        cache
            .add(CacheEntry::new("cf", "10.2.5", 42, &file, 4))
            .await
            .unwrap();

        let entry = cache.get("cf", "10.2.5", 42).await.unwrap().unwrap();
        assert_eq!(entry.file_path, file);
        assert_eq!(entry.file_size, 4);
        assert!(cache.manifest_path().exists());
    }

    #[tokio::test]
    async fn test_vanished_file_is_purged_and_not_resurrected() {
        let temp_dir = TempDir::new().unwrap();
        let file = write_file(temp_dir.path(), "cf.pivotal", b"tile").await;

        let cache = CacheManager::in_directory(temp_dir.path()).await.unwrap();
        cache
            .add(CacheEntry::new("cf", "10.2.5", 42, &file, 4))
            .await
            .unwrap();

        fs::remove_file(&file).await.unwrap();
        assert_eq!(cache.get("cf", "10.2.5", 42).await.unwrap(), None);

        let reloaded = CacheManager::in_directory(temp_dir.path()).await.unwrap();
        assert!(reloaded.is_empty().await);
    }

    #[tokio::test]
    async fn test_entries_survive_reconstruction() {
        let temp_dir = TempDir::new().unwrap();
        let file = write_file(temp_dir.path(), "srt.pivotal", b"small runtime").await;

        {
            let cache = CacheManager::in_directory(temp_dir.path()).await.unwrap();
            cache
                .add(CacheEntry::new("cf", "6.0.22+LTS-T", 9, &file, 13))
                .await
                .unwrap();
        }

        let cache = CacheManager::in_directory(temp_dir.path()).await.unwrap();
        let entry = cache.get("cf", "6.0.22+LTS-T", 9).await.unwrap().unwrap();
        assert_eq!(entry.file_path, file);
        assert_eq!(entry.file_size, 13);
    }

    #[tokio::test]
    async fn test_add_upserts_existing_key() {
        let temp_dir = TempDir::new().unwrap();
        let cache = CacheManager::in_directory(temp_dir.path()).await.unwrap();
        let first = write_file(temp_dir.path(), "a.pivotal", b"a").await;
        let second = write_file(temp_dir.path(), "b.pivotal", b"bb").await;

        cache
            .add(CacheEntry::new("cf", "10.2.5", 1, &first, 1))
            .await
            .unwrap();
        cache
            .add(CacheEntry::new("cf", "10.2.5", 1, &second, 2))
            .await
            .unwrap();

        assert_eq!(cache.len().await, 1);
        let entry = cache.get("cf", "10.2.5", 1).await.unwrap().unwrap();
        assert_eq!(entry.file_path, second);
    }

    #[tokio::test]
    async fn test_cleanup_old_removes_only_expired_entries() {
        let temp_dir = TempDir::new().unwrap();
        let cache = CacheManager::in_directory(temp_dir.path()).await.unwrap();
        let old_file = write_file(temp_dir.path(), "old.pivotal", b"old").await;
        let new_file = write_file(temp_dir.path(), "new.pivotal", b"new").await;

        cache
            .add(CacheEntry::new("cf", "10.2.4", 1, &old_file, 3))
            .await
            .unwrap();
        cache
            .add(CacheEntry::new("cf", "10.2.5", 2, &new_file, 3))
            .await
            .unwrap();
        backdate(&cache, "cf-10.2.4-1", 8).await;
        backdate(&cache, "cf-10.2.5-2", 2).await;

        let removed = cache.cleanup_old(7).await.unwrap();

        assert_eq!(removed, 1);
        assert!(!old_file.exists());
        assert!(new_file.exists());
        assert_eq!(cache.get("cf", "10.2.4", 1).await.unwrap(), None);
        assert!(cache.get("cf", "10.2.5", 2).await.unwrap().is_some());

        let reloaded = CacheManager::in_directory(temp_dir.path()).await.unwrap();
        assert_eq!(reloaded.len().await, 1);
    }

    #[tokio::test]
    async fn test_cleanup_tolerates_already_deleted_files() {
        let temp_dir = TempDir::new().unwrap();
        let cache = CacheManager::in_directory(temp_dir.path()).await.unwrap();
        let file = write_file(temp_dir.path(), "gone.pivotal", b"x").await;

        cache
            .add(CacheEntry::new("cf", "1.0", 1, &file, 1))
            .await
            .unwrap();
        backdate(&cache, "cf-1.0-1", 30).await;
        fs::remove_file(&file).await.unwrap();

        assert_eq!(cache.cleanup_old(7).await.unwrap(), 1);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_cleanup_with_nothing_expired_does_not_write() {
        let temp_dir = TempDir::new().unwrap();
        let cache = CacheManager::in_directory(temp_dir.path()).await.unwrap();

        assert_eq!(cache.cleanup_old(7).await.unwrap(), 0);
        assert!(!cache.manifest_path().exists());
    }

    #[tokio::test]
    async fn test_sweep_temp_files() {
        let temp_dir = TempDir::new().unwrap();
        let cache = CacheManager::in_directory(temp_dir.path()).await.unwrap();
        write_file(temp_dir.path(), "cf.pivotal.tmp", b"partial").await;
        let kept = write_file(temp_dir.path(), "cf.pivotal", b"complete").await;

        assert_eq!(cache.sweep_temp_files(temp_dir.path()).await.unwrap(), 1);
        assert!(kept.exists());
        assert!(!temp_dir.path().join("cf.pivotal.tmp").exists());

        let missing = temp_dir.path().join("nope");
        assert_eq!(cache.sweep_temp_files(&missing).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_stats_totals() {
        let temp_dir = TempDir::new().unwrap();
        let cache = CacheManager::in_directory(temp_dir.path()).await.unwrap();
        let a = write_file(temp_dir.path(), "a", b"aaaa").await;
        let b = write_file(temp_dir.path(), "b", b"bb").await;

        cache.add(CacheEntry::new("cf", "1", 1, &a, 4)).await.unwrap();
        cache.add(CacheEntry::new("cf", "2", 2, &b, 2)).await.unwrap();

        let stats = cache.stats().await;
        assert_eq!(stats.entry_count, 2);
        assert_eq!(stats.total_cache_size, 6);
    }
}
