//! Cache statistics
//!
//! Summaries of what the cache manifest holds, used by the `cache list`
//! command and by log output after evictions.

use std::path::PathBuf;

use crate::app::models::format_bytes;

/// Cache statistics
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Manifest file the statistics were taken from
    pub manifest_path: PathBuf,
    /// Number of entries in the manifest
    pub entry_count: usize,
    /// Total size of cached files in bytes
    pub total_cache_size: u64,
    /// Available disk space in bytes, when measured
    pub available_space: Option<u64>,
}

impl CacheStats {
    /// Create new cache statistics
    pub fn new(manifest_path: PathBuf) -> Self {
        Self {
            manifest_path,
            entry_count: 0,
            total_cache_size: 0,
            available_space: None,
        }
    }

    /// Update entry counts
    pub fn set_entry_stats(&mut self, entry_count: usize, total_cache_size: u64) {
        self.entry_count = entry_count;
        self.total_cache_size = total_cache_size;
    }

    /// Record free space on the cache volume
    pub fn set_available_space(&mut self, available_space: u64) {
        self.available_space = Some(available_space);
    }

    /// Get cache usage as percentage of cache plus free space
    pub fn usage_percentage(&self) -> f64 {
        match self.available_space {
            Some(available) if self.total_cache_size + available > 0 => {
                (self.total_cache_size as f64 / (self.total_cache_size + available) as f64)
                    * 100.0
            }
            _ => 0.0,
        }
    }

    /// Format cache size in human-readable format
    pub fn format_cache_size(&self) -> String {
        format_bytes(self.total_cache_size)
    }

    /// Format available space in human-readable format
    pub fn format_available_space(&self) -> String {
        self.available_space
            .map(format_bytes)
            .unwrap_or_else(|| "unknown".to_string())
    }
}
