//! Download cache
//!
//! Tracks which catalog files are already on disk so repeated requests for the
//! same product, version and file skip the network entirely.
//!
//! # Module Organization
//!
//! - [`store`] - The [`CacheStore`] trait and the [`CacheEntry`] record
//! - [`manager`] - File-backed store mirrored to `manifest.json`
//! - [`memory`] - In-memory store for tests and embedding
//! - [`stats`] - Cache statistics
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::path::Path;
//! use tile_fetcher::app::cache::{CacheEntry, CacheManager, CacheStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = CacheManager::in_directory(Path::new("/tmp/tile-cache")).await?;
//!
//! if let Some(entry) = cache.get("cf", "10.2.5", 42).await? {
//!     println!("Already downloaded: {}", entry.file_path.display());
//! } else {
//!     let path = Path::new("/tmp/tile-cache/cf-10.2.5.pivotal");
//!     cache.add(CacheEntry::new("cf", "10.2.5", 42, path, 1024)).await?;
//! }
//!
//! let evicted = cache.cleanup_old(7).await?;
//! println!("Evicted {} old entries", evicted);
//! # Ok(())
//! # }
//! ```

pub mod manager;
pub mod memory;
pub mod stats;
pub mod store;

// Re-export main public API
pub use manager::CacheManager;
pub use memory::InMemoryCacheStore;
pub use stats::CacheStats;
pub use store::{CacheEntry, CacheStore};
