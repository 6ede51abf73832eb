//! Core application logic for Tile Fetcher
//!
//! This module contains the download pipeline: the catalog client, version
//! resolution, the download cache, the EULA ledger, disk space policy and the
//! orchestrator that ties them together.
//!
//! # Examples
//!
//! ```rust,no_run
//! use tile_fetcher::app::{CatalogClient, ClientConfig, PivnetClient, VersionResolver};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = PivnetClient::new(ClientConfig::default(), "my-api-token-000000")?;
//! let releases = client.list_releases("cf").await?;
//!
//! let resolver = VersionResolver::new(releases, true);
//! let result = resolver.resolve("10.2.5")?;
//! if let Some(release) = result.selected {
//!     println!("Release {} has id {}", release.version, release.id);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod catalog;
pub mod checksum;
pub mod client;
pub mod disk_space;
pub mod eula;
pub mod interaction;
pub mod models;
pub mod orchestrator;
pub mod persist;
pub mod resolver;

// Re-export main public API
pub use cache::{CacheEntry, CacheManager, CacheStats, CacheStore, InMemoryCacheStore};
pub use catalog::{eula_url, CatalogClient};
pub use checksum::Sha256Digest;
pub use client::{ClientConfig, PivnetClient};
pub use disk_space::{DiskSpaceManager, FixedSpaceSource, SpaceSource, SystemSpaceSource};
pub use eula::{EulaManager, EulaOutcome, EulaRecord, EulaStore, InMemoryEulaStore};
pub use interaction::{InteractionPort, NonInteractive, ScriptedAnswer, ScriptedInteraction};
pub use models::{cache_key, eula_key, format_bytes, ArtifactFile, DownloadOptions, Release};
pub use orchestrator::{
    DownloadOrchestrator, DownloadOutcome, DownloadState, TransferObserver,
};
pub use resolver::{ResolveResult, VersionResolver};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_structure() {
        let config = ClientConfig::default();
        assert!(config.rate_limit_rps > 0);
        assert_eq!(cache_key("cf", "10.2.5", 7), "cf-10.2.5-7");
    }
}
