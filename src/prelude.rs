//! Prelude module for the Tile Fetcher library
//!
//! Re-exports the items needed to drive a download with a single
//! `use tile_fetcher::prelude::*;` statement.
//!
//! # Usage
//!
//! ```rust,no_run
//! use tile_fetcher::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = AppConfig::load(None).await?;
//!     let cache_dir = config.cache_dir()?;
//!
//!     let orchestrator = DownloadOrchestrator::new(
//!         Arc::new(PivnetClient::new(config.catalog.clone(), "my-api-token-000000")?),
//!         Arc::new(CacheManager::new(config.manifest_file()?).await?),
//!         Arc::new(EulaManager::new(config.eula_file()?).await?),
//!         DiskSpaceManager::new(config.storage.min_free_space_gb),
//!     );
//!
//!     let options = DownloadOptions::new("cf", "10.2", cache_dir).with_non_interactive(true);
//!     let outcome = orchestrator.download(&options).await?;
//!     println!("{}", outcome.path.display());
//!     Ok(())
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, ErrorKind, Result};

pub use crate::config::AppConfig;

pub use crate::app::{
    // Stores and ports
    CacheManager,
    CacheStore,
    CatalogClient,
    ClientConfig,
    DiskSpaceManager,
    EulaManager,
    EulaStore,
    InteractionPort,
    PivnetClient,

    // Pipeline
    DownloadOptions,
    DownloadOrchestrator,
    DownloadOutcome,
    DownloadState,
    TransferObserver,

    // Data types
    ArtifactFile,
    Release,
    Sha256Digest,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prelude_imports() {
        let _config = ClientConfig::default();
        let options = DownloadOptions::new("cf", "10.2.5", "/tmp/tiles");
        assert!(!options.non_interactive);
        assert_eq!(Release::new(1, "10.2.5").version, "10.2.5");
    }
}
