//! Download orchestration
//!
//! [`DownloadOrchestrator`] runs one request through the pipeline
//!
//! ```text
//! ResolvingVersion -> SelectingFile -> CheckingCache -(hit)-> Done
//!                                          |
//!        CheckingEula -> CheckingDiskSpace -> Transferring -> Verifying -> Committing -> Done
//! ```
//!
//! and any state may end in `Failed`. Stores, the catalog and the human
//! interaction port are injected, so the whole pipeline runs against
//! in-memory doubles in tests.
//!
//! Two conditions are recovered locally: a cache entry whose file vanished is
//! a miss, and a failed remote EULA acceptance defers local acceptance until
//! the transfer succeeds. Everything else surfaces as an
//! [`AppError`](crate::errors::AppError).
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tile_fetcher::app::{
//!     CacheManager, ClientConfig, DiskSpaceManager, DownloadOptions, DownloadOrchestrator,
//!     EulaManager, PivnetClient,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache_dir = std::path::PathBuf::from("/tmp/tiles");
//! let client = PivnetClient::new(ClientConfig::default(), "my-api-token-000000")?;
//! let orchestrator = DownloadOrchestrator::new(
//!     Arc::new(client),
//!     Arc::new(CacheManager::in_directory(&cache_dir).await?),
//!     Arc::new(EulaManager::new(cache_dir.join("eula_acceptance.json")).await?),
//!     DiskSpaceManager::new(20),
//! );
//!
//! let options = DownloadOptions::new("cf", "10.2.5", &cache_dir).with_accept_eula(true);
//! let outcome = orchestrator.download(&options).await?;
//! println!("{}", outcome.path.display());
//! # Ok(())
//! # }
//! ```

use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::app::cache::{CacheEntry, CacheStore};
use crate::app::catalog::CatalogClient;
use crate::app::checksum::{self, Sha256Digest};
use crate::app::disk_space::DiskSpaceManager;
use crate::app::eula::{EulaOutcome, EulaStore};
use crate::app::interaction::{InteractionPort, NonInteractive};
use crate::app::models::{format_bytes, ArtifactFile, DownloadOptions, Release};
use crate::app::resolver::VersionResolver;
use crate::constants::{cache, selection as selection_constants};
use crate::errors::{CatalogError, DownloadError, InteractionError, Result, SelectionError};

pub mod selection;
pub mod signals;
pub mod state;
pub mod transfer;

pub use state::{DownloadState, StateTracker};
pub use transfer::{ProgressWriter, TransferObserver};

/// Result of a successful request
#[derive(Debug, Clone)]
pub struct DownloadOutcome {
    /// Final artifact path
    pub path: PathBuf,
    /// Release the specifier resolved to
    pub release: Release,
    /// File that was fetched or found in cache
    pub file: ArtifactFile,
    /// Whether the cache satisfied the request
    pub from_cache: bool,
    /// How the EULA check was settled; `None` on a cache hit
    pub eula: Option<EulaOutcome>,
    /// States passed through, ending in `Done`
    pub states: Vec<DownloadState>,
}

/// Runs download requests against injected stores and catalog
pub struct DownloadOrchestrator {
    catalog: Arc<dyn CatalogClient>,
    cache: Arc<dyn CacheStore>,
    eula: Arc<dyn EulaStore>,
    disk: DiskSpaceManager,
    interaction: Arc<dyn InteractionPort>,
    observer: Option<Arc<dyn TransferObserver>>,
    cancel: Option<watch::Receiver<bool>>,
    recommended_file: String,
}

impl DownloadOrchestrator {
    /// Create an orchestrator that never prompts
    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        cache: Arc<dyn CacheStore>,
        eula: Arc<dyn EulaStore>,
        disk: DiskSpaceManager,
    ) -> Self {
        Self {
            catalog,
            cache,
            eula,
            disk,
            interaction: Arc::new(NonInteractive),
            observer: None,
            cancel: None,
            recommended_file: selection_constants::RECOMMENDED_FILE_NAME.to_string(),
        }
    }

    /// Use `interaction` for selections and confirmations
    pub fn with_interaction(mut self, interaction: Arc<dyn InteractionPort>) -> Self {
        self.interaction = interaction;
        self
    }

    /// Report transfer progress to `observer`
    pub fn with_observer(mut self, observer: Arc<dyn TransferObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Abort when `cancel` turns true
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// File name suggested first when a release has several files
    pub fn with_recommended_file(mut self, name: impl Into<String>) -> Self {
        self.recommended_file = name.into();
        self
    }

    /// Fetch the artifact described by `options`, returning its local path
    ///
    /// # Errors
    ///
    /// Returns `AppError`; its `kind()` gives the stable failure class
    pub async fn download(&self, options: &DownloadOptions) -> Result<DownloadOutcome> {
        let mut tracker = StateTracker::new();
        match self.run(options, &mut tracker).await {
            Ok(mut outcome) => {
                tracker.enter(DownloadState::Done);
                outcome.states = tracker.into_history();
                Ok(outcome)
            }
            Err(error) => {
                tracker.fail(&error);
                Err(error)
            }
        }
    }

    async fn run(
        &self,
        options: &DownloadOptions,
        tracker: &mut StateTracker,
    ) -> Result<DownloadOutcome> {
        let product = options.product_slug.as_str();

        tracker.enter(DownloadState::ResolvingVersion);
        self.ensure_not_cancelled()?;
        let release = self.resolve_release(options).await?;
        info!("Resolved {} {} to release {}", product, options.version, release.id);

        tracker.enter(DownloadState::SelectingFile);
        self.ensure_not_cancelled()?;
        let file = self.select_file(options, &release).await?;
        let file_name = file.storage_file_name()?;
        debug!("Selected product file {} ({})", file.name, file.id);

        tracker.enter(DownloadState::CheckingCache);
        if let Some(entry) = self.cache.get(product, &release.version, file.id).await? {
            info!("Using cached file: {}", entry.file_path.display());
            return Ok(DownloadOutcome {
                path: entry.file_path,
                release,
                file,
                from_cache: true,
                eula: None,
                states: Vec::new(),
            });
        }

        tracker.enter(DownloadState::CheckingEula);
        self.ensure_not_cancelled()?;
        let eula = self.settle_eula(options, &release).await?;
        if let EulaOutcome::ManualRequired { eula_url } = &eula {
            return Err(DownloadError::EulaNotAccepted {
                product: product.to_string(),
                version: release.version.clone(),
                eula_url: eula_url.clone(),
            }
            .into());
        }

        tracker.enter(DownloadState::CheckingDiskSpace);
        self.ensure_not_cancelled()?;
        self.ensure_disk_space(&options.cache_dir, file.size).await?;

        let target = options.cache_dir.join(&file_name);
        let temp = transfer::temp_path_for(&target);

        tracker.enter(DownloadState::Transferring);
        if let Err(error) = self.transfer(product, &release, &file, &options.cache_dir, &temp).await {
            discard_temp(&temp).await;
            return Err(error);
        }

        tracker.enter(DownloadState::Verifying);
        let digest = match self.verify(&file, &temp).await {
            Ok(digest) => digest,
            Err(error) => {
                discard_temp(&temp).await;
                return Err(error);
            }
        };

        tracker.enter(DownloadState::Committing);
        if let Err(source) = fs::rename(&temp, &target).await {
            discard_temp(&temp).await;
            return Err(DownloadError::AtomicOperationFailed {
                temp_path: temp,
                final_path: target,
                source,
            }
            .into());
        }
        info!("Downloaded {} to {}", file.name, target.display());

        let entry = CacheEntry::new(product, &release.version, file.id, &target, file.size)
            .with_sha256(digest.map(|d| d.to_hex()));
        self.cache.add(entry).await?;

        if eula.is_deferred() {
            let url = self.catalog.eula_url(product, release.id);
            self.eula.accept(product, &release.version, &url).await?;
            info!(
                "Recorded EULA acceptance for {} {} after successful download",
                product, release.version
            );
        }

        Ok(DownloadOutcome {
            path: target,
            release,
            file,
            from_cache: false,
            eula: Some(eula),
            states: Vec::new(),
        })
    }

    fn ensure_not_cancelled(&self) -> Result<()> {
        if transfer::is_cancelled(self.cancel.as_ref()) {
            return Err(DownloadError::Cancelled.into());
        }
        Ok(())
    }

    async fn resolve_release(&self, options: &DownloadOptions) -> Result<Release> {
        let releases = self.catalog.list_releases(&options.product_slug).await?;
        let resolver = VersionResolver::new(releases, options.non_interactive);
        let result = resolver.resolve(&options.version)?;

        if let Some(release) = result.selected {
            return Ok(release);
        }

        let labels = selection::release_options(&result.matches);
        let index = self
            .interaction
            .select_one(selection::RELEASE_PROMPT, &labels, 0)?;
        result.matches.get(index).cloned().ok_or_else(|| {
            InteractionError::InvalidChoice {
                index: index + 1,
                len: result.matches.len(),
            }
            .into()
        })
    }

    async fn select_file(&self, options: &DownloadOptions, release: &Release) -> Result<ArtifactFile> {
        let files = self
            .catalog
            .list_files(&options.product_slug, release.id)
            .await?;

        if files.is_empty() {
            return Err(SelectionError::NoFiles {
                version: release.version.clone(),
            }
            .into());
        }

        if let Some(name) = &options.product_file {
            return Ok(selection::find_by_name(&files, name)?.clone());
        }

        if files.len() == 1 {
            return Ok(files[0].clone());
        }

        if options.non_interactive {
            return Err(SelectionError::AmbiguousFile {
                version: release.version.clone(),
                count: files.len(),
            }
            .into());
        }

        let labels = selection::file_options(&files, &self.recommended_file);
        let default = selection::recommended_index(&files, &self.recommended_file);
        let index = self
            .interaction
            .select_one(selection::FILE_PROMPT, &labels, default)?;
        files.get(index).cloned().ok_or_else(|| {
            InteractionError::InvalidChoice {
                index: index + 1,
                len: files.len(),
            }
            .into()
        })
    }

    /// Settle license acceptance for the exact product and version
    async fn settle_eula(&self, options: &DownloadOptions, release: &Release) -> Result<EulaOutcome> {
        let product = options.product_slug.as_str();
        if self
            .eula
            .is_accepted_for_release(product, &release.version)
            .await
        {
            debug!("EULA already accepted for {} {}", product, release.version);
            return Ok(EulaOutcome::AlreadyAccepted);
        }

        let eula_url = self.catalog.eula_url(product, release.id);
        if !options.accept_eula {
            if options.non_interactive {
                return Ok(EulaOutcome::ManualRequired { eula_url });
            }

            let message = format!(
                "You must accept the EULA to download {} {}. View EULA: {}\nAccept EULA?",
                product, release.version, eula_url
            );
            match self.interaction.confirm(&message) {
                Ok(true) => {}
                Ok(false) => return Ok(EulaOutcome::ManualRequired { eula_url }),
                Err(InteractionError::NonInteractive { .. }) => {
                    return Ok(EulaOutcome::ManualRequired { eula_url })
                }
                Err(e) => return Err(e.into()),
            }
        }

        match self.catalog.accept_eula(product, release.id).await {
            Ok(()) => {
                self.eula
                    .accept(product, &release.version, &eula_url)
                    .await?;
                Ok(EulaOutcome::AcceptedRemotely)
            }
            Err(e) => {
                warn!(
                    "Remote EULA acceptance failed for {} {}: {}. Proceeding; a successful download records acceptance",
                    product, release.version, e
                );
                Ok(EulaOutcome::DeferredPendingDownload)
            }
        }
    }

    /// One eviction pass, then a single re-check
    async fn ensure_disk_space(&self, cache_dir: &Path, file_size: u64) -> Result<()> {
        if self.disk.has_enough_space(cache_dir, file_size)? {
            return Ok(());
        }

        let removed = self.cache.cleanup_old(cache::CLEANUP_MAX_AGE_DAYS).await?;
        info!(
            "Insufficient disk space; cleaned up {} cached files older than {} days",
            removed,
            cache::CLEANUP_MAX_AGE_DAYS
        );

        if self.disk.has_enough_space(cache_dir, file_size)? {
            return Ok(());
        }

        Err(DownloadError::InsufficientSpace {
            required: self.disk.required_space(file_size),
            available: self.disk.available_space(cache_dir)?,
        }
        .into())
    }

    async fn transfer(
        &self,
        product: &str,
        release: &Release,
        file: &ArtifactFile,
        cache_dir: &Path,
        temp: &Path,
    ) -> Result<u64> {
        fs::create_dir_all(cache_dir).await.map_err(DownloadError::Io)?;
        let temp_file = fs::File::create(temp).await.map_err(DownloadError::Io)?;

        info!("Downloading {} ({})", file.name, format_bytes(file.size));
        if let Some(observer) = &self.observer {
            observer.started(file);
        }

        let mut writer = ProgressWriter::new(
            BufWriter::new(temp_file),
            self.observer.clone(),
            self.cancel.clone(),
        );
        let result = self
            .catalog
            .download(product, release.id, file.id, &mut writer)
            .await;
        let result = match result {
            Ok(bytes) => writer.shutdown().await.map(|()| bytes).map_err(CatalogError::Sink),
            Err(e) => Err(e),
        };

        if let Some(observer) = &self.observer {
            observer.finished(result.is_ok());
        }

        match result {
            Ok(bytes) => {
                debug!("Transferred {} bytes to {}", bytes, temp.display());
                Ok(bytes)
            }
            Err(_) if transfer::is_cancelled(self.cancel.as_ref()) => {
                Err(DownloadError::Cancelled.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Size check, then digest check when the catalog published one
    async fn verify(&self, file: &ArtifactFile, temp: &Path) -> Result<Option<Sha256Digest>> {
        let actual = fs::metadata(temp).await.map_err(DownloadError::Io)?.len();
        if actual != file.size {
            return Err(DownloadError::SizeMismatch {
                expected: file.size,
                actual,
            }
            .into());
        }

        let Some(expected_hex) = &file.sha256 else {
            return Ok(None);
        };
        let expected = match Sha256Digest::from_hex(expected_hex) {
            Ok(digest) => digest,
            Err(e) => {
                warn!("Skipping checksum for {}: {}", file.name, e);
                return Ok(None);
            }
        };

        let actual = checksum::sha256_file(temp).await.map_err(DownloadError::Io)?;
        if actual != expected {
            return Err(DownloadError::ChecksumMismatch {
                expected: expected.to_hex(),
                actual: actual.to_hex(),
            }
            .into());
        }

        debug!("Checksum verified for {}", file.name);
        Ok(Some(actual))
    }
}

/// Remove a temp file, ignoring a file that is already gone
async fn discard_temp(temp: &Path) {
    match fs::remove_file(temp).await {
        Ok(()) => debug!("Discarded {}", temp.display()),
        Err(e) if e.kind() == IoErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove {}: {}", temp.display(), e),
    }
}
