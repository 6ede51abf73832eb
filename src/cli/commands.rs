//! Command handlers for the Tile Fetcher CLI
//!
//! This module wires parsed arguments and the loaded configuration to the
//! download pipeline and the cache and EULA stores.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::app::orchestrator::selection::{release_options, RELEASE_PROMPT};
use crate::app::orchestrator::signals::{cancellation_channel, listen_for_shutdown};
use crate::app::{
    format_bytes, CacheManager, CacheStore, CatalogClient, DiskSpaceManager, DownloadOptions,
    DownloadOrchestrator, DownloadOutcome, EulaManager, EulaStore, InteractionPort,
    PivnetClient, TransferObserver, VersionResolver,
};
use crate::cli::{
    resolve_token, CacheAction, CacheArgs, DownloadArgs, EulaAction, EulaArgs, GlobalArgs,
    SpaceArgs, TerminalInteraction, TransferProgress,
};
use crate::config::AppConfig;
use crate::errors::{AppError, DownloadError, InteractionError, Result};

/// Load configuration and apply the global path flags on top
pub async fn load_config(global: &GlobalArgs) -> Result<AppConfig> {
    let mut config = AppConfig::load(global.config.clone()).await?;
    apply_global_overrides(&mut config, global);
    Ok(config)
}

/// CLI path flags take precedence over file and environment values
pub fn apply_global_overrides(config: &mut AppConfig, global: &GlobalArgs) {
    if let Some(dir) = &global.cache_dir {
        config.storage.cache_dir = Some(dir.clone());
    }
    if let Some(file) = &global.eula_file {
        config.storage.eula_file = Some(file.clone());
    }
}

/// One line of download output
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DownloadReport {
    pub product_slug: String,
    pub version: String,
    pub product_file: String,
    pub path: PathBuf,
    pub size: u64,
    pub from_cache: bool,
}

impl DownloadReport {
    fn new(product_slug: &str, outcome: &DownloadOutcome) -> Self {
        Self {
            product_slug: product_slug.to_string(),
            version: outcome.release.version.clone(),
            product_file: outcome.file.name.clone(),
            path: outcome.path.clone(),
            size: outcome.file.size,
            from_cache: outcome.from_cache,
        }
    }

    fn summary(&self) -> String {
        let verb = if self.from_cache { "Cached" } else { "Downloaded" };
        format!(
            "{} {} {} ({}): {}",
            verb,
            self.product_slug,
            self.version,
            self.product_file,
            self.path.display()
        )
    }
}

async fn open_cache(config: &AppConfig) -> Result<CacheManager> {
    Ok(CacheManager::new(config.manifest_file()?).await?)
}

async fn open_eula_ledger(config: &AppConfig) -> Result<EulaManager> {
    Ok(EulaManager::new(config.eula_file()?).await?)
}

/// Handle the download command
///
/// Fetches each requested release in order and stops at the first failure.
pub async fn handle_download(args: DownloadArgs, config: &AppConfig, quiet: bool) -> Result<()> {
    let start_time = Instant::now();
    args.validate().map_err(AppError::generic)?;

    let non_interactive = args.non_interactive || !TerminalInteraction::is_available();
    if non_interactive && !args.non_interactive {
        debug!("stdin is not a terminal, running non-interactively");
    }

    let token = resolve_token(args.pivnet_token.as_deref(), !non_interactive)?;
    let client = PivnetClient::new(config.catalog.clone(), &token)?;

    let cache_dir = config.cache_dir()?;
    let cache = open_cache(config).await?;
    if let Err(e) = cache.sweep_temp_files(&cache_dir).await {
        warn!("Could not sweep stale temp files: {}", e);
    }
    let eula = open_eula_ledger(config).await?;

    let min_free_space_gb = args
        .min_free_space_gb
        .unwrap_or(config.storage.min_free_space_gb);

    let (cancel_tx, cancel_rx) = cancellation_channel();
    let shutdown_listener = listen_for_shutdown(cancel_tx);

    let mut orchestrator = DownloadOrchestrator::new(
        Arc::new(client),
        Arc::new(cache),
        Arc::new(eula),
        DiskSpaceManager::new(min_free_space_gb),
    )
    .with_cancellation(cancel_rx)
    .with_recommended_file(config.storage.recommended_file.clone());

    if !non_interactive {
        orchestrator = orchestrator.with_interaction(Arc::new(TerminalInteraction));
    }
    if !args.json && !quiet {
        let progress: Arc<dyn TransferObserver> = Arc::new(TransferProgress::new());
        orchestrator = orchestrator.with_observer(progress);
    }

    let mut reports = Vec::with_capacity(args.release_versions.len());
    for version in &args.release_versions {
        let mut options = DownloadOptions::new(&args.product_slug, version, &cache_dir)
            .with_accept_eula(args.accept_eula)
            .with_non_interactive(non_interactive);
        if let Some(name) = &args.product_file {
            options = options.with_product_file(name);
        }

        let result = orchestrator.download(&options).await;
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                shutdown_listener.abort();
                return Err(e);
            }
        };

        let report = DownloadReport::new(&args.product_slug, &outcome);
        if !args.json {
            println!("{}", report.summary());
        }
        reports.push(report);
    }
    shutdown_listener.abort();

    if args.json {
        let rendered = serde_json::to_string_pretty(&reports)
            .map_err(|e| AppError::generic(format!("Failed to render JSON output: {}", e)))?;
        println!("{}", rendered);
    }

    info!(
        "Download command finished: {} release(s) in {:?}",
        reports.len(),
        start_time.elapsed()
    );
    Ok(())
}

/// Handle cache management commands
pub async fn handle_cache(args: CacheArgs, config: &AppConfig) -> Result<()> {
    let cache_dir = config.cache_dir()?;
    let cache = open_cache(config).await?;

    match args.action {
        CacheAction::List => {
            let mut stats = cache.stats().await;
            match DiskSpaceManager::new(config.storage.min_free_space_gb).available_space(&cache_dir) {
                Ok(available) => stats.set_available_space(available),
                Err(e) => debug!("Free space unavailable for {}: {}", cache_dir.display(), e),
            }

            println!("Cache: {}", cache_dir.display());
            println!("Manifest: {}", stats.manifest_path.display());
            println!(
                "Entries: {} ({}), free space: {}",
                stats.entry_count,
                stats.format_cache_size(),
                stats.format_available_space()
            );

            let entries = cache.entries().await;
            if !entries.is_empty() {
                println!();
            }
            for entry in entries {
                println!(
                    "{:<12} {:<20} {:>10}  {}  {}",
                    entry.product_slug,
                    entry.version,
                    format_bytes(entry.file_size),
                    entry.downloaded_at.format("%Y-%m-%d %H:%M"),
                    entry.file_path.display()
                );
            }
        }
        CacheAction::Cleanup { max_age_days } => {
            let removed = cache.cleanup_old(max_age_days).await?;
            println!(
                "Removed {} cache entries older than {} days",
                removed, max_age_days
            );
        }
        CacheAction::Sweep => {
            let removed = cache.sweep_temp_files(&cache_dir).await?;
            println!("Removed {} stale temp files from {}", removed, cache_dir.display());
        }
    }

    Ok(())
}

/// Handle EULA commands
pub async fn handle_eula(args: EulaArgs, config: &AppConfig) -> Result<()> {
    let ledger = open_eula_ledger(config).await?;

    match args.action {
        EulaAction::Status {
            product_slug,
            release_version,
        } => match ledger.record(&product_slug, &release_version).await {
            Some(record) => {
                println!(
                    "EULA for {} {} accepted at {}",
                    product_slug,
                    record.release_version,
                    record.accepted_at.to_rfc3339()
                );
                println!("EULA: {}", record.eula_url);
            }
            None => {
                println!(
                    "EULA for {} {} has not been accepted (ledger: {})",
                    product_slug,
                    release_version,
                    ledger.ledger_path().display()
                );
            }
        },
        EulaAction::Accept {
            product_slug,
            release_version,
            pivnet_token,
        } => {
            let interaction = TerminalInteraction;
            let interactive = TerminalInteraction::is_available();
            let token = resolve_token(pivnet_token.as_deref(), interactive)?;
            let client = PivnetClient::new(config.catalog.clone(), &token)?;

            let releases = client.list_releases(&product_slug).await?;
            let resolved = VersionResolver::new(releases, !interactive).resolve(&release_version)?;
            let release = match resolved.selected {
                Some(release) => release,
                None => {
                    let labels = release_options(&resolved.matches);
                    let index = interaction.select_one(RELEASE_PROMPT, &labels, 0)?;
                    resolved.matches.get(index).cloned().ok_or(
                        InteractionError::InvalidChoice {
                            index: index + 1,
                            len: labels.len(),
                        },
                    )?
                }
            };

            client.accept_eula(&product_slug, release.id).await?;
            let eula_url = client.eula_url(&product_slug, release.id);
            ledger
                .accept(&product_slug, &release.version, &eula_url)
                .await?;

            println!(
                "Accepted EULA for {} {} ({})",
                product_slug, release.version, eula_url
            );
        }
    }

    Ok(())
}

/// Handle the disk space report
pub async fn handle_space(args: SpaceArgs, config: &AppConfig) -> Result<()> {
    let cache_dir = config.cache_dir()?;
    let min_free_space_gb = args
        .min_free_space_gb
        .unwrap_or(config.storage.min_free_space_gb);
    let manager = DiskSpaceManager::new(min_free_space_gb);

    report_space(&manager, &cache_dir, args.file_size)
}

fn report_space(manager: &DiskSpaceManager, dir: &Path, file_size: Option<u64>) -> Result<()> {
    let available = manager.available_space(dir)?;
    println!("Free space at {}: {}", dir.display(), format_bytes(available));

    if let Some(size) = file_size {
        let required = manager.required_space(size);
        println!(
            "Required for {} with a {} GiB buffer: {}",
            format_bytes(size),
            manager.min_free_space_gb(),
            format_bytes(required)
        );
        if available < required {
            return Err(DownloadError::InsufficientSpace {
                required,
                available,
            }
            .into());
        }
        println!("Enough space available");
    }

    Ok(())
}
