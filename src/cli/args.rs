//! Command-line argument parsing for Tile Fetcher
//!
//! This module defines the CLI structure using clap derive macros: product
//! downloads, cache maintenance, EULA ledger management and a disk space
//! report.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Tile Fetcher - download product tiles from the catalog
#[derive(Parser, Debug)]
#[command(
    name = "tile_fetcher",
    version,
    about = "Download versioned product tiles with caching and EULA tracking",
    long_about = "Resolves version specifiers against the product catalog, downloads release files into a
local cache, tracks EULA acceptance per release and checks disk space before every transfer."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Cache directory path (default: ~/.tile-diff/cache)
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// EULA acceptance ledger path (default: <cache-dir>/eula_acceptance.json)
    #[arg(long, global = true, value_name = "FILE")]
    pub eula_file: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve and download release files
    Download(DownloadArgs),

    /// Inspect and maintain the download cache
    Cache(CacheArgs),

    /// Inspect and record EULA acceptance
    Eula(EulaArgs),

    /// Show free space at the cache directory
    Space(SpaceArgs),
}

/// Arguments for the download command
#[derive(Args, Debug, Clone)]
pub struct DownloadArgs {
    /// Catalog product slug (e.g. "cf")
    #[arg(short = 'p', long)]
    pub product_slug: String,

    /// Release version or version prefix; repeat to fetch several releases
    #[arg(short = 'r', long = "release-version", value_name = "VERSION", required = true)]
    pub release_versions: Vec<String>,

    /// Exact product file name to download
    #[arg(long)]
    pub product_file: Option<String>,

    /// Accept EULAs without prompting
    #[arg(long)]
    pub accept_eula: bool,

    /// Fail instead of prompting for input
    #[arg(long)]
    pub non_interactive: bool,

    /// Catalog API token (or use PIVNET_TOKEN)
    #[arg(long, value_name = "TOKEN")]
    pub pivnet_token: Option<String>,

    /// Free space to keep beyond the file itself, in GiB
    #[arg(long, value_name = "GIB")]
    pub min_free_space_gb: Option<u64>,

    /// Print results as JSON and hide progress output
    #[arg(long)]
    pub json: bool,
}

/// Arguments for cache management
#[derive(Args, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache management actions
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// List cached downloads
    List,

    /// Evict entries older than the given age
    Cleanup {
        /// Maximum age in days
        #[arg(long, default_value_t = crate::constants::cache::CLEANUP_MAX_AGE_DAYS)]
        max_age_days: u32,
    },

    /// Remove temp files left by interrupted downloads
    Sweep,
}

/// Arguments for EULA management
#[derive(Args, Debug)]
pub struct EulaArgs {
    #[command(subcommand)]
    pub action: EulaAction,
}

/// EULA actions
#[derive(Subcommand, Debug)]
pub enum EulaAction {
    /// Show whether a release's EULA has been accepted
    Status {
        /// Catalog product slug
        #[arg(short = 'p', long)]
        product_slug: String,

        /// Exact release version
        #[arg(short = 'r', long = "release-version", value_name = "VERSION")]
        release_version: String,
    },

    /// Accept a release's EULA through the catalog and record it
    Accept {
        /// Catalog product slug
        #[arg(short = 'p', long)]
        product_slug: String,

        /// Release version or version prefix
        #[arg(short = 'r', long = "release-version", value_name = "VERSION")]
        release_version: String,

        /// Catalog API token (or use PIVNET_TOKEN)
        #[arg(long, value_name = "TOKEN")]
        pivnet_token: Option<String>,
    },
}

/// Arguments for the disk space report
#[derive(Args, Debug)]
pub struct SpaceArgs {
    /// File size to check for, in bytes
    #[arg(long, value_name = "BYTES")]
    pub file_size: Option<u64>,

    /// Free space to keep beyond the file itself, in GiB
    #[arg(long, value_name = "GIB")]
    pub min_free_space_gb: Option<u64>,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Logging level requested by flags, if any
    pub fn log_level(&self) -> Option<tracing::Level> {
        if self.global.quiet {
            Some(tracing::Level::ERROR)
        } else if self.global.very_verbose {
            Some(tracing::Level::DEBUG)
        } else if self.global.verbose {
            Some(tracing::Level::INFO)
        } else {
            None
        }
    }
}

impl DownloadArgs {
    /// Reject argument combinations clap cannot express
    pub fn validate(&self) -> Result<(), String> {
        if self.product_slug.trim().is_empty() {
            return Err("--product-slug must not be empty".to_string());
        }

        if self.release_versions.iter().any(|v| v.trim().is_empty()) {
            return Err("--release-version must not be empty".to_string());
        }

        if self.json && !self.non_interactive && !self.accept_eula {
            return Err(
                "--json needs --non-interactive or --accept-eula since prompts would corrupt the output"
                    .to_string(),
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn download_args() -> DownloadArgs {
        DownloadArgs {
            product_slug: "cf".to_string(),
            release_versions: vec!["10.2.5".to_string()],
            product_file: None,
            accept_eula: false,
            non_interactive: false,
            pivnet_token: None,
            min_free_space_gb: None,
            json: false,
        }
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_download_args_validation() {
        let mut args = download_args();
        assert!(args.validate().is_ok());

        args.json = true;
        assert!(args.validate().is_err());

        args.non_interactive = true;
        assert!(args.validate().is_ok());

        args.release_versions.push(" ".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_parse_download_with_two_versions() {
        let cli = Cli::try_parse_from([
            "tile_fetcher",
            "download",
            "--product-slug",
            "cf",
            "-r",
            "10.2.4",
            "-r",
            "10.2.5",
            "--accept-eula",
            "--product-file",
            "TAS for VMs",
        ])
        .unwrap();

        match cli.command {
            Commands::Download(args) => {
                assert_eq!(args.release_versions, vec!["10.2.4", "10.2.5"]);
                assert!(args.accept_eula);
                assert_eq!(args.product_file.as_deref(), Some("TAS for VMs"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_release_version_is_required() {
        let result = Cli::try_parse_from(["tile_fetcher", "download", "-p", "cf"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_log_level() {
        let quiet = Cli {
            global: GlobalArgs {
                quiet: true,
                ..Default::default()
            },
            command: Commands::Cache(CacheArgs {
                action: CacheAction::List,
            }),
        };
        let verbose = Cli {
            global: GlobalArgs {
                verbose: true,
                ..Default::default()
            },
            command: Commands::Cache(CacheArgs {
                action: CacheAction::Sweep,
            }),
        };
        let plain = Cli {
            global: GlobalArgs::default(),
            command: Commands::Space(SpaceArgs {
                file_size: None,
                min_free_space_gb: None,
            }),
        };

        assert_eq!(quiet.log_level(), Some(tracing::Level::ERROR));
        assert_eq!(verbose.log_level(), Some(tracing::Level::INFO));
        assert_eq!(plain.log_level(), None);
    }

    #[test]
    fn test_cleanup_default_age() {
        let cli = Cli::try_parse_from(["tile_fetcher", "cache", "cleanup"]).unwrap();
        match cli.command {
            Commands::Cache(CacheArgs {
                action: CacheAction::Cleanup { max_age_days },
            }) => assert_eq!(max_age_days, 7),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
