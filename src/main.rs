//! Tile Fetcher CLI application
//!
//! Command-line interface for downloading product tiles from the Tanzu
//! Network catalog into a local cache.

use std::process;

use tracing::info;
use tracing_subscriber::filter::{Directive, LevelFilter};
use tracing_subscriber::{fmt, EnvFilter};

use tile_fetcher::cli::{
    handle_cache, handle_download, handle_eula, handle_space, load_config, Cli, Commands,
};
use tile_fetcher::config::AppConfig;
use tile_fetcher::constants::logging;
use tile_fetcher::errors::Result;

#[tokio::main]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        if let Some(hint) = e.remediation() {
            eprintln!("Hint: {}", hint);
        }
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> Result<()> {
    // A missing .env file is fine
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();
    let config = load_config(&cli.global).await?;

    init_logging(&cli, &config);

    info!("Tile Fetcher v{} starting", env!("CARGO_PKG_VERSION"));

    let quiet = cli.global.quiet;
    match cli.command {
        Commands::Download(args) => {
            info!("Executing download command");
            handle_download(args, &config, quiet).await
        }
        Commands::Cache(args) => {
            info!("Executing cache command");
            handle_cache(args, &config).await
        }
        Commands::Eula(args) => {
            info!("Executing eula command");
            handle_eula(args, &config).await
        }
        Commands::Space(args) => {
            info!("Executing space command");
            handle_space(args, &config).await
        }
    }
}

/// Initialize logging from verbosity flags, falling back to the config file level
fn init_logging(cli: &Cli, config: &AppConfig) {
    let level = cli
        .log_level()
        .map(|level| level.to_string().to_lowercase())
        .unwrap_or_else(|| config.logging.level.clone());

    let directive = format!("tile_fetcher={}", level)
        .parse::<Directive>()
        .or_else(|_| format!("tile_fetcher={}", logging::DEFAULT_LEVEL).parse::<Directive>())
        .unwrap_or_else(|_| LevelFilter::WARN.into());

    let filter = EnvFilter::from_default_env().add_directive(directive);

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(cli.global.very_verbose)
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}
