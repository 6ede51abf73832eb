//! Command-line interface components
//!
//! This module contains CLI-specific code for Tile Fetcher: argument
//! parsing, command handlers, terminal prompts, token lookup and the
//! transfer progress bar.

pub mod args;
pub mod commands;
pub mod progress;
pub mod prompt;
pub mod token;

pub use args::{
    CacheAction, CacheArgs, Cli, Commands, DownloadArgs, EulaAction, EulaArgs, GlobalArgs,
    SpaceArgs,
};
pub use commands::{
    apply_global_overrides, handle_cache, handle_download, handle_eula, handle_space,
    load_config, DownloadReport,
};
pub use progress::TransferProgress;
pub use prompt::TerminalInteraction;
pub use token::{lookup_token, resolve_token};
