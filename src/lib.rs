//! Tile Fetcher Library
//!
//! Downloads licensed product releases from the Tanzu Network catalog.
//! Version specifiers are resolved against the catalog, files land in a
//! persistent cache keyed by product, version and file, EULA acceptance is
//! tracked per release and free space is checked before every transfer.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;

// Re-export commonly used types for convenience
pub use errors::{AppError, ErrorKind, Result};
