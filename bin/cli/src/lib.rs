//! Command-line driver and local HTTP server for photomesh.
//!
//! Each subcommand runs one flow to completion:
//!
//! - `shape`: image-to-mesh through a hosted Gradio space
//! - `reconstruct`: the COLMAP photogrammetry pipeline
//! - `text-to-3d`: Meshy preview and refine passes
//! - `serve`: the HTTP API used by the web front-end

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod server;

use cli::{Cli, Commands};
use config::AppConfig;
use error::CliError;
use photomesh_core::Result;

/// Runs the parsed command line.
///
/// # Errors
///
/// Returns the failure of the selected command.
pub async fn dispatch(cli: Cli, config: &AppConfig) -> Result<(), CliError> {
    match cli.command {
        Commands::Shape(args) => commands::shape::run(args, config).await,
        Commands::Reconstruct(args) => commands::reconstruct::run(args, config).await,
        Commands::TextTo3d(args) => commands::text_to_3d::run(args, config).await,
        Commands::Serve(args) => commands::serve::run(args, config).await,
    }
}
