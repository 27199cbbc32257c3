//! `photomesh serve`: the local generation API.

use crate::cli::ServeArgs;
use crate::config::AppConfig;
use crate::error::CliError;
use crate::server::{AppState, router};
use photomesh_inference::GradioBackend;
use photomesh_core::Result;
use rootcause::prelude::*;
use std::sync::Arc;
use tracing::info;

/// Connects to the space and serves until the process is stopped.
///
/// # Errors
///
/// Returns an error if the space cannot be reached or the address cannot be bound.
pub async fn run(args: ServeArgs, config: &AppConfig) -> Result<(), CliError> {
    let bind = args.bind.unwrap_or_else(|| config.server.bind.clone());

    let backend = GradioBackend::connect(config.gradio.clone())
        .await
        .context(CliError::Server {
            reason: "space unavailable".to_string(),
        })?;
    let app = router(Arc::new(AppState::new(Arc::new(backend))));

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .map_err(|e| CliError::Server {
            reason: format!("failed to bind {bind}: {e}"),
        })?;
    info!("listening on http://{bind}");

    axum::serve(listener, app).await.map_err(|e| CliError::Server {
        reason: e.to_string(),
    })?;
    Ok(())
}
