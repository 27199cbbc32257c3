use clap::Parser;
use photomesh_cli::{cli::Cli, config::AppConfig, dispatch, error::CliError};
use rootcause::prelude::Report;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            let report: Report<CliError> = CliError::Config {
                reason: e.to_string(),
            }
            .into();
            eprintln!("{report}");
            return ExitCode::FAILURE;
        }
    };
    tracing::debug!(?config, "loaded configuration");

    let outcome: Result<(), Report<CliError>> = tokio::select! {
        result = dispatch(cli, &config) => result,
        _ = tokio::signal::ctrl_c() => Err(CliError::Interrupted.into()),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(report) => {
            eprintln!("{report}");
            ExitCode::FAILURE
        }
    }
}
