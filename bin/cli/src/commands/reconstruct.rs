//! `photomesh reconstruct`: the COLMAP pipeline.

use crate::cli::ReconstructArgs;
use crate::config::AppConfig;
use crate::error::CliError;
use photomesh_reconstruction::{ProcessRunner, ReconstructionLayout, ReconstructionPipeline};
use photomesh_core::Result;
use rootcause::prelude::*;

/// Runs the command.
///
/// # Errors
///
/// Returns an error naming the stage that failed.
pub async fn run(args: ReconstructArgs, config: &AppConfig) -> Result<(), CliError> {
    let layout = ReconstructionLayout::new(args.images, args.workspace);
    let program = args.colmap.unwrap_or_else(|| config.colmap.program.clone());
    let mut pipeline = ReconstructionPipeline::new(ProcessRunner, layout)
        .with_program(program)
        .with_observer(|_, invocation| println!("Running: {invocation}"));

    if args.dry_run {
        for (stage, invocation) in pipeline.plan() {
            println!("{}. {invocation}", stage.number());
        }
        return Ok(());
    }

    let report = pipeline.run().await.context(CliError::Reconstruction)?;
    println!();
    println!("Reconstruction completed.");
    println!("Output mesh: {}", report.output_path.display());
    Ok(())
}
