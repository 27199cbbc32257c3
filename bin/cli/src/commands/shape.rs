//! `photomesh shape`: image-to-mesh with a hosted space.

use crate::cli::ShapeArgs;
use crate::config::AppConfig;
use crate::error::CliError;
use photomesh_inference::{
    GradioBackend, ImageSlot, ImageSource, ShapeGeneration, ShapeGenerationRequest,
};
use photomesh_core::Result;
use rootcause::prelude::*;

/// Builds the request from the command-line arguments.
#[must_use]
pub fn build_request(args: &ShapeArgs) -> ShapeGenerationRequest {
    let mut request = ShapeGenerationRequest::from_image(ImageSource::from_arg(&args.image))
        .with_steps(args.steps)
        .with_guidance_scale(args.guidance_scale)
        .with_seed(args.seed)
        .with_octree_resolution(args.octree_resolution)
        .with_background_removal(!args.keep_background)
        .with_num_chunks(args.num_chunks)
        .with_randomize_seed(!args.fixed_seed);

    if let Some(caption) = &args.caption {
        request = request.with_caption(caption.clone());
    }
    let views = [
        (ImageSlot::Front, &args.front),
        (ImageSlot::Back, &args.back),
        (ImageSlot::Left, &args.left),
        (ImageSlot::Right, &args.right),
    ];
    for (slot, view) in views {
        if let Some(view) = view {
            request = request.with_image(slot, ImageSource::from_arg(view));
        }
    }
    request
}

/// Runs the command.
///
/// # Errors
///
/// Returns an error if the space cannot be reached, the call fails, or the
/// model cannot be saved.
pub async fn run(args: ShapeArgs, config: &AppConfig) -> Result<(), CliError> {
    let mut gradio = config.gradio.clone();
    if let Some(space) = &args.space {
        gradio.space = space.clone();
    }

    let backend = GradioBackend::connect(gradio)
        .await
        .context(CliError::Shape)?;
    let generation = ShapeGeneration::new();
    let result = generation
        .run(&backend, &build_request(&args))
        .await
        .context(CliError::Shape)?;

    for (index, output) in result.outputs.iter().enumerate() {
        println!("Output {index}: {output}");
    }

    if let Some(output) = &args.output {
        let bytes = generation
            .save_model(&backend, &result, output)
            .await
            .context(CliError::Shape)?;
        println!("Model saved to {} ({bytes} bytes)", output.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use std::path::PathBuf;

    fn parse(args: &[&str]) -> ShapeArgs {
        let cli = Cli::parse_from(["photomesh", "shape"].iter().chain(args));
        let Commands::Shape(args) = cli.command else {
            panic!("expected shape");
        };
        args
    }

    #[test]
    fn defaults_match_reference_call() {
        let request = build_request(&parse(&["--image", "assets/demo.png"]));
        assert_eq!(request, ShapeGenerationRequest::from_image(ImageSource::Path(PathBuf::from("assets/demo.png"))));
    }

    #[test]
    fn flags_map_onto_request() {
        let request = build_request(&parse(&[
            "--image",
            "https://example.com/front.png",
            "--left",
            "left.png",
            "--caption",
            "a chair",
            "--steps",
            "50",
            "--keep-background",
            "--fixed-seed",
        ]));

        assert_eq!(
            request.image(ImageSlot::Primary),
            Some(&ImageSource::Url("https://example.com/front.png".to_string()))
        );
        assert_eq!(
            request.image(ImageSlot::Left),
            Some(&ImageSource::Path(PathBuf::from("left.png")))
        );
        assert!(request.image(ImageSlot::Right).is_none());
        assert_eq!(request.caption.as_deref(), Some("a chair"));
        assert_eq!(request.steps, 50);
        assert!(!request.check_box_rembg);
        assert!(!request.randomize_seed);
    }
}
