//! Command-line arguments.

use clap::{Args, Parser, Subcommand};
use photomesh_generation::ModelFormat;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "photomesh")]
#[command(about = "Generate 3D models from photos or text")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate a mesh from images with a hosted Hunyuan3D-2 space
    Shape(ShapeArgs),
    /// Run the COLMAP photogrammetry pipeline over a directory of photos
    Reconstruct(ReconstructArgs),
    /// Generate a textured model from a text prompt
    #[command(name = "text-to-3d")]
    TextTo3d(TextTo3dArgs),
    /// Serve the local generation API for the web front-end
    Serve(ServeArgs),
}

#[derive(Debug, Args)]
pub struct ShapeArgs {
    /// Input image (path or http(s) URL)
    #[arg(long)]
    pub image: String,
    /// Front view for multi-view generation
    #[arg(long)]
    pub front: Option<String>,
    /// Back view for multi-view generation
    #[arg(long)]
    pub back: Option<String>,
    /// Left view for multi-view generation
    #[arg(long)]
    pub left: Option<String>,
    /// Right view for multi-view generation
    #[arg(long)]
    pub right: Option<String>,
    /// Optional text caption
    #[arg(long)]
    pub caption: Option<String>,
    #[arg(long, default_value = "30")]
    pub steps: u32,
    #[arg(long, default_value = "5.0")]
    pub guidance_scale: f64,
    #[arg(long, default_value = "1234")]
    pub seed: u64,
    #[arg(long, default_value = "256")]
    pub octree_resolution: u32,
    #[arg(long, default_value = "8000")]
    pub num_chunks: u32,
    /// Keep the image background
    #[arg(long)]
    pub keep_background: bool,
    /// Use the given seed as-is
    #[arg(long)]
    pub fixed_seed: bool,
    /// Space id or URL (overrides PHOTOMESH__GRADIO__SPACE)
    #[arg(long)]
    pub space: Option<String>,
    /// Write the generated mesh to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ReconstructArgs {
    /// Directory of input photos
    #[arg(long, default_value = "images")]
    pub images: PathBuf,
    /// Workspace directory for all outputs
    #[arg(long, default_value = "workspace")]
    pub workspace: PathBuf,
    /// COLMAP program (overrides PHOTOMESH__COLMAP__PROGRAM)
    #[arg(long)]
    pub colmap: Option<String>,
    /// Print the commands without running them
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct TextTo3dArgs {
    /// What to generate
    #[arg(long)]
    pub prompt: String,
    #[arg(long, default_value = "low quality, low resolution, low poly, ugly")]
    pub negative_prompt: String,
    /// Directory receiving preview_model.* and refined_model.*
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,
    /// Model format to download (glb, fbx, obj, usdz)
    #[arg(long, default_value = "glb")]
    pub format: ModelFormat,
    /// Stop after the preview pass
    #[arg(long)]
    pub preview_only: bool,
    /// Maximum status checks per task (overrides configuration)
    #[arg(long)]
    pub max_poll_attempts: Option<u32>,
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Address to listen on (overrides PHOTOMESH__SERVER__BIND)
    #[arg(long)]
    pub bind: Option<String>,
}
