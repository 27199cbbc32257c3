//! Workspace layout.
//!
//! Every path a stage touches is derived from two roots: the directory of
//! input images and the workspace directory that holds all outputs.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};

/// Input and output locations of one reconstruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconstructionLayout {
    /// Directory holding the input photographs.
    pub image_path: PathBuf,
    /// Directory receiving the database and reconstructions.
    pub workspace_path: PathBuf,
}

impl Default for ReconstructionLayout {
    fn default() -> Self {
        Self::new("images", "workspace")
    }
}

impl ReconstructionLayout {
    /// Creates a layout from the image and workspace directories.
    #[must_use]
    pub fn new(image_path: impl Into<PathBuf>, workspace_path: impl Into<PathBuf>) -> Self {
        Self {
            image_path: image_path.into(),
            workspace_path: workspace_path.into(),
        }
    }

    /// Feature and match database.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.workspace_path.join("database.db")
    }

    /// Output directory of the sparse mapper.
    #[must_use]
    pub fn sparse_path(&self) -> PathBuf {
        self.workspace_path.join("sparse")
    }

    /// The first sparse model written by the mapper.
    #[must_use]
    pub fn sparse_model_path(&self) -> PathBuf {
        self.sparse_path().join("0")
    }

    /// Dense workspace produced by the undistorter.
    #[must_use]
    pub fn dense_path(&self) -> PathBuf {
        self.workspace_path.join("dense")
    }

    /// Fused point cloud written by the last stage.
    #[must_use]
    pub fn fused_output_path(&self) -> PathBuf {
        self.dense_path().join("fused.ply")
    }
}

/// Creates `path` and any missing parents. Existing directories are left untouched.
///
/// # Errors
///
/// Returns an error if a component cannot be created, e.g. when it exists as a file.
pub async fn ensure_dir(path: &Path) -> io::Result<()> {
    tokio::fs::create_dir_all(path).await
}
