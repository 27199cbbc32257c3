//! Pipeline stages.
//!
//! Each stage maps to one COLMAP subcommand. The order of `Stage::ALL` is the
//! execution order; later stages read what earlier ones wrote.

use crate::layout::ReconstructionLayout;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;

/// One step of the reconstruction pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Detects keypoints in every input image.
    FeatureExtraction,
    /// Matches features between all image pairs.
    ExhaustiveMatching,
    /// Builds the sparse model.
    Mapper,
    /// Undistorts images into the dense workspace.
    ImageUndistortion,
    /// Computes depth maps with geometric consistency.
    PatchMatchStereo,
    /// Fuses depth maps into a point cloud.
    StereoFusion,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Self; 6] = [
        Self::FeatureExtraction,
        Self::ExhaustiveMatching,
        Self::Mapper,
        Self::ImageUndistortion,
        Self::PatchMatchStereo,
        Self::StereoFusion,
    ];

    /// Position in the pipeline, starting at 1.
    #[must_use]
    pub fn number(self) -> usize {
        self as usize + 1
    }

    /// The COLMAP subcommand that implements this stage.
    #[must_use]
    pub fn subcommand(self) -> &'static str {
        match self {
            Self::FeatureExtraction => "feature_extractor",
            Self::ExhaustiveMatching => "exhaustive_matcher",
            Self::Mapper => "mapper",
            Self::ImageUndistortion => "image_undistorter",
            Self::PatchMatchStereo => "patch_match_stereo",
            Self::StereoFusion => "stereo_fusion",
        }
    }

    /// Directory that must exist before this stage runs, if any.
    #[must_use]
    pub fn required_dir(self, layout: &ReconstructionLayout) -> Option<PathBuf> {
        match self {
            Self::Mapper => Some(layout.sparse_path()),
            Self::ImageUndistortion => Some(layout.dense_path()),
            _ => None,
        }
    }

    /// Full argument list (subcommand first) for this stage.
    #[must_use]
    pub fn arguments(self, layout: &ReconstructionLayout) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![self.subcommand().into()];
        let mut flag = |name: &str, value: OsString| {
            args.push(name.into());
            args.push(value);
        };

        match self {
            Self::FeatureExtraction => {
                flag("--database_path", layout.database_path().into());
                flag("--image_path", layout.image_path.clone().into());
            }
            Self::ExhaustiveMatching => {
                flag("--database_path", layout.database_path().into());
            }
            Self::Mapper => {
                flag("--database_path", layout.database_path().into());
                flag("--image_path", layout.image_path.clone().into());
                flag("--output_path", layout.sparse_path().into());
            }
            Self::ImageUndistortion => {
                flag("--image_path", layout.image_path.clone().into());
                flag("--input_path", layout.sparse_model_path().into());
                flag("--output_path", layout.dense_path().into());
                flag("--output_type", "COLMAP".into());
            }
            Self::PatchMatchStereo => {
                flag("--workspace_path", layout.dense_path().into());
                flag("--workspace_format", "COLMAP".into());
                flag("--PatchMatchStereo.geom_consistency", "true".into());
            }
            Self::StereoFusion => {
                flag("--workspace_path", layout.dense_path().into());
                flag("--workspace_format", "COLMAP".into());
                flag("--input_type", "geometric".into());
                flag("--output_path", layout.fused_output_path().into());
            }
        }
        args
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.subcommand())
    }
}
