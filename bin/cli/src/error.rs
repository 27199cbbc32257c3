//! Error types for the command-line driver.

use std::fmt;

/// Top-level failures, one per command plus setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliError {
    /// Configuration could not be loaded.
    Config { reason: String },
    /// A required API key is not configured.
    MissingApiKey { variable: &'static str },
    /// Shape generation failed.
    Shape,
    /// The reconstruction pipeline failed.
    Reconstruction,
    /// Text-to-3D generation failed.
    TextTo3d,
    /// The HTTP server failed.
    Server { reason: String },
    /// The command was interrupted before it finished.
    Interrupted,
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { reason } => write!(f, "invalid configuration: {reason}"),
            Self::MissingApiKey { variable } => {
                write!(f, "API key not configured; set {variable}")
            }
            Self::Shape => write!(f, "shape generation failed"),
            Self::Reconstruction => write!(f, "reconstruction failed"),
            Self::TextTo3d => write!(f, "text-to-3D generation failed"),
            Self::Server { reason } => write!(f, "server error: {reason}"),
            Self::Interrupted => write!(f, "interrupted"),
        }
    }
}

impl std::error::Error for CliError {}
