//! Subcommand implementations.

pub mod reconstruct;
pub mod serve;
pub mod shape;
pub mod text_to_3d;
