//! Temporary audio artifacts: creation, delivery and expiry.

mod store;
mod sweeper;

use std::path::PathBuf;

use thiserror::Error;

pub use store::{
    ARTIFACT_EXTENSION, ArtifactStore, AudioArtifact, PARTIAL_EXTENSION, ServedArtifact,
    SweepReport,
};
pub use sweeper::ArtifactSweeper;

/// Errors raised while storing or reading artifacts.
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Refusing to store empty audio")]
    EmptyAudio,

    #[error("Artifact {0:?} no longer exists")]
    Missing(PathBuf),

    #[error("Artifact {0:?} is empty")]
    Empty(PathBuf),
}

/// Result type for artifact operations.
pub type Result<T> = std::result::Result<T, ArtifactError>;
