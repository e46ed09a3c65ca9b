//! Scoring capability shared by every artifact family.
//!
//! The model server only sees [`ChurnScorer`] and [`ArtifactLoader`]; concrete model families
//! live behind these traits.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::features::CanonicalRecord;

/// Errors raised while loading a scoring artifact from disk.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// No artifact exists at the configured path.
    #[error("Model file not found at {}. Train first.", path.display())]
    Missing { path: PathBuf },
    /// The artifact exists but could not be read.
    #[error("Failed to read model file {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The artifact was read but does not describe a usable scorer.
    #[error("Model file {} is corrupt: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },
}

impl ArtifactError {
    /// Path of the artifact that failed to load.
    pub fn path(&self) -> &Path {
        match self {
            Self::Missing { path } | Self::Unreadable { path, .. } | Self::Corrupt { path, .. } => {
                path
            }
        }
    }

    /// True when the artifact exists on disk but cannot be used.
    pub fn is_deployment_defect(&self) -> bool {
        !matches!(self, Self::Missing { .. })
    }
}

/// Errors raised by a loaded scorer.
#[derive(Debug, Error)]
pub enum ScoreError {
    /// The encoded feature vector does not match the artifact's expected width.
    #[error("Feature vector has {actual} values but the model expects {expected}")]
    ShapeMismatch { expected: usize, actual: usize },
    /// The artifact produced NaN or an infinity.
    #[error("Model produced a non-finite probability ({0})")]
    NonFinite(f64),
}

/// A loaded classifier estimating the probability of churn.
pub trait ChurnScorer: Send + Sync {
    /// Probability of the positive (churn) class. Callers must not assume it lies in `[0, 1]`.
    fn score(&self, record: &CanonicalRecord) -> Result<f64, ScoreError>;

    /// Short identifier used in logs.
    fn describe(&self) -> String {
        "churn scorer".to_string()
    }
}

/// Deserializes a scorer from an artifact path.
pub trait ArtifactLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<Arc<dyn ChurnScorer>, ArtifactError>;
}
