//! Scoring artifacts: the scorer capability, the bundled logistic regression family, and
//! offline training/evaluation helpers.

pub mod dataset;
pub mod encode;
pub mod logreg;
pub mod metrics;
pub mod scorer;

pub use scorer::{ArtifactError, ArtifactLoader, ChurnScorer, ScoreError};
