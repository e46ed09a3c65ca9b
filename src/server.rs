//! Model server: lazy artifact lifecycle plus the `predict` entry point.
//!
//! The server starts `NotLoaded` and loads its artifact on the first request. A failed load
//! leaves it `NotLoaded`, so every later request retries until an artifact is deployed. Once
//! loaded, the scorer is shared read-only by all callers for the rest of the process.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::features::{RawRecord, normalize_one};
use crate::ml::logreg::LogRegLoader;
use crate::ml::{ArtifactError, ArtifactLoader, ChurnScorer, ScoreError};

/// Version tag attached to every prediction.
pub const PREDICTION_VERSION: &str = "v1";
/// Probabilities at or above this value are reported as churn.
pub const CHURN_THRESHOLD: f64 = 0.5;

/// Scored outcome for one account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub churn_probability: f64,
    pub will_churn: bool,
    pub version: String,
}

impl PredictionResult {
    /// Clamp a raw probability to `[0, 1]` and derive the churn decision from it.
    pub fn from_probability(probability: f64) -> Self {
        let churn_probability = probability.clamp(0.0, 1.0);
        Self {
            churn_probability,
            will_churn: churn_probability >= CHURN_THRESHOLD,
            version: PREDICTION_VERSION.to_string(),
        }
    }
}

/// Lifecycle of the scoring artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReadinessState {
    NotLoaded,
    Loaded,
}

/// Failures surfaced by [`ModelServer::predict`].
#[derive(Debug, Error)]
pub enum PredictError {
    /// The artifact is missing or unusable; retry once one is deployed.
    #[error("{0}")]
    NotReady(#[source] ArtifactError),
    /// Normalization or scoring failed for a loaded artifact.
    #[error("Unexpected error: {0}")]
    Unexpected(#[source] ScoreError),
}

impl PredictError {
    /// True for failures a caller may resolve by retrying later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NotReady(_))
    }
}

/// Owns the scoring artifact and serves predictions from it.
///
/// Construct once per process and share behind an `Arc`.
pub struct ModelServer {
    model_path: PathBuf,
    loader: Box<dyn ArtifactLoader>,
    scorer: OnceLock<Arc<dyn ChurnScorer>>,
    load_lock: Mutex<()>,
}

impl ModelServer {
    /// Server backed by JSON logistic regression artifacts.
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self::with_loader(model_path, LogRegLoader)
    }

    /// Server backed by a custom artifact family.
    pub fn with_loader(
        model_path: impl Into<PathBuf>,
        loader: impl ArtifactLoader + 'static,
    ) -> Self {
        Self {
            model_path: model_path.into(),
            loader: Box::new(loader),
            scorer: OnceLock::new(),
            load_lock: Mutex::new(()),
        }
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn readiness(&self) -> ReadinessState {
        if self.scorer.get().is_some() {
            ReadinessState::Loaded
        } else {
            ReadinessState::NotLoaded
        }
    }

    /// Return the loaded scorer, loading it first if needed.
    ///
    /// Concurrent first callers are serialized so the artifact is read at most once.
    pub fn ensure_loaded(&self) -> Result<Arc<dyn ChurnScorer>, ArtifactError> {
        if let Some(scorer) = self.scorer.get() {
            return Ok(Arc::clone(scorer));
        }
        let _guard = self.load_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(scorer) = self.scorer.get() {
            return Ok(Arc::clone(scorer));
        }
        let started = Instant::now();
        match self.loader.load(&self.model_path) {
            Ok(scorer) => {
                info!(
                    "Loaded {} from {} in {:?}",
                    scorer.describe(),
                    self.model_path.display(),
                    started.elapsed()
                );
                let scorer = Arc::clone(self.scorer.get_or_init(|| scorer));
                Ok(scorer)
            }
            Err(err) => {
                if err.is_deployment_defect() {
                    error!("Model artifact unusable: {err}");
                } else {
                    warn!("Model artifact not deployed: {err}");
                }
                Err(err)
            }
        }
    }

    /// Score one raw record.
    pub fn predict(&self, raw: &RawRecord) -> Result<PredictionResult, PredictError> {
        let scorer = self.ensure_loaded().map_err(PredictError::NotReady)?;
        let record = normalize_one(raw);
        debug!(?record, "Normalized request");
        let probability = scorer.score(&record).map_err(|err| {
            error!(?record, "Scoring failed: {err}");
            PredictError::Unexpected(err)
        })?;
        if probability.is_nan() {
            error!(?record, "Scorer returned NaN probability");
            return Err(PredictError::Unexpected(ScoreError::NonFinite(probability)));
        }
        Ok(PredictionResult::from_probability(probability))
    }
}

impl std::fmt::Debug for ModelServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelServer")
            .field("model_path", &self.model_path)
            .field("readiness", &self.readiness())
            .finish()
    }
}
