//! Binary logistic regression churn classifier persisted as JSON.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::features::CanonicalRecord;
use crate::ml::encode::{FEATURE_DIM, FEATURE_SCHEMA, encode, feature_names};
use crate::ml::scorer::{ArtifactError, ArtifactLoader, ChurnScorer, ScoreError};

mod train;
pub use train::{TrainDataset, TrainOptions, train_logreg};

/// Current artifact format version.
pub const MODEL_VERSION: i64 = 1;

/// Versioned logistic regression model over standardized encoded features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRegModel {
    #[serde(default)]
    pub model_id: Option<String>,
    pub model_version: i64,
    pub feature_schema: String,
    pub feature_names: Vec<String>,
    pub weights: Vec<f64>,
    pub bias: f64,
    /// Per-feature offsets subtracted before weighting.
    pub mean: Vec<f64>,
    /// Per-feature divisors applied after centering.
    pub scale: Vec<f64>,
}

impl LogRegModel {
    /// A model with zero weights, scoring every record at 0.5.
    pub fn neutral() -> Self {
        Self {
            model_id: None,
            model_version: MODEL_VERSION,
            feature_schema: FEATURE_SCHEMA.to_string(),
            feature_names: feature_names(),
            weights: vec![0.0; FEATURE_DIM],
            bias: 0.0,
            mean: vec![0.0; FEATURE_DIM],
            scale: vec![1.0; FEATURE_DIM],
        }
    }

    /// Validate the feature layout and parameter shapes.
    pub fn validate(&self) -> Result<(), String> {
        if self.model_version != MODEL_VERSION {
            return Err(format!(
                "Unsupported model_version {} (expected {MODEL_VERSION})",
                self.model_version
            ));
        }
        if self.feature_schema != FEATURE_SCHEMA {
            return Err(format!(
                "Unsupported feature_schema {} (expected {FEATURE_SCHEMA})",
                self.feature_schema
            ));
        }
        if self.feature_names != feature_names() {
            return Err("feature_names do not match the encoding layout".to_string());
        }
        for (name, values) in [
            ("weights", &self.weights),
            ("mean", &self.mean),
            ("scale", &self.scale),
        ] {
            if values.len() != FEATURE_DIM {
                return Err(format!(
                    "{name} length {} does not match feature dimension {FEATURE_DIM}",
                    values.len()
                ));
            }
            if values.iter().any(|value| !value.is_finite()) {
                return Err(format!("{name} contains non-finite values"));
            }
        }
        if !self.bias.is_finite() {
            return Err("bias must be finite".to_string());
        }
        if self.scale.iter().any(|&value| value <= 0.0) {
            return Err("scale entries must be > 0".to_string());
        }
        Ok(())
    }

    /// Load and validate a model from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self, ArtifactError> {
        if !path.exists() {
            return Err(ArtifactError::Missing {
                path: path.to_path_buf(),
            });
        }
        let bytes = std::fs::read(path).map_err(|source| ArtifactError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let corrupt = |reason: String| ArtifactError::Corrupt {
            path: path.to_path_buf(),
            reason,
        };
        let model: Self = serde_json::from_slice(&bytes).map_err(|err| corrupt(err.to_string()))?;
        model.validate().map_err(corrupt)?;
        Ok(model)
    }

    /// Write the model as pretty JSON, creating parent directories as needed.
    pub fn save_json(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, bytes)
    }

    /// Raw log-odds for an encoded feature vector.
    ///
    /// Each weighted term saturates at `±f64::MAX`, so extreme inputs push the logit toward
    /// infinity instead of producing NaN.
    pub fn logit(&self, features: &[f64]) -> Result<f64, ScoreError> {
        if features.len() != self.weights.len() {
            return Err(ScoreError::ShapeMismatch {
                expected: self.weights.len(),
                actual: features.len(),
            });
        }
        let mut sum = self.bias;
        for (i, &value) in features.iter().enumerate() {
            sum += saturate(self.weights[i] * (value - self.mean[i]) / self.scale[i]);
        }
        Ok(sum)
    }

    /// Probability of churn for an encoded feature vector.
    pub fn predict_proba(&self, features: &[f64]) -> Result<f64, ScoreError> {
        let probability = sigmoid(self.logit(features)?);
        if probability.is_finite() {
            Ok(probability)
        } else {
            Err(ScoreError::NonFinite(probability))
        }
    }
}

impl ChurnScorer for LogRegModel {
    fn score(&self, record: &CanonicalRecord) -> Result<f64, ScoreError> {
        self.predict_proba(&encode(record))
    }

    fn describe(&self) -> String {
        format!(
            "logreg {} (v{})",
            self.model_id.as_deref().unwrap_or("unnamed"),
            self.model_version
        )
    }
}

/// Loads [`LogRegModel`] artifacts from JSON files.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogRegLoader;

impl ArtifactLoader for LogRegLoader {
    fn load(&self, path: &Path) -> Result<Arc<dyn ChurnScorer>, ArtifactError> {
        Ok(Arc::new(LogRegModel::load_json(path)?))
    }
}

// NaN here only comes from a zero weight times an overflowed difference.
fn saturate(term: f64) -> f64 {
    if term.is_nan() {
        0.0
    } else {
        term.clamp(-f64::MAX, f64::MAX)
    }
}

/// Numerically stable logistic function.
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{ContractType, InternetService, PaymentMethod};
    use tempfile::tempdir;

    fn record() -> CanonicalRecord {
        CanonicalRecord {
            tenure_months: 2.0,
            monthly_charges: 99.0,
            total_charges: 198.0,
            contract_type: ContractType::MonthToMonth,
            internet_service: InternetService::Fiber,
            payment_method: PaymentMethod::ElectronicCheck,
            paperless_billing: true,
        }
    }

    #[test]
    fn neutral_model_validates_and_scores_half() {
        let model = LogRegModel::neutral();
        model.validate().unwrap();
        assert_eq!(model.score(&record()).unwrap(), 0.5);
    }

    #[test]
    fn positive_weight_raises_probability() {
        let mut model = LogRegModel::neutral();
        model.weights[13] = 2.0;
        let with_paperless = model.score(&record()).unwrap();
        let mut other = record();
        other.paperless_billing = false;
        let without = model.score(&other).unwrap();
        assert!(with_paperless > 0.5);
        assert_eq!(without, 0.5);
    }

    #[test]
    fn logit_rejects_wrong_width() {
        let model = LogRegModel::neutral();
        let err = model.logit(&[1.0, 2.0]).unwrap_err();
        assert!(matches!(
            err,
            ScoreError::ShapeMismatch {
                expected: 14,
                actual: 2
            }
        ));
    }

    #[test]
    fn sigmoid_is_bounded_for_extreme_inputs() {
        assert_eq!(sigmoid(1_000.0), 1.0);
        assert_eq!(sigmoid(-1_000.0), 0.0);
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn overflowing_terms_do_not_produce_nan() {
        let mut model = LogRegModel::neutral();
        model.weights[0] = 1.0;
        model.weights[1] = -1.0;
        model.scale[0] = 1e-300;
        model.scale[1] = 1e-300;
        model.mean[2] = -1.7e308;
        let mut features = [0.0; FEATURE_DIM];
        features[0] = 1e10;
        features[1] = 1e10;
        features[2] = 1.7e308;
        assert_eq!(model.logit(&features).unwrap(), 0.0);
        assert_eq!(model.predict_proba(&features).unwrap(), 0.5);

        model.weights[1] = 1.0;
        assert_eq!(model.predict_proba(&features).unwrap(), 1.0);
    }

    #[test]
    fn validate_rejects_bad_shapes() {
        let mut model = LogRegModel::neutral();
        model.weights.pop();
        assert!(model.validate().is_err());

        let mut model = LogRegModel::neutral();
        model.scale[0] = 0.0;
        assert!(model.validate().is_err());

        let mut model = LogRegModel::neutral();
        model.feature_schema = "other".to_string();
        assert!(model.validate().is_err());
    }

    #[test]
    fn json_round_trip_through_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("models").join("model.json");
        let mut model = LogRegModel::neutral();
        model.model_id = Some("churn_logreg_test".to_string());
        model.bias = -0.25;
        model.save_json(&path).unwrap();
        let loaded = LogRegModel::load_json(&path).unwrap();
        assert_eq!(loaded, model);
    }

    #[test]
    fn load_reports_missing_and_corrupt_distinctly() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("model.json");
        let missing = LogRegModel::load_json(&path).unwrap_err();
        assert!(matches!(missing, ArtifactError::Missing { .. }));
        assert!(!missing.is_deployment_defect());

        std::fs::write(&path, b"not json").unwrap();
        let corrupt = LogRegModel::load_json(&path).unwrap_err();
        assert!(matches!(corrupt, ArtifactError::Corrupt { .. }));
        assert!(corrupt.is_deployment_defect());
        assert_eq!(corrupt.path(), path.as_path());
    }

    #[test]
    fn loader_rejects_structurally_invalid_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("model.json");
        let mut model = LogRegModel::neutral();
        model.mean.truncate(3);
        std::fs::write(&path, serde_json::to_vec(&model).unwrap()).unwrap();
        let result = LogRegLoader.load(&path);
        assert!(matches!(result, Err(ArtifactError::Corrupt { .. })));
    }
}
