use rand::rngs::StdRng;
use rand::{Rng, SeedableRng, seq::SliceRandom};

use super::{LogRegModel, MODEL_VERSION, sigmoid};
use crate::features::CanonicalRecord;
use crate::ml::encode::{FEATURE_DIM, FEATURE_SCHEMA, encode, feature_names};

/// Training options for the churn logistic regression.
#[derive(Debug, Clone)]
pub struct TrainOptions {
    pub epochs: usize,
    pub learning_rate: f64,
    pub l2: f64,
    pub batch_size: usize,
    pub seed: u64,
    pub balance_classes: bool,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            epochs: 100,
            learning_rate: 0.1,
            l2: 1e-4,
            batch_size: 64,
            seed: 42,
            balance_classes: false,
        }
    }
}

/// In-memory training dataset of encoded rows and churn labels.
#[derive(Debug, Clone, Default)]
pub struct TrainDataset {
    pub x: Vec<[f64; FEATURE_DIM]>,
    pub y: Vec<bool>,
}

impl TrainDataset {
    /// Encode canonical records alongside their labels.
    pub fn from_records(records: &[CanonicalRecord], labels: &[bool]) -> Result<Self, String> {
        if records.len() != labels.len() {
            return Err("Mismatched training inputs/labels".to_string());
        }
        Ok(Self {
            x: records.iter().map(encode).collect(),
            y: labels.to_vec(),
        })
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

pub fn train_logreg(
    dataset: &TrainDataset,
    options: &TrainOptions,
) -> Result<LogRegModel, String> {
    if dataset.x.is_empty() || dataset.y.is_empty() {
        return Err("Empty training set".to_string());
    }
    if dataset.x.len() != dataset.y.len() {
        return Err("Mismatched training inputs/labels".to_string());
    }
    let positives = dataset.y.iter().filter(|&&label| label).count();
    if positives == 0 || positives == dataset.y.len() {
        return Err("Training set needs both churned and retained examples".to_string());
    }

    let (mean, scale) = standardization(&dataset.x);
    let standardized: Vec<[f64; FEATURE_DIM]> = dataset
        .x
        .iter()
        .map(|row| {
            let mut out = [0.0; FEATURE_DIM];
            for i in 0..FEATURE_DIM {
                out[i] = (row[i] - mean[i]) / scale[i];
            }
            out
        })
        .collect();

    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut weights = [0.0f64; FEATURE_DIM];
    for w in &mut weights {
        *w = (rng.random::<f64>() - 0.5) * 0.01;
    }
    let mut bias = 0.0f64;

    let class_weights = if options.balance_classes {
        let total = dataset.y.len() as f64;
        let negatives = dataset.y.len() - positives;
        [
            total / (2.0 * negatives as f64),
            total / (2.0 * positives as f64),
        ]
    } else {
        [1.0, 1.0]
    };

    let mut indices: Vec<usize> = (0..standardized.len()).collect();
    let batch_size = options.batch_size.max(1);
    let lr = options.learning_rate;
    let l2 = options.l2.max(0.0);

    for _epoch in 0..options.epochs {
        indices.shuffle(&mut rng);
        for chunk in indices.chunks(batch_size) {
            let mut grad_w = [0.0f64; FEATURE_DIM];
            let mut grad_b = 0.0f64;
            let mut batch_weight = 0.0f64;
            for &idx in chunk {
                let x = &standardized[idx];
                let label = dataset.y[idx];
                let weight = class_weights[usize::from(label)];
                let mut z = bias;
                for i in 0..FEATURE_DIM {
                    z += weights[i] * x[i];
                }
                let diff = sigmoid(z) - if label { 1.0 } else { 0.0 };
                for i in 0..FEATURE_DIM {
                    grad_w[i] += diff * x[i] * weight;
                }
                grad_b += diff * weight;
                batch_weight += weight;
            }
            if batch_weight == 0.0 {
                continue;
            }
            let inv = 1.0 / batch_weight;
            for i in 0..FEATURE_DIM {
                weights[i] -= lr * (grad_w[i] * inv + l2 * weights[i]);
            }
            bias -= lr * grad_b * inv;
        }
    }

    let model = LogRegModel {
        model_id: None,
        model_version: MODEL_VERSION,
        feature_schema: FEATURE_SCHEMA.to_string(),
        feature_names: feature_names(),
        weights: weights.to_vec(),
        bias,
        mean: mean.to_vec(),
        scale: scale.to_vec(),
    };
    model.validate()?;
    Ok(model)
}

fn standardization(rows: &[[f64; FEATURE_DIM]]) -> ([f64; FEATURE_DIM], [f64; FEATURE_DIM]) {
    let n = rows.len().max(1) as f64;
    let mut mean = [0.0; FEATURE_DIM];
    for row in rows {
        for i in 0..FEATURE_DIM {
            mean[i] += row[i];
        }
    }
    for value in &mut mean {
        *value /= n;
    }
    let mut scale = [0.0; FEATURE_DIM];
    for row in rows {
        for i in 0..FEATURE_DIM {
            let d = row[i] - mean[i];
            scale[i] += d * d;
        }
    }
    for value in &mut scale {
        let std = (*value / n).sqrt();
        *value = if std.is_finite() && std > 1e-12 { std } else { 1.0 };
    }
    (mean, scale)
}
