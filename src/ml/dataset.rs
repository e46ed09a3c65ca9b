//! Labelled training data loading and splitting.

use rand::rngs::StdRng;
use rand::{SeedableRng, seq::SliceRandom};
use serde_json::Value;

use crate::features::RawRecord;

/// Key holding the churn label in a labelled JSON line.
pub const LABEL_FIELD: &str = "churned";

/// Raw records with their churn labels.
#[derive(Debug, Clone, Default)]
pub struct LabelledRecords {
    pub records: Vec<RawRecord>,
    pub labels: Vec<bool>,
    /// Lines skipped because they lacked a usable label.
    pub skipped: usize,
}

/// Parse JSON lines of raw fields plus a `churned` label.
///
/// Labels may be booleans, `0`/`1`, or the strings `"0"`, `"1"`, `"true"`, `"false"`. Lines with
/// any other label are counted in [`LabelledRecords::skipped`]; malformed JSON is an error.
pub fn parse_labelled_jsonl(text: &str) -> Result<LabelledRecords, String> {
    let mut out = LabelledRecords::default();
    for (line_no, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line)
            .map_err(|err| format!("Invalid JSON on line {}: {err}", line_no + 1))?;
        let Some(label) = value.get(LABEL_FIELD).and_then(parse_label) else {
            out.skipped += 1;
            continue;
        };
        let record: RawRecord = serde_json::from_value(value)
            .map_err(|err| format!("Invalid record on line {}: {err}", line_no + 1))?;
        out.records.push(record);
        out.labels.push(label);
    }
    Ok(out)
}

fn parse_label(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::Number(number) => match number.as_f64() {
            Some(n) if n == 0.0 => Some(false),
            Some(n) if n == 1.0 => Some(true),
            _ => None,
        },
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "1" | "true" => Some(true),
            "0" | "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Split row indices into train and test sets, preserving the label ratio in each.
///
/// Each class contributes `round(len * test_fraction)` rows to the test set, at least one when the
/// class has two or more rows.
pub fn stratified_split(
    labels: &[bool],
    test_fraction: f64,
    seed: u64,
) -> (Vec<usize>, Vec<usize>) {
    let fraction = if test_fraction.is_finite() {
        test_fraction.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();
    for class in [false, true] {
        let mut indices: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|(_, label)| **label == class)
            .map(|(idx, _)| idx)
            .collect();
        indices.shuffle(&mut rng);
        let mut n_test = (indices.len() as f64 * fraction).round() as usize;
        if fraction > 0.0 && n_test == 0 && indices.len() >= 2 {
            n_test = 1;
        }
        let n_test = n_test.min(indices.len());
        test.extend_from_slice(&indices[..n_test]);
        train.extend_from_slice(&indices[n_test..]);
    }
    train.sort_unstable();
    test.sort_unstable();
    (train, test)
}
