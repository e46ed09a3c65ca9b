//! Fixed-order numeric encoding of canonical records.

use crate::features::{CanonicalRecord, ContractType, InternetService, PaymentMethod, Vocabulary};

/// Identifier of the encoding layout; artifacts record it and must match on load.
pub const FEATURE_SCHEMA: &str = "churn_features_v1";

const NUMERIC_FEATURES: [&str; 3] = ["tenure_months", "monthly_charges", "total_charges"];

/// Width of an encoded feature vector.
pub const FEATURE_DIM: usize = NUMERIC_FEATURES.len()
    + ContractType::ALL.len()
    + InternetService::ALL.len()
    + PaymentMethod::ALL.len()
    + 1;

/// Column names in encoding order, e.g. `contract_type=one_year`.
pub fn feature_names() -> Vec<String> {
    let mut names: Vec<String> = NUMERIC_FEATURES.iter().map(|name| name.to_string()).collect();
    push_one_hot_names::<ContractType>(&mut names);
    push_one_hot_names::<InternetService>(&mut names);
    push_one_hot_names::<PaymentMethod>(&mut names);
    names.push("paperless_billing".to_string());
    names
}

/// Encode a record: numeric fields first, then one-hot categories, then the boolean flag.
pub fn encode(record: &CanonicalRecord) -> [f64; FEATURE_DIM] {
    let mut out = [0.0; FEATURE_DIM];
    out[0] = record.tenure_months;
    out[1] = record.monthly_charges;
    out[2] = record.total_charges;
    let mut offset = NUMERIC_FEATURES.len();
    offset = set_one_hot(&mut out, offset, record.contract_type);
    offset = set_one_hot(&mut out, offset, record.internet_service);
    offset = set_one_hot(&mut out, offset, record.payment_method);
    out[offset] = if record.paperless_billing { 1.0 } else { 0.0 };
    out
}

fn push_one_hot_names<V: Vocabulary>(names: &mut Vec<String>) {
    names.extend(
        V::ALL
            .iter()
            .map(|variant| format!("{}={}", V::FIELD, variant.as_str())),
    );
}

fn set_one_hot<V: Vocabulary>(out: &mut [f64], offset: usize, value: V) -> usize {
    out[offset + value.index()] = 1.0;
    offset + V::ALL.len()
}
