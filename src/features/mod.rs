//! Feature normalization for churn scoring.
//!
//! Raw records arrive from untrusted callers; [`normalize`] projects a batch of them onto the
//! fixed-shape [`CanonicalRecord`] every scorer consumes. Anomalies are corrected, never rejected.

use serde::{Deserialize, Serialize};
use serde_json::Value;

mod normalize;
mod vocab;

pub use normalize::{MISSING_COLUMN_FILL, coerce_number, median, normalize, normalize_one, truthy};
pub use vocab::{ContractType, InternetService, PaymentMethod, Vocabulary, canonical_token};

/// Account attributes as submitted by a caller, before any validation.
///
/// Fields absent from a payload deserialize to `null` and are treated as missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub tenure_months: Value,
    #[serde(default)]
    pub monthly_charges: Value,
    #[serde(default)]
    pub total_charges: Value,
    #[serde(default)]
    pub contract_type: Value,
    #[serde(default)]
    pub internet_service: Value,
    #[serde(default)]
    pub payment_method: Value,
    #[serde(default)]
    pub paperless_billing: Value,
}

/// The only record shape a scorer accepts.
///
/// Numeric fields are finite and non-negative; categorical fields come from closed vocabularies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub tenure_months: f64,
    pub monthly_charges: f64,
    pub total_charges: f64,
    pub contract_type: ContractType,
    pub internet_service: InternetService,
    pub payment_method: PaymentMethod,
    pub paperless_billing: bool,
}

impl From<&CanonicalRecord> for RawRecord {
    fn from(record: &CanonicalRecord) -> Self {
        Self {
            tenure_months: number_value(record.tenure_months),
            monthly_charges: number_value(record.monthly_charges),
            total_charges: number_value(record.total_charges),
            contract_type: Value::from(record.contract_type.as_str()),
            internet_service: Value::from(record.internet_service.as_str()),
            payment_method: Value::from(record.payment_method.as_str()),
            paperless_billing: Value::Bool(record.paperless_billing),
        }
    }
}

fn number_value(value: f64) -> Value {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}
