use serde_json::Value;

use super::{CanonicalRecord, ContractType, InternetService, PaymentMethod, RawRecord, Vocabulary};

/// Value used for a numeric column when no row in the batch carries a usable number.
pub const MISSING_COLUMN_FILL: f64 = 0.0;

/// Normalize a batch of raw records.
///
/// Numeric columns are imputed with the batch median of the values that coerced cleanly, then
/// clamped at zero. Categorical and boolean fields are handled row by row.
pub fn normalize(rows: &[RawRecord]) -> Vec<CanonicalRecord> {
    let tenure = impute_column(rows.iter().map(|row| &row.tenure_months));
    let monthly = impute_column(rows.iter().map(|row| &row.monthly_charges));
    let total = impute_column(rows.iter().map(|row| &row.total_charges));

    rows.iter()
        .zip(tenure)
        .zip(monthly)
        .zip(total)
        .map(|(((row, tenure_months), monthly_charges), total_charges)| CanonicalRecord {
            tenure_months,
            monthly_charges,
            total_charges,
            contract_type: ContractType::canonicalize(&row.contract_type),
            internet_service: InternetService::canonicalize(&row.internet_service),
            payment_method: PaymentMethod::canonicalize(&row.payment_method),
            paperless_billing: truthy(&row.paperless_billing),
        })
        .collect()
}

/// Normalize a single record as a batch of one.
///
/// A missing numeric field has no population to borrow a median from and becomes
/// [`MISSING_COLUMN_FILL`].
pub fn normalize_one(row: &RawRecord) -> CanonicalRecord {
    let numeric =
        |value: &Value| clamp_non_negative(coerce_number(value).unwrap_or(MISSING_COLUMN_FILL));
    CanonicalRecord {
        tenure_months: numeric(&row.tenure_months),
        monthly_charges: numeric(&row.monthly_charges),
        total_charges: numeric(&row.total_charges),
        contract_type: ContractType::canonicalize(&row.contract_type),
        internet_service: InternetService::canonicalize(&row.internet_service),
        payment_method: PaymentMethod::canonicalize(&row.payment_method),
        paperless_billing: truthy(&row.paperless_billing),
    }
}

/// Coerce a raw value to a finite number, or `None` when it is missing or unparsable.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        Value::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }?;
    number.is_finite().then_some(number)
}

/// Truthiness of a raw value: empty and zero-like values are false, everything else is true.
///
/// The string `"false"` is non-empty and therefore true.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Median of the given values; the mean of the two middle values for even counts.
pub fn median(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let mut sorted: Vec<f64> = values.into_iter().collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some(sorted[mid - 1] / 2.0 + sorted[mid] / 2.0)
    } else {
        Some(sorted[mid])
    }
}

fn impute_column<'a>(values: impl Iterator<Item = &'a Value>) -> Vec<f64> {
    let coerced: Vec<Option<f64>> = values.map(coerce_number).collect();
    let fill = median(coerced.iter().flatten().copied()).unwrap_or(MISSING_COLUMN_FILL);
    coerced
        .into_iter()
        .map(|value| clamp_non_negative(value.unwrap_or(fill)))
        .collect()
}

fn clamp_non_negative(value: f64) -> f64 {
    // -0.0 maps to +0.0 as well.
    if value > 0.0 { value } else { 0.0 }
}
