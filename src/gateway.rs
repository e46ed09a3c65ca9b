//! Request gateway: schema validation and outcome mapping for the churn endpoints.
//!
//! The gateway is transport agnostic. A front end hands it a method, a path and a body and
//! writes the returned status and JSON body back to its client.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::{error, info, warn};

use crate::features::RawRecord;
use crate::server::{ModelServer, PredictError};

/// Display name reported by the root endpoint.
pub const SERVICE_NAME: &str = "Churn ML API";

const UNEXPECTED_DETAIL: &str = "Unexpected error while scoring the request";

/// Request methods the gateway routes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl FromStr for Method {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            other => Err(format!("Unsupported method: {other}")),
        }
    }
}

/// Status code plus JSON body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GatewayResponse {
    pub status: u16,
    pub body: Value,
}

impl GatewayResponse {
    fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    fn detail(status: u16, detail: impl Into<Value>) -> Self {
        Self {
            status,
            body: json!({ "detail": detail.into() }),
        }
    }
}

/// One schema violation in a predict request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// A predict request that passed schema validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ChurnRequest {
    pub tenure_months: i64,
    pub monthly_charges: f64,
    pub total_charges: f64,
    pub contract_type: String,
    pub internet_service: String,
    pub payment_method: String,
    pub paperless_billing: bool,
}

impl ChurnRequest {
    /// Validate a decoded JSON body, collecting every violation.
    pub fn validate(body: &Value) -> Result<Self, Vec<FieldError>> {
        let Some(object) = body.as_object() else {
            return Err(vec![FieldError::new("body", "Input should be a valid dictionary")]);
        };
        let mut errors = Vec::new();
        let tenure_months = integer_field(object, "tenure_months", 0, 120, &mut errors);
        let monthly_charges = number_field(object, "monthly_charges", 0.0, 500.0, &mut errors);
        let total_charges = number_field(object, "total_charges", 0.0, 100_000.0, &mut errors);
        let contract_type = string_field(object, "contract_type", &mut errors);
        let internet_service = string_field(object, "internet_service", &mut errors);
        let payment_method = string_field(object, "payment_method", &mut errors);
        let paperless_billing = bool_field(object, "paperless_billing", &mut errors);

        match (
            tenure_months,
            monthly_charges,
            total_charges,
            contract_type,
            internet_service,
            payment_method,
            paperless_billing,
        ) {
            (
                Some(tenure_months),
                Some(monthly_charges),
                Some(total_charges),
                Some(contract_type),
                Some(internet_service),
                Some(payment_method),
                Some(paperless_billing),
            ) if errors.is_empty() => Ok(Self {
                tenure_months,
                monthly_charges,
                total_charges,
                contract_type,
                internet_service,
                payment_method,
                paperless_billing,
            }),
            _ => Err(errors),
        }
    }

    pub fn to_raw(&self) -> RawRecord {
        RawRecord {
            tenure_months: Value::from(self.tenure_months),
            monthly_charges: Value::from(self.monthly_charges),
            total_charges: Value::from(self.total_charges),
            contract_type: Value::from(self.contract_type.as_str()),
            internet_service: Value::from(self.internet_service.as_str()),
            payment_method: Value::from(self.payment_method.as_str()),
            paperless_billing: Value::Bool(self.paperless_billing),
        }
    }
}

/// Routes requests to the model server and maps outcomes to status codes.
#[derive(Debug, Clone)]
pub struct Gateway {
    server: Arc<ModelServer>,
}

impl Gateway {
    pub fn new(server: Arc<ModelServer>) -> Self {
        Self { server }
    }

    pub fn server(&self) -> &ModelServer {
        &self.server
    }

    /// Dispatch a request by method and path.
    pub fn handle(&self, method: Method, path: &str, body: &[u8]) -> GatewayResponse {
        let started = Instant::now();
        let response = match (method, path) {
            (Method::Get, "/") => self.root(),
            (Method::Get, "/health") => self.health(),
            (Method::Post, "/predict") => self.predict(body),
            (_, "/" | "/health" | "/predict") => {
                GatewayResponse::detail(405, "Method Not Allowed")
            }
            _ => GatewayResponse::detail(404, "Not Found"),
        };
        info!(
            "{method:?} {path} -> {} in {:?}",
            response.status,
            started.elapsed()
        );
        response
    }

    pub fn root(&self) -> GatewayResponse {
        GatewayResponse::ok(json!({
            "name": SERVICE_NAME,
            "status": "ok",
            "docs": "/docs",
            "health": "/health",
        }))
    }

    pub fn health(&self) -> GatewayResponse {
        GatewayResponse::ok(json!({
            "status": "ok",
            "model": self.server.readiness(),
        }))
    }

    /// Validate a predict body and score it.
    pub fn predict(&self, body: &[u8]) -> GatewayResponse {
        let value: Value = match serde_json::from_slice(body) {
            Ok(value) => value,
            Err(err) => {
                return GatewayResponse::detail(
                    422,
                    json!([FieldError::new("body", format!("JSON decode error: {err}"))]),
                );
            }
        };
        let request = match ChurnRequest::validate(&value) {
            Ok(request) => request,
            Err(errors) => {
                warn!("Rejected predict request with {} schema errors", errors.len());
                return GatewayResponse::detail(422, json!(errors));
            }
        };
        match self.server.predict(&request.to_raw()) {
            Ok(result) => GatewayResponse::ok(json!({
                "churn_probability": result.churn_probability,
                "will_churn": result.will_churn,
                "version": result.version,
            })),
            Err(err @ PredictError::NotReady(_)) => GatewayResponse::detail(503, err.to_string()),
            Err(err @ PredictError::Unexpected(_)) => {
                error!("Predict failed: {err}");
                GatewayResponse::detail(500, UNEXPECTED_DETAIL)
            }
        }
    }
}

fn required<'a>(
    object: &'a Map<String, Value>,
    field: &str,
    errors: &mut Vec<FieldError>,
) -> Option<&'a Value> {
    let value = object.get(field);
    if value.is_none() {
        errors.push(FieldError::new(field, "Field required"));
    }
    value
}

fn check_range<T: PartialOrd + std::fmt::Display + Copy>(
    field: &str,
    value: T,
    min: T,
    max: T,
    errors: &mut Vec<FieldError>,
) -> Option<T> {
    if value < min {
        errors.push(FieldError::new(
            field,
            format!("Input should be greater than or equal to {min}"),
        ));
        None
    } else if value > max {
        errors.push(FieldError::new(
            field,
            format!("Input should be less than or equal to {max}"),
        ));
        None
    } else {
        Some(value)
    }
}

fn integer_field(
    object: &Map<String, Value>,
    field: &str,
    min: i64,
    max: i64,
    errors: &mut Vec<FieldError>,
) -> Option<i64> {
    let value = required(object, field, errors)?;
    let parsed = match value {
        Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|n| n.fract() == 0.0 && n.abs() < 9.0e15)
                .map(|n| n as i64)
        }),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    };
    let Some(parsed) = parsed else {
        errors.push(FieldError::new(field, "Input should be a valid integer"));
        return None;
    };
    check_range(field, parsed, min, max, errors)
}

fn number_field(
    object: &Map<String, Value>,
    field: &str,
    min: f64,
    max: f64,
    errors: &mut Vec<FieldError>,
) -> Option<f64> {
    let value = required(object, field, errors)?;
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite());
    let Some(parsed) = parsed else {
        errors.push(FieldError::new(field, "Input should be a valid number"));
        return None;
    };
    check_range(field, parsed, min, max, errors)
}

fn string_field(
    object: &Map<String, Value>,
    field: &str,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    match required(object, field, errors)? {
        Value::String(text) => Some(text.clone()),
        _ => {
            errors.push(FieldError::new(field, "Input should be a valid string"));
            None
        }
    }
}

fn bool_field(
    object: &Map<String, Value>,
    field: &str,
    errors: &mut Vec<FieldError>,
) -> Option<bool> {
    let parsed = match required(object, field, errors)? {
        Value::Bool(flag) => Some(*flag),
        Value::Number(number) => match number.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" | "t" | "y" => Some(true),
            "false" | "0" | "no" | "off" | "f" | "n" => Some(false),
            _ => None,
        },
        _ => None,
    };
    if parsed.is_none() {
        errors.push(FieldError::new(field, "Input should be a valid boolean"));
    }
    parsed
}
