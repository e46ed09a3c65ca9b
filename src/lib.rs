//! Churn probability scoring service.
//!
//! Raw account records are normalized into a fixed feature shape, scored by a lazily loaded
//! artifact, and returned as a bounded probability plus a churn decision.

/// Config and log directory resolution.
pub mod app_dirs;
/// TOML service configuration.
pub mod config;
/// Raw record normalization.
pub mod features;
/// Transport-agnostic request handling.
pub mod gateway;
/// Tracing subscriber setup.
pub mod logging;
/// Scoring artifacts, training and metrics.
pub mod ml;
/// Model server lifecycle and predictions.
pub mod server;
