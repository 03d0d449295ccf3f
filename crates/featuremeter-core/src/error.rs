//! Shared error type across featuremeter crates.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Stable error codes surfaced in HTTP error bodies and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid input / malformed config.
    BadRequest,
    /// Metric registration conflict.
    DuplicateMetric,
    /// Metric misuse by the calling code (labels, kind, amount).
    MetricMisuse,
    /// Exporter could not bind its port.
    ExporterUnavailable,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::DuplicateMetric => "DUPLICATE_METRIC",
            ClientCode::MetricMisuse => "METRIC_MISUSE",
            ClientCode::ExporterUnavailable => "EXPORTER_UNAVAILABLE",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, FeatureMeterError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Error)]
pub enum FeatureMeterError {
    #[error("metric {name} already registered with different parameters")]
    DuplicateMetricName { name: String },
    #[error("metric {metric} expects {expected} label values, got {got}")]
    LabelCardinalityMismatch {
        metric: String,
        expected: usize,
        got: usize,
    },
    #[error("{op} is not valid on {kind} metric {metric}")]
    InvalidOperationForKind {
        metric: String,
        op: &'static str,
        kind: &'static str,
    },
    #[error("invalid amount {value} for metric {metric}")]
    InvalidAmount { metric: String, value: f64 },
    #[error("invalid metric definition: {0}")]
    InvalidMetricDefinition(String),
    #[error("metrics exporter could not bind {addr}: {source}")]
    ExporterBindConflict {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl FeatureMeterError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            FeatureMeterError::DuplicateMetricName { .. } => ClientCode::DuplicateMetric,
            FeatureMeterError::LabelCardinalityMismatch { .. }
            | FeatureMeterError::InvalidOperationForKind { .. }
            | FeatureMeterError::InvalidAmount { .. }
            | FeatureMeterError::InvalidMetricDefinition(_) => ClientCode::MetricMisuse,
            FeatureMeterError::ExporterBindConflict { .. } => ClientCode::ExporterUnavailable,
            FeatureMeterError::BadRequest(_) => ClientCode::BadRequest,
            FeatureMeterError::Internal(_) => ClientCode::Internal,
        }
    }
}
