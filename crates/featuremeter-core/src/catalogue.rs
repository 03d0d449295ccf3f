//! Fixed metric set used by the application.

use crate::error::Result;
use crate::metrics::{MetricHandle, Registry};

pub const FILES_UPLOADED: &str = "files_uploaded_total";
pub const FEATURE_REQUESTED: &str = "feature_requested_total";
pub const FEATURE_DURATION_SECONDS: &str = "feature_duration_seconds";
pub const ACTIVE_JOBS: &str = "active_jobs";

/// Feature latency buckets, 5s to 1h.
pub const FEATURE_DURATION_BUCKETS: [f64; 9] =
    [5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0, 3600.0];

/// Handles to the application metrics.
#[derive(Clone)]
pub struct AppMetrics {
    pub files_uploaded: MetricHandle,
    pub feature_requested: MetricHandle,
    pub feature_duration: MetricHandle,
    pub active_jobs: MetricHandle,
}

impl AppMetrics {
    /// Register the catalogue into `registry`. Safe to call more than once on
    /// the same registry; a conflicting prior definition fails.
    pub fn register(registry: &Registry) -> Result<Self> {
        Ok(Self {
            files_uploaded: registry.register_counter(
                FILES_UPLOADED,
                "Total number of files uploaded",
                &["file_type", "user_id"],
            )?,
            feature_requested: registry.register_counter(
                FEATURE_REQUESTED,
                "Total number of feature requests",
                &["feature"],
            )?,
            feature_duration: registry.register_histogram(
                FEATURE_DURATION_SECONDS,
                "Duration of feature execution in seconds",
                &["feature"],
                &FEATURE_DURATION_BUCKETS,
            )?,
            active_jobs: registry.register_gauge(
                ACTIVE_JOBS,
                "Number of currently active background jobs",
                &["job_type"],
            )?,
        })
    }
}
