use std::time::Duration;

use bytes::Bytes;
use serde_json::{json, Value};

use featuremeter_core::{ActiveJobs, FeatureInstrument, MetricHandle};

/// Feature and job name used for uploads.
pub const UPLOAD_FEATURE: &str = "file_upload";
const ANONYMOUS_USER: &str = "anonymous";

/// Lower-cased extension after the last dot, or `unknown` without one.
pub fn file_type_of(filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((_, ext)) => ext.to_lowercase(),
        None => "unknown".to_string(),
    }
}

/// Accepts an upload body, counts it, and discards it.
pub struct UploadService {
    instrument: FeatureInstrument,
    files_uploaded: MetricHandle,
    jobs: ActiveJobs,
    work: Duration,
}

impl UploadService {
    pub fn new(
        instrument: FeatureInstrument,
        files_uploaded: MetricHandle,
        jobs: ActiveJobs,
        work_ms: u64,
    ) -> Self {
        Self {
            instrument,
            files_uploaded,
            jobs,
            work: Duration::from_millis(work_ms),
        }
    }

    pub async fn store(&self, filename: Option<&str>, body: Bytes) -> Value {
        self.instrument
            .call_async(async {
                let filename = filename.filter(|f| !f.is_empty()).unwrap_or("untitled");
                let file_type = file_type_of(filename);
                match self.files_uploaded.with_labels(&[file_type.as_str(), ANONYMOUS_USER]) {
                    Ok(series) => {
                        if let Err(e) = series.inc() {
                            tracing::warn!(error = %e, "files_uploaded update failed");
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "files_uploaded lookup failed"),
                }

                self.jobs
                    .scope_async(UPLOAD_FEATURE, tokio::time::sleep(self.work))
                    .await;

                tracing::debug!(filename, file_type = %file_type, size = body.len(), "upload accepted");
                json!({
                    "filename": filename,
                    "size_bytes": body.len(),
                    "message": "File stored successfully (demo).",
                })
            })
            .await
    }
}
