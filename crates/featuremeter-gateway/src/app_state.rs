//! Shared application state for the featuremeter gateway.
//!
//! The metric registry is created by the caller and passed in, so the
//! exporter and the request path share one explicit instance.

use std::sync::Arc;

use featuremeter_core::error::Result;
use featuremeter_core::{ActiveJobs, AppMetrics, Instrumentation, Registry};

use crate::config::AppConfig;
use crate::dispatch::FeatureDirectory;
use crate::services::{upload::UPLOAD_FEATURE, SimulatedFeature, UploadService};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: AppConfig,
    registry: Arc<Registry>,
    metrics: AppMetrics,
    features: FeatureDirectory,
    upload: UploadService,
}

impl AppState {
    /// Build application state. Fails if the metric catalogue conflicts with
    /// something already in `registry`.
    pub fn new(cfg: AppConfig, registry: Arc<Registry>) -> Result<Self> {
        // 1) Metrics
        let metrics = AppMetrics::register(&registry)?;
        let instrumentation = Instrumentation::new(&metrics);
        let jobs = ActiveJobs::new(&metrics);

        // 2) Feature services
        let features = FeatureDirectory::new(instrumentation.clone());
        for f in &cfg.features {
            features.register(Arc::new(SimulatedFeature::new(f, jobs.clone())))?;
        }

        // 3) Upload
        let upload = UploadService::new(
            instrumentation.feature(UPLOAD_FEATURE)?,
            metrics.files_uploaded.clone(),
            jobs,
            cfg.upload.work_ms,
        );

        tracing::info!(features = ?features.registered(), "feature services registered");

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                registry,
                metrics,
                features,
                upload,
            }),
        })
    }

    pub fn cfg(&self) -> &AppConfig {
        &self.inner.cfg
    }

    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.inner.registry)
    }

    pub fn metrics(&self) -> &AppMetrics {
        &self.inner.metrics
    }

    pub fn features(&self) -> &FeatureDirectory {
        &self.inner.features
    }

    pub fn upload(&self) -> &UploadService {
        &self.inner.upload
    }
}
