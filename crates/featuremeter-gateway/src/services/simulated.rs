use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use featuremeter_core::error::{FeatureMeterError, Result};
use featuremeter_core::ActiveJobs;

use crate::config::FeatureConfig;
use crate::dispatch::FeatureService;

/// Placeholder feature: echoes its JSON object payload after simulated work.
pub struct SimulatedFeature {
    name: String,
    work: Duration,
    jobs: ActiveJobs,
}

impl SimulatedFeature {
    pub fn new(cfg: &FeatureConfig, jobs: ActiveJobs) -> Self {
        Self {
            name: cfg.name.clone(),
            work: Duration::from_millis(cfg.work_ms),
            jobs,
        }
    }
}

#[async_trait]
impl FeatureService for SimulatedFeature {
    fn feature(&self) -> &str {
        &self.name
    }

    async fn handle(&self, payload: Value) -> Result<Value> {
        if !payload.is_object() {
            return Err(FeatureMeterError::BadRequest(format!(
                "{} expects a JSON object payload",
                self.name
            )));
        }

        self.jobs
            .scope_async(&self.name, tokio::time::sleep(self.work))
            .await;

        Ok(json!({
            "status": "ok",
            "feature": self.name,
            "payload": payload,
        }))
    }
}
