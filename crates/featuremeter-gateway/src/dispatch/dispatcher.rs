use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use featuremeter_core::error::{FeatureMeterError, Result};
use featuremeter_core::{FeatureInstrument, Instrumentation};

/// A feature endpoint's business logic. Knows nothing about metrics.
#[async_trait]
pub trait FeatureService: Send + Sync {
    fn feature(&self) -> &str;
    async fn handle(&self, payload: Value) -> Result<Value>;
}

#[derive(Clone)]
struct Entry {
    service: Arc<dyn FeatureService>,
    instrument: FeatureInstrument,
}

/// Registry of feature services. Every dispatch runs through the feature's
/// instrument.
pub struct FeatureDirectory {
    instrumentation: Instrumentation,
    features: DashMap<String, Entry>,
}

impl FeatureDirectory {
    pub fn new(instrumentation: Instrumentation) -> Self {
        Self {
            instrumentation,
            features: DashMap::new(),
        }
    }

    /// Register `svc` under its feature name, replacing any previous service.
    pub fn register(&self, svc: Arc<dyn FeatureService>) -> Result<()> {
        let name = svc.feature().to_string();
        let instrument = self.instrumentation.feature(&name)?;
        self.features.insert(
            name,
            Entry {
                service: svc,
                instrument,
            },
        );
        Ok(())
    }

    pub fn registered(&self) -> Vec<String> {
        let mut names: Vec<String> = self.features.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub async fn dispatch(&self, feature: &str, payload: Value) -> Result<Value> {
        let entry = self
            .features
            .get(feature)
            .ok_or_else(|| FeatureMeterError::BadRequest(format!("unknown feature: {feature}")))?
            .value()
            .clone();
        entry
            .instrument
            .call_async(entry.service.handle(payload))
            .await
    }
}
