//! Application config loader (strict parsing).

pub mod schema;

use std::fs;
use std::io::ErrorKind;

use featuremeter_core::error::{FeatureMeterError, Result};

pub use schema::{AppConfig, FeatureConfig, MetricsSection, ServerSection, UploadSection};

/// Env var naming the config file.
pub const CONFIG_ENV: &str = "FEATUREMETER_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "featuremeter.yaml";

/// Load and validate `path`; a missing file yields the defaults.
pub fn load_or_default(path: &str) -> Result<AppConfig> {
    match fs::read_to_string(path) {
        Ok(s) => load_from_str(&s),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::info!(path, "config file not found, using defaults");
            let cfg = AppConfig::default();
            cfg.validate()?;
            Ok(cfg)
        }
        Err(e) => Err(FeatureMeterError::Internal(format!(
            "read config failed: {e}"
        ))),
    }
}

pub fn load_from_str(s: &str) -> Result<AppConfig> {
    let cfg: AppConfig = serde_yaml::from_str(s)
        .map_err(|e| FeatureMeterError::BadRequest(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
