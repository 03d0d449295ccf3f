use std::collections::HashSet;
use std::net::SocketAddr;

use serde::Deserialize;
use featuremeter_core::error::{FeatureMeterError, Result};

use crate::services::upload::UPLOAD_FEATURE;

/// Routes owned by the router itself.
const RESERVED_ROUTES: [&str; 2] = ["/health", "/upload"];
/// Feature names whose series are owned by built-in endpoints.
const RESERVED_FEATURES: [&str; 1] = [UPLOAD_FEATURE];
const MAX_WORK_MS: u64 = 60_000;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub metrics: MetricsSection,

    #[serde(default = "default_features")]
    pub features: Vec<FeatureConfig>,

    #[serde(default)]
    pub upload: UploadSection,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: 1,
            server: ServerSection::default(),
            metrics: MetricsSection::default(),
            features: default_features(),
            upload: UploadSection::default(),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(FeatureMeterError::BadRequest(format!(
                "unsupported config version: {}",
                self.version
            )));
        }

        let server = self.server.listen_addr()?;
        if self.metrics.enabled {
            let metrics = self.metrics.listen_addr()?;
            if metrics.port() == server.port() && metrics.port() != 0 {
                return Err(FeatureMeterError::BadRequest(
                    "metrics.listen must use a different port than server.listen".into(),
                ));
            }
        }

        let mut names = HashSet::new();
        let mut routes = HashSet::new();
        for f in &self.features {
            f.validate()?;
            if !names.insert(f.name.as_str()) {
                return Err(FeatureMeterError::BadRequest(format!(
                    "duplicate feature name: {}",
                    f.name
                )));
            }
            if !routes.insert(f.route.as_str()) {
                return Err(FeatureMeterError::BadRequest(format!(
                    "duplicate feature route: {}",
                    f.route
                )));
            }
        }

        self.upload.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_server_listen")]
    pub listen: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_server_listen(),
        }
    }
}

impl ServerSection {
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        parse_addr("server.listen", &self.listen)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_metrics_listen")]
    pub listen: String,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            enabled: true,
            listen: default_metrics_listen(),
        }
    }
}

impl MetricsSection {
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        parse_addr("metrics.listen", &self.listen)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeatureConfig {
    pub name: String,
    pub route: String,
    /// Simulated processing time.
    #[serde(default)]
    pub work_ms: u64,
}

impl FeatureConfig {
    fn new(name: &str, route: &str, work_ms: u64) -> Self {
        Self {
            name: name.into(),
            route: route.into(),
            work_ms,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(FeatureMeterError::BadRequest("feature name must not be empty".into()));
        }
        if RESERVED_FEATURES.contains(&self.name.as_str()) {
            return Err(FeatureMeterError::BadRequest(format!(
                "feature name {} is reserved",
                self.name
            )));
        }
        if !self.route.starts_with('/') || self.route.len() < 2 {
            return Err(FeatureMeterError::BadRequest(format!(
                "feature {}: route must start with '/' and name a path",
                self.name
            )));
        }
        // Plain literal paths only; captures and wildcards would make the
        // router reject or panic on the route table.
        if !self.route.chars().all(is_plain_path_char) || self.route.contains("//") {
            return Err(FeatureMeterError::BadRequest(format!(
                "feature {}: route {} must be a literal path",
                self.name, self.route
            )));
        }
        if RESERVED_ROUTES.contains(&self.route.as_str()) {
            return Err(FeatureMeterError::BadRequest(format!(
                "feature {}: route {} is reserved",
                self.name, self.route
            )));
        }
        if self.work_ms > MAX_WORK_MS {
            return Err(FeatureMeterError::BadRequest(format!(
                "feature {}: work_ms must be at most {MAX_WORK_MS}",
                self.name
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UploadSection {
    #[serde(default = "default_upload_work_ms")]
    pub work_ms: u64,
}

impl Default for UploadSection {
    fn default() -> Self {
        Self {
            work_ms: default_upload_work_ms(),
        }
    }
}

impl UploadSection {
    pub fn validate(&self) -> Result<()> {
        if self.work_ms > MAX_WORK_MS {
            return Err(FeatureMeterError::BadRequest(format!(
                "upload.work_ms must be at most {MAX_WORK_MS}"
            )));
        }
        Ok(())
    }
}

fn is_plain_path_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '/' | '-' | '_' | '.' | '~')
}

fn parse_addr(field: &str, s: &str) -> Result<SocketAddr> {
    s.parse()
        .map_err(|e| FeatureMeterError::BadRequest(format!("{field} must be a valid SocketAddr: {e}")))
}

fn default_server_listen() -> String {
    "0.0.0.0:8000".into()
}
fn default_metrics_listen() -> String {
    "0.0.0.0:8001".into()
}
fn default_true() -> bool {
    true
}
fn default_upload_work_ms() -> u64 {
    500
}

fn default_features() -> Vec<FeatureConfig> {
    vec![
        FeatureConfig::new("ppt_to_video", "/generate-video", 1500),
        FeatureConfig::new("quiz", "/generate-quiz", 1000),
        FeatureConfig::new("mindmap", "/generate-mindmap", 800),
        FeatureConfig::new("summary", "/summarize", 600),
        FeatureConfig::new("translation", "/translate", 900),
        FeatureConfig::new("video_summary", "/video-summary", 1200),
    ]
}
