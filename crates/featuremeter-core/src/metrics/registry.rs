use std::sync::{Arc, PoisonError, RwLock};

use dashmap::DashMap;

use crate::error::{FeatureMeterError, Result};
use crate::metrics::render;
use crate::metrics::series::Series;

/// Kind of a registered metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
}

impl MetricKind {
    /// Name used in `# TYPE` lines and error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
        }
    }
}

/// Immutable definition of a metric.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricDesc {
    pub name: String,
    pub kind: MetricKind,
    pub help: String,
    pub label_names: Vec<String>,
    /// Upper bounds, strictly increasing. Empty unless `kind` is histogram.
    pub buckets: Vec<f64>,
}

impl MetricDesc {
    pub fn counter(name: &str, help: &str, labels: &[&str]) -> Self {
        Self::new(name, MetricKind::Counter, help, labels, &[])
    }

    pub fn gauge(name: &str, help: &str, labels: &[&str]) -> Self {
        Self::new(name, MetricKind::Gauge, help, labels, &[])
    }

    pub fn histogram(name: &str, help: &str, labels: &[&str], buckets: &[f64]) -> Self {
        Self::new(name, MetricKind::Histogram, help, labels, buckets)
    }

    fn new(name: &str, kind: MetricKind, help: &str, labels: &[&str], buckets: &[f64]) -> Self {
        Self {
            name: name.to_string(),
            kind,
            help: help.to_string(),
            label_names: labels.iter().map(|l| l.to_string()).collect(),
            buckets: buckets.to_vec(),
        }
    }

    fn validate(&self) -> Result<()> {
        if !is_metric_name(&self.name) {
            return Err(invalid(format!("bad metric name {:?}", self.name)));
        }
        for (i, label) in self.label_names.iter().enumerate() {
            if !is_label_name(label) || label.starts_with("__") {
                return Err(invalid(format!("{}: bad label name {label:?}", self.name)));
            }
            if self.label_names[..i].contains(label) {
                return Err(invalid(format!("{}: duplicate label {label:?}", self.name)));
            }
        }

        match self.kind {
            MetricKind::Histogram => {
                if self.label_names.iter().any(|l| l == "le") {
                    return Err(invalid(format!("{}: label \"le\" is reserved", self.name)));
                }
                if self.buckets.is_empty() {
                    return Err(invalid(format!("{}: histogram needs buckets", self.name)));
                }
                if self.buckets.iter().any(|b| !b.is_finite()) {
                    return Err(invalid(format!("{}: buckets must be finite", self.name)));
                }
                if self.buckets.windows(2).any(|w| w[0] >= w[1]) {
                    return Err(invalid(format!(
                        "{}: buckets must be strictly increasing",
                        self.name
                    )));
                }
            }
            MetricKind::Counter | MetricKind::Gauge => {
                if !self.buckets.is_empty() {
                    return Err(invalid(format!(
                        "{}: buckets only apply to histograms",
                        self.name
                    )));
                }
            }
        }
        Ok(())
    }
}

fn invalid(msg: String) -> FeatureMeterError {
    FeatureMeterError::InvalidMetricDefinition(msg)
}

fn is_metric_name(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

fn is_label_name(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// One registered metric and all of its series, keyed by label values in
/// definition order.
pub(crate) struct MetricFamily {
    pub(crate) desc: MetricDesc,
    name: Arc<str>,
    bounds: Arc<[f64]>,
    pub(crate) series: DashMap<Vec<String>, Arc<Series>>,
}

/// Handle to a registered metric. Cheap to clone.
#[derive(Clone)]
pub struct MetricHandle {
    family: Arc<MetricFamily>,
}

impl MetricHandle {
    pub fn desc(&self) -> &MetricDesc {
        &self.family.desc
    }

    /// Return the series for `values`, creating it on first use.
    pub fn with_labels(&self, values: &[&str]) -> Result<Arc<Series>> {
        let key = self.key(values)?;
        let family = &self.family;
        let series = family
            .series
            .entry(key)
            .or_insert_with(|| {
                Arc::new(Series::new(
                    Arc::clone(&family.name),
                    family.desc.kind,
                    Arc::clone(&family.bounds),
                ))
            })
            .value()
            .clone();
        Ok(series)
    }

    /// Look up an existing series without creating it.
    pub fn get(&self, values: &[&str]) -> Result<Option<Arc<Series>>> {
        let key = self.key(values)?;
        Ok(self.family.series.get(&key).map(|s| s.value().clone()))
    }

    /// Number of label combinations observed so far.
    pub fn series_count(&self) -> usize {
        self.family.series.len()
    }

    fn key(&self, values: &[&str]) -> Result<Vec<String>> {
        let expected = self.family.desc.label_names.len();
        if values.len() != expected {
            return Err(FeatureMeterError::LabelCardinalityMismatch {
                metric: self.family.desc.name.clone(),
                expected,
                got: values.len(),
            });
        }
        Ok(values.iter().map(|v| v.to_string()).collect())
    }
}

/// Process-wide set of metric definitions.
///
/// Construct one at startup and share it by `Arc`. Registration order is
/// preserved for rendering.
#[derive(Default)]
pub struct Registry {
    families: RwLock<Vec<Arc<MetricFamily>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `desc`, or return the existing handle if an identical
    /// definition is already present.
    pub fn register(&self, desc: MetricDesc) -> Result<MetricHandle> {
        desc.validate()?;

        let mut families = self.families.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = families.iter().find(|f| f.desc.name == desc.name) {
            if existing.desc != desc {
                return Err(FeatureMeterError::DuplicateMetricName { name: desc.name });
            }
            return Ok(MetricHandle {
                family: Arc::clone(existing),
            });
        }

        tracing::debug!(metric = %desc.name, kind = desc.kind.as_str(), "metric registered");
        let family = Arc::new(MetricFamily {
            name: Arc::from(desc.name.as_str()),
            bounds: Arc::from(desc.buckets.as_slice()),
            desc,
            series: DashMap::new(),
        });
        families.push(Arc::clone(&family));
        Ok(MetricHandle { family })
    }

    pub fn register_counter(&self, name: &str, help: &str, labels: &[&str]) -> Result<MetricHandle> {
        self.register(MetricDesc::counter(name, help, labels))
    }

    pub fn register_gauge(&self, name: &str, help: &str, labels: &[&str]) -> Result<MetricHandle> {
        self.register(MetricDesc::gauge(name, help, labels))
    }

    pub fn register_histogram(
        &self,
        name: &str,
        help: &str,
        labels: &[&str],
        buckets: &[f64],
    ) -> Result<MetricHandle> {
        self.register(MetricDesc::histogram(name, help, labels, buckets))
    }

    /// Names of all registered metrics, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.snapshot().iter().map(|f| f.desc.name.clone()).collect()
    }

    /// Render every metric in Prometheus text exposition format.
    pub fn render(&self) -> String {
        render::render_families(&self.snapshot())
    }

    // The lock only guards the list itself; rendering works on the cloned Arcs.
    fn snapshot(&self) -> Vec<Arc<MetricFamily>> {
        self.families
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_registration_is_idempotent() {
        let reg = Registry::new();
        let a = reg.register_counter("jobs_total", "Jobs", &["kind"]).unwrap();
        let b = reg.register_counter("jobs_total", "Jobs", &["kind"]).unwrap();

        a.with_labels(&["x"]).unwrap().inc().unwrap();
        b.with_labels(&["x"]).unwrap().inc().unwrap();

        assert_eq!(reg.names(), vec!["jobs_total".to_string()]);
        assert_eq!(a.with_labels(&["x"]).unwrap().get(), Some(2.0));
    }

    #[test]
    fn conflicting_registration_fails() {
        let reg = Registry::new();
        reg.register_counter("jobs_total", "Jobs", &["kind"]).unwrap();

        let err = reg.register_gauge("jobs_total", "Jobs", &["kind"]).err().unwrap();
        assert!(matches!(err, FeatureMeterError::DuplicateMetricName { ref name } if name == "jobs_total"));

        let err = reg.register_counter("jobs_total", "Other help", &["kind"]).err().unwrap();
        assert!(matches!(err, FeatureMeterError::DuplicateMetricName { .. }));

        let err = reg.register_counter("jobs_total", "Jobs", &["kind", "user"]).err().unwrap();
        assert!(matches!(err, FeatureMeterError::DuplicateMetricName { .. }));
    }

    #[test]
    fn label_cardinality_is_enforced() {
        let reg = Registry::new();
        let h = reg.register_counter("uploads_total", "Uploads", &["file_type", "user_id"]).unwrap();

        for values in [&["pdf"][..], &["pdf", "anon", "extra"][..], &[][..]] {
            let err = h.with_labels(values).err().unwrap();
            assert!(matches!(
                err,
                FeatureMeterError::LabelCardinalityMismatch { expected: 2, .. }
            ));
        }
        assert_eq!(h.series_count(), 0);
    }

    #[test]
    fn empty_label_value_is_legal() {
        let reg = Registry::new();
        let h = reg.register_counter("feature_requested_total", "Requests", &["feature"]).unwrap();
        h.with_labels(&[""]).unwrap().inc().unwrap();
        assert_eq!(h.get(&[""]).unwrap().unwrap().get(), Some(1.0));
    }

    #[test]
    fn get_does_not_create_series() {
        let reg = Registry::new();
        let h = reg.register_gauge("active_jobs", "Active", &["job_type"]).unwrap();
        assert!(h.get(&["quiz"]).unwrap().is_none());
        assert_eq!(h.series_count(), 0);
    }

    #[test]
    fn invalid_definitions_are_rejected() {
        let reg = Registry::new();
        let cases = [
            MetricDesc::counter("1bad", "h", &[]),
            MetricDesc::counter("ok_total", "h", &["bad-label"]),
            MetricDesc::counter("ok_total", "h", &["a", "a"]),
            MetricDesc::counter("ok_total", "h", &["__reserved"]),
            MetricDesc::histogram("lat", "h", &[], &[]),
            MetricDesc::histogram("lat", "h", &[], &[1.0, 1.0]),
            MetricDesc::histogram("lat", "h", &[], &[f64::INFINITY]),
            MetricDesc::histogram("lat", "h", &["le"], &[1.0]),
        ];
        for desc in cases {
            let err = reg.register(desc.clone()).err().unwrap();
            assert!(
                matches!(err, FeatureMeterError::InvalidMetricDefinition(_)),
                "{desc:?}"
            );
        }
        assert!(reg.names().is_empty());
    }
}
