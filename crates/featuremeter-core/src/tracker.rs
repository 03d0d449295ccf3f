//! Gauge bracketing for in-flight work.
//!
//! [`ActiveJobs::track`] increments `active_jobs{job_type}` and returns a
//! [`JobGuard`] whose drop performs the matching decrement, so the gauge
//! returns to its prior value however the scope ends.

use std::future::Future;
use std::sync::Arc;

use crate::catalogue::AppMetrics;
use crate::error::{FeatureMeterError, Result};
use crate::metrics::{MetricHandle, MetricKind, Series};

#[derive(Clone)]
pub struct ActiveJobs {
    gauge: MetricHandle,
}

impl ActiveJobs {
    pub fn new(metrics: &AppMetrics) -> Self {
        Self::from_handle(metrics.active_jobs.clone())
    }

    /// Track against any one-label gauge.
    pub fn from_handle(gauge: MetricHandle) -> Self {
        Self { gauge }
    }

    /// Increment the gauge for `job_type`. On error nothing was incremented
    /// and no guard exists.
    pub fn track(&self, job_type: &str) -> Result<JobGuard> {
        let series = self.gauge.with_labels(&[job_type])?;
        if series.kind() != MetricKind::Gauge {
            return Err(FeatureMeterError::InvalidOperationForKind {
                metric: self.gauge.desc().name.clone(),
                op: "track",
                kind: series.kind().as_str(),
            });
        }
        series.inc()?;
        Ok(JobGuard {
            job_type: job_type.to_string(),
            series,
        })
    }

    /// Run `op` inside a tracked scope. A tracking failure is logged and `op`
    /// still runs, so callers only ever see `op`'s own result.
    pub fn scope<R>(&self, job_type: &str, op: impl FnOnce() -> R) -> R {
        let _guard = self.track_or_warn(job_type);
        op()
    }

    /// Async form of [`ActiveJobs::scope`]. The gauge moves on first poll.
    pub async fn scope_async<Fut: Future>(&self, job_type: &str, fut: Fut) -> Fut::Output {
        let _guard = self.track_or_warn(job_type);
        fut.await
    }

    /// Current gauge value for `job_type`; zero if never tracked.
    pub fn active(&self, job_type: &str) -> f64 {
        self.gauge
            .get(&[job_type])
            .ok()
            .flatten()
            .and_then(|s| s.get())
            .unwrap_or(0.0)
    }

    fn track_or_warn(&self, job_type: &str) -> Option<JobGuard> {
        match self.track(job_type) {
            Ok(guard) => Some(guard),
            Err(e) => {
                tracing::warn!(job_type, error = %e, "active job tracking unavailable");
                None
            }
        }
    }
}

/// Decrements the tracked gauge exactly once when dropped.
#[must_use = "the gauge is decremented as soon as the guard is dropped"]
pub struct JobGuard {
    job_type: String,
    series: Arc<Series>,
}

impl JobGuard {
    pub fn job_type(&self) -> &str {
        &self.job_type
    }
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        if let Err(e) = self.series.dec() {
            tracing::error!(job_type = %self.job_type, error = %e, "active job decrement failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::Registry;

    fn jobs() -> ActiveJobs {
        let reg = Registry::new();
        ActiveJobs::new(&AppMetrics::register(&reg).unwrap())
    }

    #[test]
    fn guard_decrements_on_drop() {
        let jobs = jobs();
        {
            let a = jobs.track("video_generation").unwrap();
            let _b = jobs.track("video_generation").unwrap();
            assert_eq!(a.job_type(), "video_generation");
            assert_eq!(jobs.active("video_generation"), 2.0);
            drop(a);
            assert_eq!(jobs.active("video_generation"), 1.0);
        }
        assert_eq!(jobs.active("video_generation"), 0.0);
    }

    #[test]
    fn scope_restores_gauge_on_error_return() {
        let jobs = jobs();
        let res: std::result::Result<(), &str> = jobs.scope("file_processing", || {
            assert_eq!(jobs.active("file_processing"), 1.0);
            Err("disk full")
        });
        assert_eq!(res, Err("disk full"));
        assert_eq!(jobs.active("file_processing"), 0.0);
    }

    #[test]
    fn scope_restores_gauge_on_panic() {
        let jobs = jobs();
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            jobs.scope("file_processing", || panic!("worker crashed"))
        }));
        assert!(res.is_err());
        assert_eq!(jobs.active("file_processing"), 0.0);
    }

    #[test]
    fn non_gauge_handle_owes_nothing() {
        let reg = Registry::new();
        let counter = reg.register_counter("jobs_total", "Jobs", &["job_type"]).unwrap();
        let jobs = ActiveJobs::from_handle(counter.clone());

        let err = jobs.track("x").err().unwrap();
        assert!(matches!(err, FeatureMeterError::InvalidOperationForKind { op: "track", .. }));
        assert_eq!(counter.with_labels(&["x"]).unwrap().get(), Some(0.0));

        // scope still runs the operation
        assert_eq!(jobs.scope("x", || 5), 5);
    }

    #[test]
    fn cardinality_mismatch_propagates() {
        let reg = Registry::new();
        let gauge = reg.register_gauge("workers", "Workers", &["pool", "kind"]).unwrap();
        let err = ActiveJobs::from_handle(gauge).track("x").err().unwrap();
        assert!(matches!(err, FeatureMeterError::LabelCardinalityMismatch { .. }));
    }
}
