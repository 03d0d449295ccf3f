//! Usage and latency instrumentation for arbitrary operations.
//!
//! A [`FeatureInstrument`] is bound to one feature name. Every invocation run
//! through it increments `feature_requested_total{feature}` and records the
//! elapsed wall time in `feature_duration_seconds{feature}`. The observation
//! is made by a drop guard, so it happens on normal return, on error, on panic
//! unwind, and when an async invocation is cancelled mid-flight. Results and
//! errors pass through untouched.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use crate::catalogue::AppMetrics;
use crate::error::Result;
use crate::metrics::{MetricHandle, Series};

/// Factory for per-feature instruments.
#[derive(Clone)]
pub struct Instrumentation {
    requested: MetricHandle,
    duration: MetricHandle,
}

impl Instrumentation {
    pub fn new(metrics: &AppMetrics) -> Self {
        Self::from_handles(metrics.feature_requested.clone(), metrics.feature_duration.clone())
    }

    /// Build from any one-label counter and histogram pair.
    pub fn from_handles(requested: MetricHandle, duration: MetricHandle) -> Self {
        Self {
            requested,
            duration,
        }
    }

    /// Resolve the series for `feature`. Repeated calls share the same series.
    pub fn feature(&self, feature: &str) -> Result<FeatureInstrument> {
        Ok(FeatureInstrument {
            feature: Arc::from(feature),
            requested: self.requested.with_labels(&[feature])?,
            duration: self.duration.with_labels(&[feature])?,
        })
    }

    /// Shorthand for `self.feature(feature)?.wrap(op)`.
    pub fn instrument<F>(&self, feature: &str, op: F) -> Result<Instrumented<F>> {
        Ok(self.feature(feature)?.wrap(op))
    }
}

/// Instrument bound to a single feature name.
#[derive(Clone)]
pub struct FeatureInstrument {
    feature: Arc<str>,
    requested: Arc<Series>,
    duration: Arc<Series>,
}

impl FeatureInstrument {
    pub fn name(&self) -> &str {
        &self.feature
    }

    /// Run a synchronous operation.
    pub fn call<R>(&self, op: impl FnOnce() -> R) -> R {
        let _timer = self.start();
        op()
    }

    /// Await a future. Nothing is recorded until the returned future is first
    /// polled.
    pub async fn call_async<Fut: Future>(&self, fut: Fut) -> Fut::Output {
        let _timer = self.start();
        fut.await
    }

    /// Wrap `op` into a reusable instrumented operation.
    pub fn wrap<F>(&self, op: F) -> Instrumented<F> {
        Instrumented {
            instrument: self.clone(),
            op,
        }
    }

    fn start(&self) -> InvocationTimer<'_> {
        if let Err(e) = self.requested.inc() {
            tracing::error!(feature = %self.feature, error = %e, "feature counter update failed");
        }
        InvocationTimer {
            instrument: self,
            started: Instant::now(),
        }
    }
}

struct InvocationTimer<'a> {
    instrument: &'a FeatureInstrument,
    started: Instant,
}

impl Drop for InvocationTimer<'_> {
    fn drop(&mut self) {
        let elapsed = self.started.elapsed();
        let feature = &self.instrument.feature;
        if let Err(e) = self.instrument.duration.observe(elapsed.as_secs_f64()) {
            tracing::error!(feature = %feature, error = %e, "feature duration update failed");
        }
        tracing::debug!(
            feature = %feature,
            elapsed_ms = elapsed.as_millis() as u64,
            "feature completed"
        );
    }
}

/// An operation of one argument wrapped with a [`FeatureInstrument`].
///
/// Use a tuple for several arguments, `()` for none.
#[derive(Clone)]
pub struct Instrumented<F> {
    instrument: FeatureInstrument,
    op: F,
}

impl<F> Instrumented<F> {
    pub fn feature(&self) -> &str {
        self.instrument.name()
    }

    /// Invoke a synchronous operation.
    pub fn call<A, R>(&self, arg: A) -> R
    where
        F: Fn(A) -> R,
    {
        let _timer = self.instrument.start();
        (self.op)(arg)
    }

    /// Invoke an operation returning a future. The operation itself is only
    /// called once the returned future is polled.
    pub async fn call_async<A, Fut>(&self, arg: A) -> Fut::Output
    where
        F: Fn(A) -> Fut,
        Fut: Future,
    {
        let _timer = self.instrument.start();
        (self.op)(arg).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::Registry;

    fn setup() -> (AppMetrics, Instrumentation) {
        let reg = Registry::new();
        let metrics = AppMetrics::register(&reg).unwrap();
        let inst = Instrumentation::new(&metrics);
        (metrics, inst)
    }

    fn requested(m: &AppMetrics, feature: &str) -> f64 {
        m.feature_requested.with_labels(&[feature]).unwrap().get().unwrap()
    }

    fn observed(m: &AppMetrics, feature: &str) -> u64 {
        m.feature_duration.with_labels(&[feature]).unwrap().histogram().unwrap().count
    }

    #[test]
    fn sync_call_passes_result_through() {
        let (m, inst) = setup();
        let mindmap = inst.feature("mindmap").unwrap();

        let ok: std::result::Result<u32, String> = mindmap.call(|| Ok(7));
        let err: std::result::Result<u32, String> = mindmap.call(|| Err("boom".into()));

        assert_eq!(ok, Ok(7));
        assert_eq!(err, Err("boom".to_string()));
        assert_eq!(requested(&m, "mindmap"), 2.0);
        assert_eq!(observed(&m, "mindmap"), 2);
    }

    #[test]
    fn wrapped_op_shares_series_across_instances() {
        let (m, inst) = setup();
        let double = inst.instrument("summary", |x: u32| x * 2).unwrap();
        let again = inst.instrument("summary", |(a, b): (u32, u32)| a + b).unwrap();

        assert_eq!(double.call(21), 42);
        assert_eq!(again.call((1, 2)), 3);
        assert_eq!(double.feature(), "summary");
        assert_eq!(requested(&m, "summary"), 2.0);
        assert_eq!(m.feature_requested.series_count(), 1);
    }

    #[test]
    fn panic_still_records_duration() {
        let (m, inst) = setup();
        let fi = inst.feature("translation").unwrap();

        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            fi.call(|| -> u32 { panic!("handler bug") })
        }));

        assert!(res.is_err());
        assert_eq!(requested(&m, "translation"), 1.0);
        assert_eq!(observed(&m, "translation"), 1);
    }

    #[test]
    fn unpolled_future_records_nothing() {
        let (m, inst) = setup();
        let fi = inst.feature("quiz").unwrap();

        let fut = fi.call_async(async { 1 });
        drop(fut);

        assert_eq!(requested(&m, "quiz"), 0.0);
        assert_eq!(observed(&m, "quiz"), 0);
    }
}
