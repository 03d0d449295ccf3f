use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{FeatureMeterError, Result};
use crate::metrics::registry::MetricKind;

/// `f64` stored as raw bits so it can be updated with a CAS loop.
struct AtomicF64(AtomicU64);

impl AtomicF64 {
    fn new(v: f64) -> Self {
        Self(AtomicU64::new(v.to_bits()))
    }

    fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn add(&self, delta: f64) {
        let mut current = self.0.load(Ordering::Relaxed);
        loop {
            let next = (f64::from_bits(current) + delta).to_bits();
            match self
                .0
                .compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => break,
                Err(v) => current = v,
            }
        }
    }
}

struct AtomicHistogram {
    bounds: Arc<[f64]>,
    // Cumulative: slot i counts observations <= bounds[i].
    buckets: Vec<AtomicU64>,
    sum: AtomicF64,
    count: AtomicU64,
}

enum SeriesValue {
    Scalar(AtomicF64),
    Histogram(AtomicHistogram),
}

/// Point-in-time copy of a histogram series.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSnapshot {
    /// `(upper_bound, cumulative_count)` in bound order, without `+Inf`.
    pub buckets: Vec<(f64, u64)>,
    pub sum: f64,
    pub count: u64,
}

/// Values of one metric at one label combination.
pub struct Series {
    metric: Arc<str>,
    kind: MetricKind,
    value: SeriesValue,
}

impl Series {
    pub(crate) fn new(metric: Arc<str>, kind: MetricKind, bounds: Arc<[f64]>) -> Self {
        let value = match kind {
            MetricKind::Counter | MetricKind::Gauge => SeriesValue::Scalar(AtomicF64::new(0.0)),
            MetricKind::Histogram => SeriesValue::Histogram(AtomicHistogram {
                buckets: bounds.iter().map(|_| AtomicU64::new(0)).collect(),
                bounds,
                sum: AtomicF64::new(0.0),
                count: AtomicU64::new(0),
            }),
        };
        Self {
            metric,
            kind,
            value,
        }
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    pub fn inc(&self) -> Result<()> {
        self.inc_by(1.0)
    }

    /// Add `amount` to a counter or gauge. Counters reject negative amounts.
    pub fn inc_by(&self, amount: f64) -> Result<()> {
        let negative_counter = self.kind == MetricKind::Counter && amount < 0.0;
        if !amount.is_finite() || negative_counter {
            return Err(self.invalid_amount(amount));
        }
        self.scalar("inc")?.add(amount);
        Ok(())
    }

    pub fn dec(&self) -> Result<()> {
        self.dec_by(1.0)
    }

    /// Subtract `amount` from a gauge.
    pub fn dec_by(&self, amount: f64) -> Result<()> {
        if self.kind != MetricKind::Gauge {
            return Err(self.wrong_kind("dec"));
        }
        if !amount.is_finite() {
            return Err(self.invalid_amount(amount));
        }
        self.scalar("dec")?.add(-amount);
        Ok(())
    }

    /// Record one histogram observation.
    pub fn observe(&self, value: f64) -> Result<()> {
        let SeriesValue::Histogram(hist) = &self.value else {
            return Err(self.wrong_kind("observe"));
        };
        if !value.is_finite() {
            return Err(self.invalid_amount(value));
        }

        hist.count.fetch_add(1, Ordering::Relaxed);
        hist.sum.add(value);
        for (bound, slot) in hist.bounds.iter().zip(&hist.buckets) {
            if value <= *bound {
                slot.fetch_add(1, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    /// Current counter or gauge value; `None` for histograms.
    pub fn get(&self) -> Option<f64> {
        match &self.value {
            SeriesValue::Scalar(v) => Some(v.load()),
            SeriesValue::Histogram(_) => None,
        }
    }

    /// Current histogram state; `None` for counters and gauges.
    pub fn histogram(&self) -> Option<HistogramSnapshot> {
        let SeriesValue::Histogram(hist) = &self.value else {
            return None;
        };
        Some(HistogramSnapshot {
            buckets: hist
                .bounds
                .iter()
                .zip(&hist.buckets)
                .map(|(b, c)| (*b, c.load(Ordering::Relaxed)))
                .collect(),
            sum: hist.sum.load(),
            count: hist.count.load(Ordering::Relaxed),
        })
    }

    fn scalar(&self, op: &'static str) -> Result<&AtomicF64> {
        match &self.value {
            SeriesValue::Scalar(v) => Ok(v),
            SeriesValue::Histogram(_) => Err(self.wrong_kind(op)),
        }
    }

    fn wrong_kind(&self, op: &'static str) -> FeatureMeterError {
        FeatureMeterError::InvalidOperationForKind {
            metric: self.metric.to_string(),
            op,
            kind: self.kind.as_str(),
        }
    }

    fn invalid_amount(&self, value: f64) -> FeatureMeterError {
        FeatureMeterError::InvalidAmount {
            metric: self.metric.to_string(),
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(kind: MetricKind, bounds: &[f64]) -> Series {
        Series::new(Arc::from("m"), kind, Arc::from(bounds))
    }

    #[test]
    fn counter_only_goes_up() {
        let s = series(MetricKind::Counter, &[]);
        s.inc().unwrap();
        s.inc_by(2.5).unwrap();
        assert_eq!(s.get(), Some(3.5));

        assert!(matches!(
            s.dec().unwrap_err(),
            FeatureMeterError::InvalidOperationForKind { op: "dec", kind: "counter", .. }
        ));
        assert!(matches!(s.inc_by(-1.0).unwrap_err(), FeatureMeterError::InvalidAmount { .. }));
        assert!(matches!(s.inc_by(f64::NAN).unwrap_err(), FeatureMeterError::InvalidAmount { .. }));
        assert!(matches!(
            s.observe(1.0).unwrap_err(),
            FeatureMeterError::InvalidOperationForKind { op: "observe", .. }
        ));
        assert_eq!(s.get(), Some(3.5));
    }

    #[test]
    fn gauge_moves_both_ways() {
        let s = series(MetricKind::Gauge, &[]);
        s.inc().unwrap();
        s.inc().unwrap();
        s.dec().unwrap();
        s.dec_by(3.0).unwrap();
        assert_eq!(s.get(), Some(-2.0));
        assert!(s.histogram().is_none());
    }

    #[test]
    fn histogram_buckets_are_cumulative() {
        let s = series(MetricKind::Histogram, &[5.0, 10.0, 30.0]);
        for v in [1.0, 5.0, 7.5, 29.0, 100.0] {
            s.observe(v).unwrap();
        }
        let snap = s.histogram().unwrap();
        assert_eq!(snap.buckets, vec![(5.0, 2), (10.0, 3), (30.0, 4)]);
        assert_eq!(snap.count, 5);
        assert_eq!(snap.sum, 142.5);
        assert!(snap.buckets.windows(2).all(|w| w[0].1 <= w[1].1));

        assert!(s.get().is_none());
        assert!(matches!(
            s.inc().unwrap_err(),
            FeatureMeterError::InvalidOperationForKind { op: "inc", kind: "histogram", .. }
        ));
        assert!(matches!(
            s.dec().unwrap_err(),
            FeatureMeterError::InvalidOperationForKind { op: "dec", .. }
        ));
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        let s = Arc::new(series(MetricKind::Counter, &[]));
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let s = Arc::clone(&s);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        s.inc().unwrap();
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(s.get(), Some(8000.0));
    }
}
