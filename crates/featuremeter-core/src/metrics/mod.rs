//! In-process metrics registry with Prometheus text rendering.
//!
//! Metrics are described once ([`MetricDesc`]) and registered into a
//! [`Registry`]. Each distinct label-value combination materializes a
//! [`Series`] on first use; series are never removed. Values live in atomics
//! so concurrent updates never take a lock wider than the label lookup.

pub mod registry;
pub mod render;
pub mod series;

pub use registry::{MetricDesc, MetricHandle, MetricKind, Registry};
pub use series::{HistogramSnapshot, Series};
