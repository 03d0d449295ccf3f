//! featuremeter core: metric registry, feature instrumentation, and
//! active-job tracking.
//!
//! This crate owns the in-process metrics state and the wrappers that record
//! into it. It carries no transport or runtime dependencies so the same
//! instrumentation can wrap sync code, any executor's futures, or HTTP
//! handlers in the gateway.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied outside tests
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Metric misuse surfaces as `FeatureMeterError` and never reaches the caller
//! of an instrumented operation.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]

pub mod catalogue;
pub mod error;
pub mod instrument;
pub mod metrics;
pub mod tracker;

/// Shared result type.
pub use error::{FeatureMeterError, Result};

pub use catalogue::AppMetrics;
pub use instrument::{FeatureInstrument, Instrumentation, Instrumented};
pub use metrics::{MetricDesc, MetricHandle, MetricKind, Registry, Series};
pub use tracker::{ActiveJobs, JobGuard};
