//! featuremeter gateway library entry.
//!
//! Wires config, the shared metric registry, instrumented feature services,
//! and the metrics exporter into the demo backend. It is intended to be
//! consumed by the binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod obs;
pub mod ops;
pub mod router;
pub mod services;
