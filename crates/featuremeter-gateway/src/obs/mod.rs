//! Metrics exposition.
//!
//! The exporter serves the shared registry on its own listener so scrapes
//! never go through the primary router.

pub mod exporter;
