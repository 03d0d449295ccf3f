//! Built-in feature services.
//!
//! The demo features only simulate work: each sleeps for its configured time
//! inside an `active_jobs` scope named after the feature.

pub mod simulated;
pub mod upload;

pub use simulated::SimulatedFeature;
pub use upload::{file_type_of, UploadService};
