//! Top-level facade crate for featuremeter.
//!
//! Re-exports the metrics core and the gateway library so users can depend on a single crate.

pub mod core {
    pub use featuremeter_core::*;
}

pub mod gateway {
    pub use featuremeter_gateway::*;
}
