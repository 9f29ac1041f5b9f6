// src/health/mod.rs
mod aggregator;
mod error;
mod probe;
pub mod probes;
mod status;

pub use aggregator::HealthAggregator;
pub use error::ProbeError;
pub use probe::{timed, Probe, ProbeSet};
pub use status::{
    derive_overall_status, Dependencies, Dependency, DependencyResult, DependencyStatus,
    HealthSnapshot, OverallStatus,
};
