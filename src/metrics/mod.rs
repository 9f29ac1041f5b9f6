// src/metrics/mod.rs
mod collector;

pub use collector::{CacheOutcome, MetricsCollector, MetricsRegistry};
