// src/metrics/collector.rs
use crate::health::{Dependency, DependencyResult, HealthSnapshot, OverallStatus};
use anyhow::Result;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

pub struct MetricsRegistry {
    registry: Registry,
    collector: Arc<MetricsCollector>,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let collector = Arc::new(MetricsCollector::new(&registry)?);

        Ok(Self {
            registry,
            collector,
        })
    }

    pub fn collector(&self) -> Arc<MetricsCollector> {
        self.collector.clone()
    }

    pub fn gather(&self) -> Result<Vec<u8>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(buffer)
    }
}

/// How a `get_status` call was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    Hit,
    Miss,
    Joined,
}

impl CacheOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            CacheOutcome::Hit => "hit",
            CacheOutcome::Miss => "miss",
            CacheOutcome::Joined => "joined",
        }
    }
}

pub struct MetricsCollector {
    // Probe metrics
    pub probe_duration_seconds: HistogramVec,
    pub probe_results_total: IntCounterVec,

    // Cache metrics
    pub cache_lookups_total: IntCounterVec,

    // Aggregate
    pub overall_status: IntGauge,
    pub last_checked_timestamp: IntGauge,
}

impl MetricsCollector {
    pub fn new(registry: &Registry) -> Result<Self> {
        let probe_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "health_probe_duration_seconds",
                "Dependency probe duration in seconds",
            ),
            &["dependency"],
        )?;
        registry.register(Box::new(probe_duration_seconds.clone()))?;

        let probe_results_total = IntCounterVec::new(
            Opts::new("health_probe_results_total", "Dependency probe outcomes"),
            &["dependency", "status"],
        )?;
        registry.register(Box::new(probe_results_total.clone()))?;

        let cache_lookups_total = IntCounterVec::new(
            Opts::new(
                "health_cache_lookups_total",
                "Health status lookups by cache outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(cache_lookups_total.clone()))?;

        let overall_status = IntGauge::new(
            "health_overall_status",
            "Overall health (0=ok, 1=degraded, 2=error)",
        )?;
        registry.register(Box::new(overall_status.clone()))?;

        let last_checked_timestamp = IntGauge::new(
            "health_last_checked_timestamp_seconds",
            "Unix time of the last completed probe run",
        )?;
        registry.register(Box::new(last_checked_timestamp.clone()))?;

        Ok(Self {
            probe_duration_seconds,
            probe_results_total,
            cache_lookups_total,
            overall_status,
            last_checked_timestamp,
        })
    }

    pub fn record_probe(&self, dependency: Dependency, result: &DependencyResult) {
        let name = dependency.name();
        self.probe_results_total
            .with_label_values(&[name, result.status.as_str()])
            .inc();

        if let Some(latency_ms) = result.latency_ms {
            self.probe_duration_seconds
                .with_label_values(&[name])
                .observe(latency_ms as f64 / 1000.0);
        }
    }

    pub fn record_snapshot(&self, snapshot: &HealthSnapshot) {
        for (dependency, result) in snapshot.dependencies.iter() {
            self.record_probe(dependency, result);
        }

        let value = match snapshot.overall_status {
            OverallStatus::Ok => 0,
            OverallStatus::Degraded => 1,
            OverallStatus::Error => 2,
        };
        self.overall_status.set(value);
        self.last_checked_timestamp
            .set(snapshot.checked_at.timestamp());
    }

    pub fn record_cache_lookup(&self, outcome: CacheOutcome) {
        self.cache_lookups_total
            .with_label_values(&[outcome.as_str()])
            .inc();
    }
}
