// tests/common/mod.rs
//! Shared stub probes for aggregator and server tests.

#![allow(dead_code)]

use async_trait::async_trait;
use exam_health::health::{DependencyResult, DependencyStatus, HealthAggregator, Probe, ProbeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Counts calls and can be switched between success and failure at runtime.
pub struct StubProbe {
    name: &'static str,
    calls: AtomicUsize,
    failing: AtomicBool,
    delay: Duration,
    status: Option<DependencyStatus>,
}

impl StubProbe {
    pub fn ok(name: &'static str) -> Arc<Self> {
        Self::build(name, Duration::ZERO, None)
    }

    pub fn slow(name: &'static str, delay: Duration) -> Arc<Self> {
        Self::build(name, delay, None)
    }

    /// Always reports `status` regardless of the failing switch.
    pub fn fixed(name: &'static str, status: DependencyStatus) -> Arc<Self> {
        Self::build(name, Duration::ZERO, Some(status))
    }

    fn build(name: &'static str, delay: Duration, status: Option<DependencyStatus>) -> Arc<Self> {
        Arc::new(Self {
            name,
            calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            delay,
            status,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl Probe for StubProbe {
    async fn check(&self) -> DependencyResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let latency_ms = self.delay.as_millis() as u64;

        match self.status {
            Some(DependencyStatus::Skipped) => DependencyResult::skipped(self.name),
            Some(status) => DependencyResult {
                status,
                latency_ms: Some(latency_ms),
                detail: Some(self.name.to_string()),
            },
            None if self.failing.load(Ordering::SeqCst) => {
                DependencyResult::error(latency_ms, "500 Internal Server Error")
            }
            None => DependencyResult::ok(latency_ms, self.name),
        }
    }
}

pub struct Stubs {
    pub mail_gateway: Arc<StubProbe>,
    pub object_storage: Arc<StubProbe>,
    pub identity_provider: Arc<StubProbe>,
}

impl Stubs {
    pub fn ok() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            mail_gateway: StubProbe::slow("mail-gateway", delay),
            object_storage: StubProbe::slow("exam-questions", delay),
            identity_provider: StubProbe::slow("identity-provider", delay),
        }
    }

    pub fn aggregator(&self, ttl: Duration) -> HealthAggregator {
        let probes = ProbeSet::new(
            self.mail_gateway.clone(),
            self.object_storage.clone(),
            self.identity_provider.clone(),
        );
        HealthAggregator::new(probes, ttl, None)
    }

    pub fn calls(&self) -> [usize; 3] {
        [
            self.mail_gateway.calls(),
            self.object_storage.calls(),
            self.identity_provider.calls(),
        ]
    }
}
