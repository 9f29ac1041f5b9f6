// src/health/aggregator.rs
use crate::config::Config;
use crate::health::probe::ProbeSet;
use crate::health::status::{HealthSnapshot, OverallStatus};
use crate::metrics::{CacheOutcome, MetricsCollector};
use arc_swap::ArcSwapOption;
use chrono::Utc;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

type InFlight = Shared<BoxFuture<'static, Result<Arc<HealthSnapshot>, String>>>;

/// Serves health snapshots from a TTL cache, running the probe set at most
/// once at a time no matter how many callers are waiting.
///
/// Cloning is cheap and every clone shares the same cache.
#[derive(Clone)]
pub struct HealthAggregator {
    inner: Arc<Inner>,
}

struct Inner {
    probes: ProbeSet,
    ttl: Duration,
    // Snapshot and its timestamp are swapped together.
    cache: ArcSwapOption<Cached>,
    in_flight: Mutex<Option<InFlight>>,
    metrics: Option<Arc<MetricsCollector>>,
}

struct Cached {
    snapshot: Arc<HealthSnapshot>,
    computed_at: Instant,
}

impl HealthAggregator {
    pub fn new(probes: ProbeSet, ttl: Duration, metrics: Option<Arc<MetricsCollector>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                probes,
                ttl,
                cache: ArcSwapOption::empty(),
                in_flight: Mutex::new(None),
                metrics,
            }),
        }
    }

    pub fn from_config(
        config: &Config,
        metrics: Option<Arc<MetricsCollector>>,
    ) -> Result<Self, reqwest::Error> {
        let probes = ProbeSet::from_config(config)?;
        Ok(Self::new(probes, config.health.cache_ttl(), metrics))
    }

    /// Last completed snapshot, fresh or not, without probing.
    pub fn current(&self) -> Option<Arc<HealthSnapshot>> {
        self.inner.cache.load_full().map(|cached| cached.snapshot.clone())
    }

    /// Current health. Served from cache while it is younger than the TTL
    /// unless `force_refresh` is set; otherwise joins or starts the single
    /// in-flight probe run.
    pub async fn get_status(&self, force_refresh: bool) -> Arc<HealthSnapshot> {
        if !force_refresh {
            if let Some(snapshot) = self.inner.fresh() {
                self.inner.record_lookup(CacheOutcome::Hit);
                return snapshot;
            }
        }

        let pending = {
            let mut slot = self.inner.lock_in_flight();
            match slot.clone() {
                Some(pending) => {
                    self.inner.record_lookup(CacheOutcome::Joined);
                    debug!("joining in-flight health check");
                    pending
                }
                None => {
                    // A run may have finished between the fast path and the lock.
                    if !force_refresh {
                        if let Some(snapshot) = self.inner.fresh() {
                            self.inner.record_lookup(CacheOutcome::Hit);
                            return snapshot;
                        }
                    }
                    self.inner.record_lookup(CacheOutcome::Miss);
                    let pending = self.inner.clone().start();
                    *slot = Some(pending.clone());
                    pending
                }
            }
        };

        match pending.clone().await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                // Only reachable if a probe panicked; unblock later callers first.
                let mut slot = self.inner.lock_in_flight();
                if slot.as_ref().is_some_and(|current| current.ptr_eq(&pending)) {
                    *slot = None;
                }
                drop(slot);
                panic!("health check task failed: {}", err);
            }
        }
    }
}

impl Inner {
    fn fresh(&self) -> Option<Arc<HealthSnapshot>> {
        let cached = self.cache.load_full()?;
        if cached.computed_at.elapsed() < self.ttl {
            Some(cached.snapshot.clone())
        } else {
            None
        }
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, Option<InFlight>> {
        // The guarded value is only ever replaced whole, so a poisoned lock
        // still holds a consistent slot.
        self.in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Spawn the probe run so it completes and installs its snapshot even if
    /// every waiting caller goes away.
    fn start(self: Arc<Self>) -> InFlight {
        debug!("starting health check");
        tokio::spawn(async move { self.compute().await })
            .map(|joined| joined.map_err(|e| e.to_string()))
            .boxed()
            .shared()
    }

    async fn compute(&self) -> Arc<HealthSnapshot> {
        let dependencies = self.probes.run().await;
        let snapshot = Arc::new(HealthSnapshot::new(dependencies, Utc::now()));

        let previous = {
            let mut slot = self.lock_in_flight();
            let previous = self.cache.swap(Some(Arc::new(Cached {
                snapshot: snapshot.clone(),
                computed_at: Instant::now(),
            })));
            *slot = None;
            previous
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_snapshot(&snapshot);
        }

        let before = previous.map(|cached| cached.snapshot.overall_status);
        log_transition(before, snapshot.overall_status);

        snapshot
    }

    fn record_lookup(&self, outcome: CacheOutcome) {
        if let Some(metrics) = &self.metrics {
            metrics.record_cache_lookup(outcome);
        }
    }
}

fn log_transition(before: Option<OverallStatus>, after: OverallStatus) {
    match before {
        Some(before) if before == after => {
            debug!(status = after.as_str(), "health check complete");
        }
        _ if after.is_ok() => info!(
            from = before.map(|s| s.as_str()).unwrap_or("unknown"),
            to = after.as_str(),
            "overall health changed"
        ),
        _ => warn!(
            from = before.map(|s| s.as_str()).unwrap_or("unknown"),
            to = after.as_str(),
            "overall health changed"
        ),
    }
}
