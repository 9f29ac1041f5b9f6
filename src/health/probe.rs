// src/health/probe.rs
use crate::config::Config;
use crate::health::error::ProbeError;
use crate::health::probes::{IdentityProviderProbe, MailGatewayProbe, ObjectStorageProbe};
use crate::health::status::{Dependencies, Dependency, DependencyResult, DependencyStatus};
use async_trait::async_trait;
use reqwest::Client;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout, Instant};
use tracing::{debug, warn};

/// A bounded reachability check of one external dependency.
///
/// Implementations must never panic and must report every failure through
/// the returned `DependencyResult`.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn check(&self) -> DependencyResult;
}

/// Run one network round trip under `limit`, timing it.
///
/// `attempt` resolves to the identifying detail reported on success.
pub async fn timed<F>(limit: Duration, attempt: F) -> DependencyResult
where
    F: Future<Output = Result<String, ProbeError>>,
{
    let start = Instant::now();
    let outcome = match timeout(limit, attempt).await {
        Ok(result) => result,
        Err(_) => Err(ProbeError::Timeout(limit)),
    };
    let latency_ms = start.elapsed().as_millis() as u64;

    match outcome {
        Ok(detail) => DependencyResult::ok(latency_ms, detail),
        Err(err) => DependencyResult::error(latency_ms, err.classify()),
    }
}

/// The three probes, one per dependency slot.
#[derive(Clone)]
pub struct ProbeSet {
    mail_gateway: Arc<dyn Probe>,
    object_storage: Arc<dyn Probe>,
    identity_provider: Arc<dyn Probe>,
}

impl ProbeSet {
    pub fn new(
        mail_gateway: Arc<dyn Probe>,
        object_storage: Arc<dyn Probe>,
        identity_provider: Arc<dyn Probe>,
    ) -> Self {
        Self {
            mail_gateway,
            object_storage,
            identity_provider,
        }
    }

    /// Build the real probes. Configuration is captured here; a dependency
    /// whose settings are absent reports `skipped` on every run.
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let limit = config.health.timeout();
        let client = Client::builder()
            .timeout(limit)
            .user_agent(concat!("exam-health/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self::new(
            Arc::new(MailGatewayProbe::new(
                config.mail_gateway.clone(),
                client.clone(),
                limit,
            )),
            Arc::new(ObjectStorageProbe::new(
                config.object_storage.clone(),
                client.clone(),
                limit,
            )),
            Arc::new(IdentityProviderProbe::new(
                config.identity_provider.clone(),
                client,
                limit,
            )),
        ))
    }

    /// Run all probes concurrently. Results are keyed by slot, not by
    /// completion order.
    pub async fn run(&self) -> Dependencies {
        let (mail_gateway, object_storage, identity_provider) = tokio::join!(
            self.mail_gateway.check(),
            self.object_storage.check(),
            self.identity_provider.check(),
        );

        let dependencies = Dependencies {
            mail_gateway,
            object_storage,
            identity_provider,
        };

        for (dependency, result) in dependencies.iter() {
            log_result(dependency, result);
        }

        dependencies
    }
}

fn log_result(dependency: Dependency, result: &DependencyResult) {
    match result.status {
        DependencyStatus::Error => warn!(
            dependency = %dependency,
            latency_ms = ?result.latency_ms,
            detail = ?result.detail,
            "dependency probe failed"
        ),
        status => debug!(
            dependency = %dependency,
            status = status.as_str(),
            latency_ms = ?result.latency_ms,
            "dependency probe finished"
        ),
    }
}
