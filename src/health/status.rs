// src/health/status.rs
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// The three external dependencies the portal relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Dependency {
    MailGateway,
    ObjectStorage,
    IdentityProvider,
}

impl Dependency {
    pub const ALL: [Dependency; 3] = [
        Dependency::MailGateway,
        Dependency::ObjectStorage,
        Dependency::IdentityProvider,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Dependency::MailGateway => "mail-gateway",
            Dependency::ObjectStorage => "object-storage",
            Dependency::IdentityProvider => "identity-provider",
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyStatus {
    Ok,
    Error,
    /// Required configuration is absent; the probe did not run.
    Skipped,
    /// Reserved. No probe reports it today, but aggregation honors it.
    Degraded,
}

impl DependencyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyStatus::Ok => "ok",
            DependencyStatus::Error => "error",
            DependencyStatus::Skipped => "skipped",
            DependencyStatus::Degraded => "degraded",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Ok,
    Degraded,
    Error,
}

impl OverallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverallStatus::Ok => "ok",
            OverallStatus::Degraded => "degraded",
            OverallStatus::Error => "error",
        }
    }

    pub fn is_ok(&self) -> bool {
        *self == OverallStatus::Ok
    }
}

/// Outcome of a single probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyResult {
    pub status: DependencyStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl DependencyResult {
    pub fn ok(latency_ms: u64, detail: impl Into<String>) -> Self {
        Self {
            status: DependencyStatus::Ok,
            latency_ms: Some(latency_ms),
            detail: Some(detail.into()),
        }
    }

    pub fn error(latency_ms: u64, detail: impl Into<String>) -> Self {
        Self {
            status: DependencyStatus::Error,
            latency_ms: Some(latency_ms),
            detail: Some(detail.into()),
        }
    }

    /// Failure detected before any network call, e.g. an unusable URL.
    pub fn invalid(detail: impl Into<String>) -> Self {
        Self {
            status: DependencyStatus::Error,
            latency_ms: None,
            detail: Some(detail.into()),
        }
    }

    /// `what` names the missing setting, e.g. "object storage bucket".
    pub fn skipped(what: &str) -> Self {
        Self {
            status: DependencyStatus::Skipped,
            latency_ms: None,
            detail: Some(format!("{} is not configured", what)),
        }
    }
}

/// One result per dependency. A struct rather than a map so that no
/// dependency can ever be missing from a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependencies {
    pub mail_gateway: DependencyResult,
    pub object_storage: DependencyResult,
    pub identity_provider: DependencyResult,
}

impl Dependencies {
    pub fn get(&self, dependency: Dependency) -> &DependencyResult {
        match dependency {
            Dependency::MailGateway => &self.mail_gateway,
            Dependency::ObjectStorage => &self.object_storage,
            Dependency::IdentityProvider => &self.identity_provider,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Dependency, &DependencyResult)> {
        Dependency::ALL.into_iter().map(move |d| (d, self.get(d)))
    }
}

/// Immutable aggregate of one probe run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSnapshot {
    #[serde(rename = "status")]
    pub overall_status: OverallStatus,
    pub checked_at: DateTime<Utc>,
    pub dependencies: Dependencies,
}

impl HealthSnapshot {
    pub fn new(dependencies: Dependencies, checked_at: DateTime<Utc>) -> Self {
        let overall_status =
            derive_overall_status(dependencies.iter().map(|(_, result)| result.status));
        Self {
            overall_status,
            checked_at,
            dependencies,
        }
    }
}

/// Skipped dependencies do not count; any error wins over degraded, which
/// wins over ok. Nothing left after filtering means ok.
pub fn derive_overall_status<I>(statuses: I) -> OverallStatus
where
    I: IntoIterator<Item = DependencyStatus>,
{
    let mut overall = OverallStatus::Ok;
    for status in statuses {
        match status {
            DependencyStatus::Skipped | DependencyStatus::Ok => {}
            DependencyStatus::Error => return OverallStatus::Error,
            DependencyStatus::Degraded => overall = OverallStatus::Degraded,
        }
    }
    overall
}
