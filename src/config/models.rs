// src/config/models.rs
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub health: HealthConfig,
    pub mail_gateway: MailGatewayConfig,
    pub object_storage: ObjectStorageConfig,
    pub identity_provider: IdentityProviderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub health_path: String,
    pub metrics_enabled: bool,
    pub metrics_path: String,
    /// Grace period for open connections once shutdown starts.
    pub shutdown_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            health_path: "/health".to_string(),
            metrics_enabled: true,
            metrics_path: "/metrics".to_string(),
            shutdown_timeout_ms: 10_000,
        }
    }
}

impl ServerConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

/// Probe timeout and snapshot cache lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub timeout_ms: u64,
    pub cache_ttl_ms: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            cache_ttl_ms: 60_000,
        }
    }
}

impl HealthConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MailGatewayConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub token_url: Option<Url>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectStorageConfig {
    pub endpoint: Option<Url>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub bucket: Option<String>,
    pub region: String,
}

impl Default for ObjectStorageConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            access_key: None,
            secret_key: None,
            bucket: None,
            region: "us-east-1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityProviderConfig {
    pub user_pool_id: Option<String>,
    pub region: Option<String>,
    /// Replaces `https://cognito-idp.{region}.amazonaws.com` when set.
    pub discovery_base_url: Option<Url>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("health.timeout_ms must be greater than zero")]
    ZeroTimeout,

    #[error("health.cache_ttl_ms must be greater than zero")]
    ZeroCacheTtl,

    #[error("invalid server.bind_address {0:?}: {1}")]
    BindAddress(String, std::net::AddrParseError),

    #[error("{0} must start with '/'")]
    RoutePath(&'static str),
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.health.timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.health.cache_ttl_ms == 0 {
            return Err(ConfigError::ZeroCacheTtl);
        }
        if let Err(e) = self.server.bind_address.parse::<std::net::SocketAddr>() {
            return Err(ConfigError::BindAddress(self.server.bind_address.clone(), e));
        }
        if !self.server.health_path.starts_with('/') {
            return Err(ConfigError::RoutePath("server.health_path"));
        }
        if !self.server.metrics_path.starts_with('/') {
            return Err(ConfigError::RoutePath("server.metrics_path"));
        }
        Ok(())
    }
}

/// Treats empty strings the same as missing values, since unset
/// environment variables often arrive as `""`.
pub(crate) fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
