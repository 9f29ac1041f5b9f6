// src/health/probes/identity_provider.rs
use crate::config::{present, IdentityProviderConfig};
use crate::health::error::ProbeError;
use crate::health::probe::{timed, Probe};
use crate::health::status::DependencyResult;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Fetches the user pool's OpenID discovery document.
pub struct IdentityProviderProbe {
    config: IdentityProviderConfig,
    client: Client,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct DiscoveryDocument {
    issuer: Option<String>,
}

impl IdentityProviderProbe {
    pub fn new(config: IdentityProviderConfig, client: Client, timeout: Duration) -> Self {
        Self {
            config,
            client,
            timeout,
        }
    }

    async fn fetch_discovery(&self, url: Url) -> Result<String, ProbeError> {
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Status(status));
        }

        let document: DiscoveryDocument = response.json().await.map_err(|e| {
            ProbeError::InvalidResponse(format!("malformed discovery document: {}", e))
        })?;

        match document.issuer {
            Some(issuer) if !issuer.is_empty() => Ok(url.to_string()),
            _ => Err(ProbeError::InvalidResponse(
                "discovery document has no issuer".to_string(),
            )),
        }
    }
}

/// Pool ids are `{region}_{suffix}`.
pub(crate) fn region_from_pool_id(pool_id: &str) -> Option<&str> {
    match pool_id.split_once('_') {
        Some((region, suffix)) if !region.is_empty() && !suffix.is_empty() => Some(region),
        _ => None,
    }
}

pub(crate) fn discovery_url(
    base: Option<&Url>,
    region: &str,
    pool_id: &str,
) -> Result<Url, url::ParseError> {
    let mut url = match base {
        Some(base) => base.clone(),
        None => Url::parse(&format!("https://cognito-idp.{}.amazonaws.com", region))?,
    };
    url.path_segments_mut()
        .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
        .pop_if_empty()
        .extend([pool_id, ".well-known", "openid-configuration"]);
    Ok(url)
}

#[async_trait]
impl Probe for IdentityProviderProbe {
    async fn check(&self) -> DependencyResult {
        let Some(pool_id) = present(&self.config.user_pool_id) else {
            return DependencyResult::skipped("identity pool id");
        };
        let region = present(&self.config.region).or_else(|| region_from_pool_id(pool_id));
        let Some(region) = region else {
            return DependencyResult::skipped("identity provider region");
        };

        let url = match discovery_url(self.config.discovery_base_url.as_ref(), region, pool_id) {
            Ok(url) => url,
            Err(e) => {
                return DependencyResult::invalid(format!("invalid discovery url: {}", e));
            }
        };

        timed(self.timeout, self.fetch_discovery(url)).await
    }
}
