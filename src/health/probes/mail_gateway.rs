// src/health/probes/mail_gateway.rs
use crate::config::{present, MailGatewayConfig};
use crate::health::error::ProbeError;
use crate::health::probe::{timed, Probe};
use crate::health::status::DependencyResult;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Checks that the mail gateway will issue a client-credentials token.
pub struct MailGatewayProbe {
    config: MailGatewayConfig,
    client: Client,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

impl MailGatewayProbe {
    pub fn new(config: MailGatewayConfig, client: Client, timeout: Duration) -> Self {
        Self {
            config,
            client,
            timeout,
        }
    }

    async fn request_token(
        &self,
        token_url: &Url,
        client_id: &str,
        client_secret: &str,
    ) -> Result<String, ProbeError> {
        let response = self
            .client
            .post(token_url.clone())
            .basic_auth(client_id, Some(client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Status(status));
        }

        let body: TokenResponse = response.json().await.map_err(|e| {
            ProbeError::InvalidResponse(format!("malformed token response: {}", e))
        })?;

        match body.access_token {
            Some(token) if !token.is_empty() => Ok(token_url.to_string()),
            _ => Err(ProbeError::InvalidResponse(
                "token endpoint issued no access_token".to_string(),
            )),
        }
    }
}

#[async_trait]
impl Probe for MailGatewayProbe {
    async fn check(&self) -> DependencyResult {
        let (Some(client_id), Some(client_secret)) = (
            present(&self.config.client_id),
            present(&self.config.client_secret),
        ) else {
            return DependencyResult::skipped("mail gateway client id/secret");
        };
        let Some(token_url) = &self.config.token_url else {
            return DependencyResult::skipped("mail gateway token url");
        };

        timed(
            self.timeout,
            self.request_token(token_url, client_id, client_secret),
        )
        .await
    }
}
