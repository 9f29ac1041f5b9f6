// src/health/probes/object_storage.rs
use super::sigv4::SigV4Signer;
use crate::config::{present, ObjectStorageConfig};
use crate::health::error::ProbeError;
use crate::health::probe::{timed, Probe};
use crate::health::status::DependencyResult;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Checks that the configured bucket exists with a signed `HEAD /{bucket}`.
pub struct ObjectStorageProbe {
    config: ObjectStorageConfig,
    client: Client,
    timeout: Duration,
}

impl ObjectStorageProbe {
    pub fn new(config: ObjectStorageConfig, client: Client, timeout: Duration) -> Self {
        Self {
            config,
            client,
            timeout,
        }
    }

    async fn head_bucket(
        &self,
        url: Url,
        bucket: &str,
        signer: SigV4Signer,
    ) -> Result<String, ProbeError> {
        let signed = signer
            .sign_empty("HEAD", &url, Utc::now())
            .map_err(|e| ProbeError::Request(e.to_string()))?;

        let response = self
            .client
            .head(url)
            .header("authorization", signed.authorization)
            .header("x-amz-date", signed.amz_date)
            .header("x-amz-content-sha256", signed.content_sha256)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Status(status));
        }
        Ok(bucket.to_string())
    }
}

/// Path-style bucket URL: `{endpoint}/{bucket}`.
pub(crate) fn bucket_url(endpoint: &Url, bucket: &str) -> Option<Url> {
    let mut url = endpoint.clone();
    url.path_segments_mut().ok()?.pop_if_empty().push(bucket);
    Some(url)
}

#[async_trait]
impl Probe for ObjectStorageProbe {
    async fn check(&self) -> DependencyResult {
        let Some(endpoint) = &self.config.endpoint else {
            return DependencyResult::skipped("object storage endpoint");
        };
        let (Some(access_key), Some(secret_key)) = (
            present(&self.config.access_key),
            present(&self.config.secret_key),
        ) else {
            return DependencyResult::skipped("object storage access/secret key");
        };
        let Some(bucket) = present(&self.config.bucket) else {
            return DependencyResult::skipped("object storage bucket");
        };

        let Some(url) = bucket_url(endpoint, bucket) else {
            return DependencyResult::invalid(format!(
                "object storage endpoint {} cannot hold a bucket path",
                endpoint
            ));
        };
        let signer = SigV4Signer::new(access_key, secret_key, &self.config.region);

        timed(self.timeout, self.head_bucket(url, bucket, signer)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_is_appended_as_path_segment() {
        let endpoint = Url::parse("http://127.0.0.1:9000").unwrap();
        assert_eq!(
            bucket_url(&endpoint, "exam-questions").unwrap().as_str(),
            "http://127.0.0.1:9000/exam-questions"
        );

        let endpoint = Url::parse("https://storage.example.com/s3/").unwrap();
        assert_eq!(
            bucket_url(&endpoint, "exam-questions").unwrap().as_str(),
            "https://storage.example.com/s3/exam-questions"
        );
    }

    #[test]
    fn opaque_endpoint_has_no_bucket_url() {
        let endpoint = Url::parse("mailto:ops@example.com").unwrap();
        assert!(bucket_url(&endpoint, "b").is_none());
    }
}
