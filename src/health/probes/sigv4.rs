// src/health/probes/sigv4.rs
//! AWS Signature Version 4 for the object-storage existence check.
//!
//! Only what a bodiless `HEAD` needs: no query string canonicalization
//! beyond passing it through, and the payload is always empty.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use url::Url;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("URL has no host: {0}")]
    MissingHost(String),

    #[error("invalid HMAC key length")]
    KeyLength,
}

/// Headers to attach to the signed request.
#[derive(Debug, Clone)]
pub struct SignedHeaders {
    pub authorization: String,
    pub amz_date: String,
    pub content_sha256: String,
}

#[derive(Debug, Clone)]
pub struct SigV4Signer {
    access_key: String,
    secret_key: String,
    region: String,
    service: String,
}

impl SigV4Signer {
    pub fn new(access_key: &str, secret_key: &str, region: &str) -> Self {
        Self {
            access_key: access_key.to_string(),
            secret_key: secret_key.to_string(),
            region: region.to_string(),
            service: "s3".to_string(),
        }
    }

    pub fn sign_empty(
        &self,
        method: &str,
        url: &Url,
        timestamp: DateTime<Utc>,
    ) -> Result<SignedHeaders, SigningError> {
        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => return Err(SigningError::MissingHost(url.to_string())),
        };

        let amz_date = timestamp.format("%Y%m%dT%H%M%SZ").to_string();
        let date_stamp = timestamp.format("%Y%m%d").to_string();
        let payload_hash = hex::encode(Sha256::digest(b""));

        // Header names must already be lowercase and sorted.
        let canonical_headers = format!(
            "host:{}\nx-amz-content-sha256:{}\nx-amz-date:{}\n",
            host, payload_hash, amz_date
        );
        let signed_headers = "host;x-amz-content-sha256;x-amz-date";

        let canonical_request = format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            method.to_uppercase(),
            url.path(),
            url.query().unwrap_or(""),
            canonical_headers,
            signed_headers,
            payload_hash
        );

        let credential_scope = format!(
            "{}/{}/{}/aws4_request",
            date_stamp, self.region, self.service
        );
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            ALGORITHM,
            amz_date,
            credential_scope,
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );

        let signature = hex::encode(self.signature(&string_to_sign, &date_stamp)?);

        Ok(SignedHeaders {
            authorization: format!(
                "{} Credential={}/{}, SignedHeaders={}, Signature={}",
                ALGORITHM, self.access_key, credential_scope, signed_headers, signature
            ),
            amz_date,
            content_sha256: payload_hash,
        })
    }

    fn signature(&self, string_to_sign: &str, date_stamp: &str) -> Result<Vec<u8>, SigningError> {
        let k_date = hmac_sha256(
            format!("AWS4{}", self.secret_key).as_bytes(),
            date_stamp.as_bytes(),
        )?;
        let k_region = hmac_sha256(&k_date, self.region.as_bytes())?;
        let k_service = hmac_sha256(&k_region, self.service.as_bytes())?;
        let k_signing = hmac_sha256(&k_service, b"aws4_request")?;
        hmac_sha256(&k_signing, string_to_sign.as_bytes())
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, SigningError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| SigningError::KeyLength)?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}
