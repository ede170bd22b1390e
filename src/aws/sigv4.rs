//! AWS Signature Version 4 for the handful of REST calls the gateways make.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use super::AwsCredentials;
use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

pub struct SigningParams<'a> {
    pub credentials: &'a AwsCredentials,
    pub region: &'a str,
    pub service: &'a str,
    pub time: DateTime<Utc>,
}

impl SigningParams<'_> {
    pub fn amz_date(&self) -> String {
        self.time.format("%Y%m%dT%H%M%SZ").to_string()
    }

    fn date_stamp(&self) -> String {
        self.time.format("%Y%m%d").to_string()
    }

    fn scope(&self) -> String {
        format!(
            "{}/{}/{}/aws4_request",
            self.date_stamp(),
            self.region,
            self.service
        )
    }
}

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn hmac(key: &[u8], data: &[u8]) -> Result<Vec<u8>, AppError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| AppError::Internal(format!("HMAC key rejected: {}", e)))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

pub fn signing_key(
    secret: &str,
    date_stamp: &str,
    region: &str,
    service: &str,
) -> Result<Vec<u8>, AppError> {
    let k_date = hmac(format!("AWS4{}", secret).as_bytes(), date_stamp.as_bytes())?;
    let k_region = hmac(&k_date, region.as_bytes())?;
    let k_service = hmac(&k_region, service.as_bytes())?;
    hmac(&k_service, b"aws4_request")
}

/// Percent-encodes a path the way S3 expects: every byte except unreserved
/// characters and `/` is escaped, once.
pub fn canonical_uri(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Builds the `Authorization` header value.
///
/// `headers` must contain every header to be signed, including `host` and
/// `x-amz-date`; names are matched case-insensitively.
pub fn authorization(
    method: &str,
    path: &str,
    headers: &[(&str, String)],
    payload: &[u8],
    params: &SigningParams<'_>,
) -> Result<String, AppError> {
    let mut canonical: Vec<(String, String)> = headers
        .iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), value.trim().to_string()))
        .collect();
    canonical.sort_by(|a, b| a.0.cmp(&b.0));

    let canonical_headers: String = canonical
        .iter()
        .map(|(name, value)| format!("{}:{}\n", name, value))
        .collect();
    let signed_headers = canonical
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(";");

    let canonical_request = format!(
        "{}\n{}\n\n{}\n{}\n{}",
        method,
        canonical_uri(path),
        canonical_headers,
        signed_headers,
        sha256_hex(payload)
    );

    let scope = params.scope();
    let string_to_sign = format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        params.amz_date(),
        scope,
        sha256_hex(canonical_request.as_bytes())
    );

    let key = signing_key(
        &params.credentials.secret_access_key,
        &params.date_stamp(),
        params.region,
        params.service,
    )?;
    let signature = hex::encode(hmac(&key, string_to_sign.as_bytes())?);

    Ok(format!(
        "{} Credential={}/{}, SignedHeaders={}, Signature={}",
        ALGORITHM, params.credentials.access_key_id, scope, signed_headers, signature
    ))
}
