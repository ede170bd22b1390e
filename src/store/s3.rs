use chrono::Utc;
use reqwest::{Client, Method, StatusCode, Url};
use tracing::{instrument, warn};

use super::ObjectStore;
use crate::aws::sigv4::{self, SigningParams};
use crate::aws::{AwsCredentials, host_header};
use crate::env::S3Settings;
use crate::error::AppError;

const SERVICE: &str = "s3";

/// S3 bucket accessed through its REST API with SigV4 signing. With an
/// endpoint override (local emulators, tests) path-style addressing is used.
pub struct S3ObjectStore {
    http: Client,
    origin: String,
    bucket_in_path: bool,
    bucket: String,
    region: String,
    credentials: AwsCredentials,
}

impl S3ObjectStore {
    pub fn new(
        http: Client,
        settings: &S3Settings,
        region: &str,
        credentials: AwsCredentials,
    ) -> Self {
        let (origin, bucket_in_path) = match &settings.endpoint {
            Some(endpoint) => (endpoint.trim_end_matches('/').to_string(), true),
            None => (
                format!("https://{}.s3.{}.amazonaws.com", settings.bucket, region),
                false,
            ),
        };

        Self {
            http,
            origin,
            bucket_in_path,
            bucket: settings.bucket.clone(),
            region: region.to_string(),
            credentials,
        }
    }

    fn object_path(&self, key: &str) -> String {
        if self.bucket_in_path {
            format!("/{}/{}", self.bucket, key)
        } else {
            format!("/{}", key)
        }
    }

    async fn send(
        &self,
        method: Method,
        key: &str,
        body: Vec<u8>,
    ) -> Result<(StatusCode, Vec<u8>), AppError> {
        let path = self.object_path(key);
        let url = Url::parse(&format!("{}{}", self.origin, sigv4::canonical_uri(&path)))
            .map_err(|e| AppError::Storage(format!("Invalid object URL for {}: {}", key, e)))?;

        let params = SigningParams {
            credentials: &self.credentials,
            region: &self.region,
            service: SERVICE,
            time: Utc::now(),
        };
        let amz_date = params.amz_date();
        let payload_hash = sigv4::sha256_hex(&body);

        let mut headers = vec![
            ("host", host_header(&url)?),
            ("x-amz-content-sha256", payload_hash.clone()),
            ("x-amz-date", amz_date.clone()),
        ];
        if let Some(token) = &self.credentials.session_token {
            headers.push(("x-amz-security-token", token.clone()));
        }

        let authorization =
            sigv4::authorization(method.as_str(), &path, &headers, &body, &params)?;

        let mut request = self
            .http
            .request(method.clone(), url)
            .header("x-amz-content-sha256", payload_hash)
            .header("x-amz-date", amz_date)
            .header("authorization", authorization);
        if let Some(token) = &self.credentials.session_token {
            request = request.header("x-amz-security-token", token);
        }
        if method == Method::PUT {
            request = request.header("content-type", "application/json").body(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("{} {} failed: {}", method, key, e)))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::Storage(format!("{} {} body: {}", method, key, e)))?;

        Ok((status, bytes.to_vec()))
    }
}

#[async_trait::async_trait]
impl ObjectStore for S3ObjectStore {
    #[instrument(skip(self))]
    async fn get_object(&self, key: &str) -> Result<Option<Vec<u8>>, AppError> {
        let (status, body) = self.send(Method::GET, key, Vec::new()).await?;

        match status {
            s if s.is_success() => Ok(Some(body)),
            StatusCode::NOT_FOUND => Ok(None),
            s => {
                warn!(status = %s, "Object read rejected");
                Err(AppError::Storage(format!(
                    "GET {} returned {}: {}",
                    key,
                    s,
                    String::from_utf8_lossy(&body)
                )))
            }
        }
    }

    #[instrument(skip(self, body), fields(bytes = body.len()))]
    async fn put_object(&self, key: &str, body: Vec<u8>) -> Result<(), AppError> {
        let (status, response) = self.send(Method::PUT, key, body).await?;

        if status.is_success() {
            Ok(())
        } else {
            warn!(status = %status, "Object write rejected");
            Err(AppError::Storage(format!(
                "PUT {} returned {}: {}",
                key,
                status,
                String::from_utf8_lossy(&response)
            )))
        }
    }
}
