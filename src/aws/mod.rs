pub mod sigv4;

use reqwest::Url;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

/// The `Host` header reqwest will send for this URL; it has to be signed verbatim.
pub fn host_header(url: &Url) -> Result<String, AppError> {
    let host = url
        .host_str()
        .ok_or_else(|| AppError::Internal(format!("URL {} has no host", url)))?;

    Ok(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_header_keeps_explicit_port_only() {
        let url = Url::parse("https://bucket.s3.eu-central-1.amazonaws.com/user_data/a.json").unwrap();
        assert_eq!(host_header(&url).unwrap(), "bucket.s3.eu-central-1.amazonaws.com");

        let url = Url::parse("http://127.0.0.1:9000/bucket/key").unwrap();
        assert_eq!(host_header(&url).unwrap(), "127.0.0.1:9000");
    }
}
