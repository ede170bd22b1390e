use std::path::Path;

use anyhow::{Context, anyhow};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::aws::AwsCredentials;

pub const DEFAULT_REGION: &str = "eu-central-1";

pub fn load_environment() -> Result<(), Box<dyn std::error::Error>> {
    let is_production =
        dotenvy::var("ROCKET_PROFILE").unwrap_or("development".to_string()) == "production";

    let env_files = if is_production {
        vec!["config/common.env", "config/prod.env", ".secrets.env"]
    } else {
        vec!["config/common.env", "config/dev.env", ".secrets.env"]
    };

    for env_file in env_files {
        load_env_file(env_file)?;
    }

    Ok(())
}

fn load_env_file(path: &str) -> Result<(), Box<dyn std::error::Error>> {
    if !Path::new(path).exists() {
        warn!("Warning: Environment file {} not found, skipping", path);
        return Ok(());
    }

    dotenvy::from_filename_override(path)?;
    info!("Loaded environment from: {}", path);
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Aws,
    Memory,
}

impl Backend {
    fn parse(name: &str, value: Option<String>) -> anyhow::Result<Self> {
        match value.as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("aws") => Ok(Backend::Aws),
            Some("memory") => Ok(Backend::Memory),
            Some(other) => Err(anyhow!("{} must be 'aws' or 'memory', got '{}'", name, other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CognitoSettings {
    pub user_pool_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct S3Settings {
    pub bucket: String,
    pub endpoint: Option<String>,
}

/// Everything the process reads from its environment, loaded once at start
/// and handed to whatever needs it.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub identity_backend: Backend,
    pub storage_backend: Backend,
    pub region: String,
    pub credentials: Option<AwsCredentials>,
    pub cognito: Option<CognitoSettings>,
    pub s3: Option<S3Settings>,
    pub session_secret: String,
}

fn var(name: &str) -> Option<String> {
    dotenvy::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn required(name: &str) -> anyhow::Result<String> {
    var(name).ok_or_else(|| anyhow!("{} environment variable not set", name))
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let identity_backend = Backend::parse("IDENTITY_BACKEND", var("IDENTITY_BACKEND"))?;
        let storage_backend = Backend::parse("STORAGE_BACKEND", var("STORAGE_BACKEND"))?;
        let uses_aws = identity_backend == Backend::Aws || storage_backend == Backend::Aws;

        let credentials = if uses_aws {
            Some(AwsCredentials {
                access_key_id: required("AWS_ACCESS_KEY_ID")?,
                secret_access_key: required("AWS_SECRET_ACCESS_KEY")?,
                session_token: var("AWS_SESSION_TOKEN"),
            })
        } else {
            None
        };

        let cognito = match identity_backend {
            Backend::Aws => Some(CognitoSettings {
                user_pool_id: required("USER_POOL_ID")?,
                client_id: required("APP_CLIENT_ID")?,
                client_secret: required("APP_CLIENT_SECRET")?,
                endpoint: var("COGNITO_ENDPOINT"),
            }),
            Backend::Memory => None,
        };

        let s3 = match storage_backend {
            Backend::Aws => Some(S3Settings {
                bucket: required("S3_BUCKET_NAME")?,
                endpoint: var("S3_ENDPOINT"),
            }),
            Backend::Memory => None,
        };

        Ok(Self {
            identity_backend,
            storage_backend,
            region: var("AWS_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
            credentials,
            cognito,
            s3,
            session_secret: required("SESSION_SECRET_KEY")
                .context("cookies cannot be signed without a secret")?,
        })
    }

    /// Fully in-process configuration, used for local runs and tests.
    pub fn in_memory(session_secret: &str) -> Self {
        Self {
            identity_backend: Backend::Memory,
            storage_backend: Backend::Memory,
            region: DEFAULT_REGION.to_string(),
            credentials: None,
            cognito: None,
            s3: None,
            session_secret: session_secret.to_string(),
        }
    }

    /// Rocket wants exactly 256 bits; any secret length is accepted here.
    pub fn rocket_secret_key(&self) -> String {
        hex::encode(Sha256::digest(self.session_secret.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const AWS_VARS: [(&str, Option<&str>); 9] = [
        ("IDENTITY_BACKEND", None),
        ("STORAGE_BACKEND", None),
        ("AWS_REGION", Some("eu-west-1")),
        ("AWS_ACCESS_KEY_ID", Some("AKIDEXAMPLE")),
        ("AWS_SECRET_ACCESS_KEY", Some("secret")),
        ("USER_POOL_ID", Some("eu-west-1_pool")),
        ("APP_CLIENT_ID", Some("client-id")),
        ("APP_CLIENT_SECRET", Some("client-secret")),
        ("S3_BUCKET_NAME", Some("coach-bucket")),
    ];

    #[test]
    #[serial]
    fn loads_aws_configuration() {
        let mut vars = AWS_VARS.to_vec();
        vars.push(("SESSION_SECRET_KEY", Some("signing-key")));

        temp_env::with_vars(vars, || {
            let config = AppConfig::from_env().expect("config loads");
            assert_eq!(config.identity_backend, Backend::Aws);
            assert_eq!(config.region, "eu-west-1");
            assert_eq!(config.s3.unwrap().bucket, "coach-bucket");
            assert_eq!(config.cognito.unwrap().client_id, "client-id");
            assert!(config.credentials.unwrap().session_token.is_none());
        });
    }

    #[test]
    #[serial]
    fn missing_pool_id_is_an_error() {
        let mut vars = AWS_VARS.to_vec();
        vars.retain(|(name, _)| *name != "USER_POOL_ID");
        vars.push(("USER_POOL_ID", None));
        vars.push(("SESSION_SECRET_KEY", Some("signing-key")));

        temp_env::with_vars(vars, || {
            let err = AppConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("USER_POOL_ID"));
        });
    }

    #[test]
    #[serial]
    fn memory_backends_need_no_aws_settings() {
        temp_env::with_vars(
            [
                ("IDENTITY_BACKEND", Some("memory")),
                ("STORAGE_BACKEND", Some("Memory")),
                ("AWS_ACCESS_KEY_ID", None),
                ("SESSION_SECRET_KEY", Some("signing-key")),
            ],
            || {
                let config = AppConfig::from_env().expect("config loads");
                assert_eq!(config.storage_backend, Backend::Memory);
                assert!(config.credentials.is_none());
                assert!(config.s3.is_none());
            },
        );
    }

    #[test]
    #[serial]
    fn unknown_backend_is_rejected() {
        temp_env::with_vars(
            [
                ("IDENTITY_BACKEND", Some("ldap")),
                ("SESSION_SECRET_KEY", Some("signing-key")),
            ],
            || {
                assert!(AppConfig::from_env().is_err());
            },
        );
    }

    #[test]
    fn rocket_secret_key_is_256_bits_hex() {
        let config = AppConfig::in_memory("short");
        let key = config.rocket_secret_key();
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
