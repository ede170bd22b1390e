use std::sync::Arc;

use reqwest::Client;
use tracing::info;

use crate::env::{AppConfig, Backend};
use crate::error::AppError;
use crate::identity::{CognitoIdentityProvider, IdentityProvider, MemoryIdentityProvider};
use crate::store::{DocumentStore, MemoryObjectStore, ObjectStore, S3ObjectStore};

/// The two external services every handler talks to, held in Rocket state.
#[derive(Clone)]
pub struct Services {
    pub identity: Arc<dyn IdentityProvider>,
    pub documents: DocumentStore,
}

impl Services {
    pub fn new(identity: Arc<dyn IdentityProvider>, objects: Arc<dyn ObjectStore>) -> Self {
        Self {
            identity,
            documents: DocumentStore::new(objects),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let http = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let identity: Arc<dyn IdentityProvider> = match (config.identity_backend, &config.cognito) {
            (Backend::Aws, Some(cognito)) => Arc::new(CognitoIdentityProvider::new(
                http.clone(),
                cognito,
                &config.region,
                aws_credentials(config)?,
            )?),
            (Backend::Aws, None) => {
                return Err(AppError::Internal(
                    "Cognito backend selected without Cognito settings".to_string(),
                ));
            }
            (Backend::Memory, _) => Arc::new(MemoryIdentityProvider::new()),
        };

        let objects: Arc<dyn ObjectStore> = match (config.storage_backend, &config.s3) {
            (Backend::Aws, Some(s3)) => Arc::new(S3ObjectStore::new(
                http,
                s3,
                &config.region,
                aws_credentials(config)?,
            )),
            (Backend::Aws, None) => {
                return Err(AppError::Internal(
                    "S3 backend selected without S3 settings".to_string(),
                ));
            }
            (Backend::Memory, _) => Arc::new(MemoryObjectStore::new()),
        };

        info!(
            identity = ?config.identity_backend,
            storage = ?config.storage_backend,
            region = %config.region,
            "Gateways configured"
        );

        Ok(Self::new(identity, objects))
    }
}

fn aws_credentials(config: &AppConfig) -> Result<crate::aws::AwsCredentials, AppError> {
    config
        .credentials
        .clone()
        .ok_or_else(|| AppError::Internal("AWS credentials are not configured".to_string()))
}
