pub mod memory;
pub mod s3;

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{info, instrument};

use crate::error::AppError;

pub use memory::MemoryObjectStore;
pub use s3::S3ObjectStore;

/// Which family of documents a key belongs to; each lives under its own prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    UserData,
    UserRecords,
    TrainerData,
}

impl DocumentKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            DocumentKind::UserData => "user_data/",
            DocumentKind::UserRecords => "user_records/",
            DocumentKind::TrainerData => "trainer_data/",
        }
    }

    pub fn key(&self, id: &str) -> Result<String, AppError> {
        if id.is_empty() || id.contains('/') {
            return Err(AppError::Validation(format!("Invalid document id '{}'", id)));
        }
        Ok(format!("{}{}.json", self.prefix(), id))
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix().trim_end_matches('/'))
    }
}

/// Raw bytes by key. `put_object` always replaces whatever was there.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get_object(&self, key: &str) -> Result<Option<Vec<u8>>, AppError>;

    async fn put_object(&self, key: &str, body: Vec<u8>) -> Result<(), AppError>;
}

/// JSON documents on top of an [`ObjectStore`]. There is no versioning or
/// conditional write: concurrent writers to one document race and the last
/// one wins.
#[derive(Clone)]
pub struct DocumentStore {
    objects: Arc<dyn ObjectStore>,
}

impl DocumentStore {
    pub fn new(objects: Arc<dyn ObjectStore>) -> Self {
        Self { objects }
    }

    #[instrument(skip(self))]
    pub async fn read_raw(&self, kind: DocumentKind, id: &str) -> Result<Vec<u8>, AppError> {
        let key = kind.key(id)?;
        info!(key = %key, "Reading document");

        self.objects
            .get_object(&key)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No {} document for {}", kind, id)))
    }

    pub async fn read<T: DeserializeOwned>(
        &self,
        kind: DocumentKind,
        id: &str,
    ) -> Result<T, AppError> {
        let bytes = self.read_raw(kind, id).await?;

        serde_json::from_slice(&bytes).map_err(|e| {
            AppError::Storage(format!("Malformed {} document for {}: {}", kind, id, e))
        })
    }

    pub async fn read_or_else<T, F>(
        &self,
        kind: DocumentKind,
        id: &str,
        default: F,
    ) -> Result<T, AppError>
    where
        T: DeserializeOwned,
        F: FnOnce() -> T,
    {
        match self.read(kind, id).await {
            Ok(document) => Ok(document),
            Err(AppError::NotFound(_)) => Ok(default()),
            Err(err) => Err(err),
        }
    }

    #[instrument(skip(self, document))]
    pub async fn write<T: Serialize + Sync>(
        &self,
        kind: DocumentKind,
        id: &str,
        document: &T,
    ) -> Result<(), AppError> {
        let key = kind.key(id)?;
        let body = serde_json::to_vec(document)?;
        info!(key = %key, bytes = body.len(), "Writing document");

        self.objects.put_object(&key, body).await
    }
}
