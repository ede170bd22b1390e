use dashmap::DashMap;

use super::ObjectStore;
use crate::error::AppError;

/// Keeps objects in process memory; contents vanish with the process.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: DashMap<String, Vec<u8>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn contains(&self, key: &str) -> bool {
        self.objects.contains_key(key)
    }
}

#[async_trait::async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get_object(&self, key: &str) -> Result<Option<Vec<u8>>, AppError> {
        Ok(self.objects.get(key).map(|entry| entry.value().clone()))
    }

    async fn put_object(&self, key: &str, body: Vec<u8>) -> Result<(), AppError> {
        self.objects.insert(key.to_string(), body);
        Ok(())
    }
}
