use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::ContentStore;
use crate::core::error::{AppError, Result};

/// Content store kept in process memory, for tests
#[derive(Default)]
pub struct InMemoryContentStore {
    objects: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop an object, simulating bytes lost from the backing store
    pub async fn remove(&self, pointer: &str) {
        self.objects.write().await.remove(pointer);
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn write(&self, key: &str, data: Vec<u8>, _content_type: &str) -> Result<String> {
        self.objects.write().await.insert(key.to_string(), data);
        Ok(key.to_string())
    }

    async fn read(&self, pointer: &str) -> Result<Vec<u8>> {
        self.objects
            .read()
            .await
            .get(pointer)
            .cloned()
            .ok_or_else(|| AppError::NotFound("File not found on server".to_string()))
    }
}
