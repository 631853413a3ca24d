use async_trait::async_trait;

use crate::core::error::Result;

/// Blob storage for raw file bytes, addressed by an opaque key
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store `data` under `key` and return the pointer to persist with the file record
    async fn write(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<String>;

    /// Fetch the bytes behind `pointer`.
    ///
    /// Fails with `AppError::NotFound` when the object is missing from the store.
    async fn read(&self, pointer: &str) -> Result<Vec<u8>>;
}
