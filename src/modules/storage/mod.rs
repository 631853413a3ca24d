//! Storage module for uploaded file contents
//!
//! The core only sees the [`ContentStore`] trait: bytes go in under a key and
//! come back out by the same key. MinIO/S3 is the production backend.

mod content_store;
#[cfg(test)]
mod memory_store;
mod minio_client;

pub use content_store::ContentStore;
#[cfg(test)]
pub use memory_store::InMemoryContentStore;
pub use minio_client::MinIOClient;
