//! MinIO/S3-compatible content store
//!
//! Every uploaded file lives in a single private bucket under a configurable
//! prefix. Nothing in the bucket is publicly readable; bytes leave the store
//! only through an authorized download.
//!
//! Uses rust-s3 crate for lightweight S3 operations.

use async_trait::async_trait;
use s3::creds::Credentials;
use s3::{Bucket, BucketConfiguration, Region};
use tracing::{debug, info, warn};

use super::ContentStore;
use crate::core::config::MinIOConfig;
use crate::core::error::{AppError, Result};

/// MinIO/S3-compatible storage client
pub struct MinIOClient {
    bucket: Box<Bucket>,
    region: Region,
    credentials: Credentials,
    endpoint: String,
    prefix: String,
}

impl MinIOClient {
    /// Create a new MinIO client from configuration and make sure the bucket exists
    pub async fn new(config: MinIOConfig) -> Result<Self> {
        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| AppError::Internal(format!("Failed to create MinIO credentials: {}", e)))?;

        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        };

        let mut bucket = Bucket::new(&config.bucket, region.clone(), credentials.clone())
            .map_err(|e| AppError::Internal(format!("Failed to create MinIO bucket: {}", e)))?;

        // Use path-style URLs for MinIO (http://endpoint/bucket instead of http://bucket.endpoint)
        bucket.set_path_style();

        let client = Self {
            bucket,
            region,
            credentials,
            endpoint: config.endpoint,
            prefix: config.prefix,
        };

        client.ensure_bucket_exists().await?;

        info!(
            "MinIO client initialized for endpoint: {}, bucket: {}, prefix: {}",
            client.endpoint,
            client.bucket.name(),
            client.prefix
        );

        Ok(client)
    }

    /// Ensure the bucket exists, create if not
    pub async fn ensure_bucket_exists(&self) -> Result<()> {
        match Bucket::create_with_path_style(
            &self.bucket.name(),
            self.region.clone(),
            self.credentials.clone(),
            BucketConfiguration::private(),
        )
        .await
        {
            Ok(_) => {
                info!("Bucket '{}' created successfully", self.bucket.name());
                Ok(())
            }
            Err(e) => {
                let error_str = e.to_string();
                if error_str.contains("BucketAlreadyOwnedByYou")
                    || error_str.contains("BucketAlreadyExists")
                    || error_str.contains("already own it")
                {
                    debug!("Bucket '{}' already exists", self.bucket.name());
                } else {
                    // Bucket might exist behind a different error; writes will surface real problems
                    warn!(
                        "Could not create bucket '{}': {}. Assuming it exists.",
                        self.bucket.name(),
                        e
                    );
                }
                Ok(())
            }
        }
    }

    /// Get the bucket name
    pub fn bucket_name(&self) -> String {
        self.bucket.name()
    }

    /// Prefix `key` with the configured storage prefix
    fn object_key(&self, key: &str) -> String {
        let key = key.trim_start_matches('/');
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}/{}", self.prefix, key)
        }
    }

    fn is_missing_object(message: &str) -> bool {
        message.contains("404") || message.contains("NoSuchKey")
    }
}

#[async_trait]
impl ContentStore for MinIOClient {
    async fn write(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<String> {
        let object_key = self.object_key(key);
        let size = data.len();

        let response = self
            .bucket
            .put_object_with_content_type(&object_key, &data, content_type)
            .await
            .map_err(|e| {
                AppError::Internal(format!("Failed to upload file '{}': {}", object_key, e))
            })?;

        let status = response.status_code();
        if !(200..300).contains(&status) {
            return Err(AppError::Internal(format!(
                "Failed to upload file '{}': HTTP {}",
                object_key, status
            )));
        }

        debug!(
            "Uploaded '{}' ({} bytes) to bucket '{}'",
            object_key,
            size,
            self.bucket.name()
        );
        Ok(object_key)
    }

    async fn read(&self, pointer: &str) -> Result<Vec<u8>> {
        let response = self.bucket.get_object(pointer).await.map_err(|e| {
            let message = e.to_string();
            if Self::is_missing_object(&message) {
                AppError::NotFound("File not found on server".to_string())
            } else {
                AppError::Internal(format!("Failed to download file '{}': {}", pointer, message))
            }
        })?;

        match response.status_code() {
            200..=299 => {
                debug!(
                    "Downloaded '{}' from bucket '{}'",
                    pointer,
                    self.bucket.name()
                );
                Ok(response.to_vec())
            }
            404 => Err(AppError::NotFound("File not found on server".to_string())),
            status => Err(AppError::Internal(format!(
                "Failed to download file '{}': HTTP {}",
                pointer, status
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_object_detection() {
        assert!(MinIOClient::is_missing_object("Got HTTP 404 with content"));
        assert!(MinIOClient::is_missing_object("NoSuchKey: the key does not exist"));
        assert!(!MinIOClient::is_missing_object("connection refused"));
    }
}
