//! Object storage for uploaded CSV files.
//!
//! Any S3-compatible service works: Supabase storage, MinIO or AWS itself.
//! Credentials come from the standard AWS environment variables.

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use thiserror::Error;
use tracing::info;

use crate::config::StorageConfig;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("upload failed: {0}")]
    Upload(String),
    #[error("delete failed: {0}")]
    Delete(String),
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_object(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StorageError>;
    async fn delete_object(&self, path: &str) -> Result<(), StorageError>;
    fn public_url(&self, path: &str) -> String;
}

pub struct S3Storage {
    client: Client,
    bucket: String,
    public_base: String,
}

impl S3Storage {
    pub async fn from_config(config: &StorageConfig) -> Self {
        let shared = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        let client = Client::from_conf(builder.build());

        let public_base = config
            .public_url
            .clone()
            .or_else(|| config.endpoint.clone())
            .unwrap_or_else(|| format!("https://{}.s3.amazonaws.com", config.bucket));

        info!(bucket = %config.bucket, endpoint = ?config.endpoint, "🪣 Object storage configured");

        Self {
            client,
            bucket: config.bucket.clone(),
            public_base: public_base.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Storage {
    async fn put_object(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(path)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| StorageError::Upload(DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }

    async fn delete_object(&self, path: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| StorageError::Delete(DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        object_url(&self.public_base, &self.bucket, path)
    }
}

fn object_url(base: &str, bucket: &str, path: &str) -> String {
    if base.ends_with(".amazonaws.com") {
        format!("{}/{}", base, path)
    } else {
        format!("{}/{}/{}", base, bucket, path)
    }
}

#[cfg(test)]
pub mod memory {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MemoryObjectStore {
        pub objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
    }

    #[async_trait]
    impl ObjectStore for MemoryObjectStore {
        async fn put_object(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
            let mut objects = self.objects.lock().unwrap();
            if objects.contains_key(path) {
                return Err(StorageError::Upload(format!("{path} already exists")));
            }
            objects.insert(path.to_string(), (bytes, content_type.to_string()));
            Ok(())
        }

        async fn delete_object(&self, path: &str) -> Result<(), StorageError> {
            self.objects.lock().unwrap().remove(path);
            Ok(())
        }

        fn public_url(&self, path: &str) -> String {
            object_url("https://storage.test", "csv-uploads", path)
        }
    }
}
