use async_trait::async_trait;

use crate::config::StorageSettings;
use crate::error::AppError;

/// Trait for blob storage operations (S3-compatible, e.g. Cloudflare R2).
///
/// Abstracted as a trait so tests can use a mock without a real bucket.
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Upload content to the given key.
    async fn put_object(&self, key: &str, content: Vec<u8>, content_type: &str)
        -> Result<(), AppError>;

    /// Public URL under which `key` is served once uploaded.
    fn public_url(&self, key: &str) -> String;
}

/// S3 implementation of StorageClient.
pub struct S3StorageClient {
    client: aws_sdk_s3::Client,
    bucket: String,
    public_base: String,
}

impl S3StorageClient {
    /// Create a new S3 storage client from the `storage` settings.
    ///
    /// `bucket` and `public_base` are required; `endpoint` points the SDK
    /// at R2 / MinIO instead of AWS. Credentials come from the usual AWS
    /// environment variables.
    pub async fn from_settings(settings: &StorageSettings) -> Result<Self, AppError> {
        let bucket = settings
            .bucket
            .clone()
            .ok_or_else(|| AppError::Config("storage.bucket is not configured".into()))?;
        let public_base = settings
            .public_base
            .clone()
            .ok_or_else(|| AppError::Config("storage.public_base is not configured".into()))?;

        let mut config_loader = aws_config::defaults(aws_config::BehaviorVersion::latest());

        if let Some(region) = &settings.region {
            config_loader = config_loader.region(aws_config::Region::new(region.clone()));
        }

        // Support custom S3 endpoint (for R2, MinIO, LocalStack, etc.)
        if let Some(endpoint) = &settings.endpoint {
            config_loader = config_loader.endpoint_url(endpoint);
        }

        let sdk_config = config_loader.load().await;
        let client = aws_sdk_s3::Client::from_conf(
            aws_sdk_s3::config::Builder::from(&sdk_config)
                .force_path_style(settings.endpoint.is_some())
                .build(),
        );

        Ok(Self::new(client, bucket, public_base))
    }

    /// Create with explicit values (useful for testing / DI).
    pub fn new(client: aws_sdk_s3::Client, bucket: String, public_base: String) -> Self {
        Self {
            client,
            bucket,
            public_base: public_base.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl StorageClient for S3StorageClient {
    async fn put_object(
        &self,
        key: &str,
        content: Vec<u8>,
        content_type: &str,
    ) -> Result<(), AppError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(content.into())
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to put object '{}': {}", key, e)))?;

        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base, key)
    }
}
