//! S3-compatible storage backend
//!
//! Presigned-URL issuing and object deletion against AWS S3 or any
//! S3-compatible provider (MinIO, DigitalOcean Spaces, etc.). The client is
//! constructed once at startup and injected; it is read-only configuration,
//! safe for concurrent use.

use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::retry::{RetryConfig, RetryMode};
use aws_config::BehaviorVersion;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client;
use parapet_core::FileUploadConfig;
use std::time::Duration;
use url::Url;

use crate::error::{StorageError, StorageResult};
use crate::keys;
use crate::traits::Storage;

/// S3 storage implementation
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
    region: String,
    endpoint_url: Option<String>, // Custom endpoint for S3-compatible providers
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    pub async fn new(bucket: String, region: String, endpoint_url: Option<String>) -> Self {
        let region_provider =
            RegionProviderChain::first_try(aws_config::Region::new(region.clone()));

        let retry_config = RetryConfig::standard()
            .with_max_attempts(5)
            .with_retry_mode(RetryMode::Adaptive);

        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .retry_config(retry_config.clone())
            .load()
            .await;

        // S3-compatible providers need an explicit endpoint and path-style addressing
        let client = if let Some(ref endpoint) = endpoint_url {
            let mut s3_config_builder = aws_sdk_s3::Config::builder()
                .behavior_version(BehaviorVersion::latest())
                .endpoint_url(endpoint)
                .region(config.region().cloned())
                .retry_config(retry_config);
            if let Some(provider) = config.credentials_provider() {
                s3_config_builder = s3_config_builder.credentials_provider(provider);
            }
            s3_config_builder = s3_config_builder.force_path_style(true);
            Client::from_conf(s3_config_builder.build())
        } else {
            Client::new(&config)
        };

        S3Storage {
            client,
            bucket,
            region,
            endpoint_url,
        }
    }

    /// Create an S3Storage over an already-constructed client (tests, custom wiring).
    pub fn from_client(
        client: Client,
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
    ) -> Self {
        S3Storage {
            client,
            bucket,
            region,
            endpoint_url,
        }
    }

    fn base_url(&self) -> String {
        if let Some(ref endpoint) = self.endpoint_url {
            // Path-style URL for compatibility: {endpoint}/{bucket}
            format!("{}/{}", endpoint.trim_end_matches('/'), self.bucket)
        } else {
            // Standard AWS S3 virtual-hosted-style URL
            format!("https://{}.s3.{}.amazonaws.com", self.bucket, self.region)
        }
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn presigned_upload_url(
        &self,
        key: &str,
        file_type: &str,
        file_size: u64,
        checksum: &str,
        config: &FileUploadConfig,
        expires_in: Duration,
        public: bool,
    ) -> StorageResult<String> {
        keys::validate_mime_type(file_type, config)?;
        keys::validate_file_size(file_size, config)?;
        keys::validate_checksum(checksum)?;

        let presigning_config = PresigningConfig::expires_in(expires_in).map_err(|e| {
            tracing::error!(error = %e, key = %key, "Invalid presigning configuration");
            StorageError::PresignedUrl
        })?;

        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(file_type)
            .content_length(file_size as i64)
            .checksum_sha256(checksum);

        if public {
            request = request.acl(ObjectCannedAcl::PublicRead);
        }

        let presigned = request.presigned(presigning_config).await.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %key,
                "Failed to generate presigned PUT URL"
            );
            StorageError::PresignedUrl
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = file_size,
            expires_in_secs = expires_in.as_secs(),
            public = public,
            "Generated presigned PUT URL"
        );

        Ok(presigned.uri().to_string())
    }

    async fn presigned_download_url(
        &self,
        key: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        let presigning_config = PresigningConfig::expires_in(expires_in).map_err(|e| {
            tracing::error!(error = %e, key = %key, "Invalid presigning configuration");
            StorageError::TemporaryUrl
        })?;

        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning_config)
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    "Failed to generate presigned GET URL"
                );
                StorageError::TemporaryUrl
            })?;

        Ok(presigned.uri().to_string())
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        let start = std::time::Instant::now();

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 delete failed"
                );
                StorageError::DeleteObject
            })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url(), key)
    }

    fn extract_key(&self, url: &str) -> Option<String> {
        // Fast path: the URL carries our exact public prefix.
        let prefix = format!("{}/", self.base_url());
        if let Some(key) = url.strip_prefix(&prefix) {
            if !key.is_empty() {
                return Some(key.to_string());
            }
        }

        // Fallback heuristic: parse the URL and look for the bucket either as
        // a virtual-hosted-style host label or a path-style first segment.
        // Not a guaranteed inverse for every provider URL shape.
        let parsed = Url::parse(url).ok()?;
        let path = parsed.path().trim_start_matches('/');
        if path.is_empty() {
            return None;
        }

        if let Some(host) = parsed.host_str() {
            if host == self.bucket || host.starts_with(&format!("{}.", self.bucket)) {
                return Some(path.to_string());
            }
        }

        match path.split_once('/') {
            Some((first, rest)) if first == self.bucket && !rest.is_empty() => {
                Some(rest.to_string())
            }
            _ => None,
        }
    }
}
