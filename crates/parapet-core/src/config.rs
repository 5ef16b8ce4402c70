//! Configuration module
//!
//! Application configuration loaded from environment variables, covering the
//! server, the S3-compatible object store, the external identity provider, and
//! the avatar upload policy.

use std::env;

use crate::upload::FileUploadConfig;

const DEFAULT_SERVER_PORT: u16 = 3000;
const DEFAULT_PRESIGN_EXPIRY_MINUTES: u64 = 3;
const DEFAULT_AVATAR_MAX_FILE_SIZE_MB: u64 = 2;
const DEFAULT_AVATAR_EXTENSIONS: &str = "jpg,jpeg,png,webp";
const DEFAULT_AVATAR_CONTENT_TYPES: &str = "image/jpeg,image/png,image/webp";

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,
    // Object storage configuration
    pub s3_bucket: String,
    pub s3_region: String,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, DigitalOcean Spaces, etc.)
    pub presign_expiry_minutes: u64,
    // External identity/session provider
    pub auth_base_url: String,
    // Avatar upload policy
    pub avatar_max_file_size: u64,
    pub avatar_allowed_extensions: Vec<String>,
    pub avatar_allowed_content_types: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let cors_origins = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let avatar_max_file_size_mb = env::var("AVATAR_MAX_FILE_SIZE_MB")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_AVATAR_MAX_FILE_SIZE_MB);

        let avatar_allowed_extensions = env::var("AVATAR_ALLOWED_EXTENSIONS")
            .unwrap_or_else(|_| DEFAULT_AVATAR_EXTENSIONS.to_string())
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        let avatar_allowed_content_types = env::var("AVATAR_ALLOWED_CONTENT_TYPES")
            .unwrap_or_else(|_| DEFAULT_AVATAR_CONTENT_TYPES.to_string())
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Config {
            server_port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_SERVER_PORT),
            environment,
            cors_origins,
            s3_bucket: env::var("S3_BUCKET")
                .map_err(|_| anyhow::anyhow!("S3_BUCKET must be set"))?,
            s3_region: env::var("S3_REGION")
                .or_else(|_| env::var("AWS_REGION"))
                .map_err(|_| anyhow::anyhow!("S3_REGION or AWS_REGION must be set"))?,
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            presign_expiry_minutes: env::var("PRESIGN_EXPIRY_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_PRESIGN_EXPIRY_MINUTES),
            auth_base_url: env::var("AUTH_BASE_URL")
                .map_err(|_| anyhow::anyhow!("AUTH_BASE_URL must be set"))?,
            avatar_max_file_size: avatar_max_file_size_mb * 1024 * 1024,
            avatar_allowed_extensions,
            avatar_allowed_content_types,
        })
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    /// Build the avatar upload policy from the configured allow-lists.
    pub fn avatar_upload_config(&self) -> Result<FileUploadConfig, anyhow::Error> {
        FileUploadConfig::new(
            self.avatar_max_file_size,
            self.avatar_allowed_extensions.iter().cloned(),
            self.avatar_allowed_content_types.iter().cloned(),
        )
        .map_err(|e| anyhow::anyhow!("invalid avatar upload configuration: {}", e))
    }
}
