//! Storage operation errors
//!
//! Every failure the key manager can produce is one of a closed set of kinds.
//! Validation kinds are deterministic and safe to show to end users; the three
//! network-failure kinds carry generic messages and never leak backing-store
//! internals (details are logged at the failure site instead).

use thiserror::Error;

/// Storage key manager errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid file extension: {extension} (allowed: {allowed})")]
    InvalidExtension { extension: String, allowed: String },

    #[error("Invalid MIME type: {mime} (allowed: {allowed})")]
    InvalidMimeType { mime: String, allowed: String },

    #[error("Invalid file size: {size} bytes")]
    InvalidFileSize { size: u64 },

    #[error("File size exceeds maximum allowed size of {limit_mb:.2} MB")]
    FileTooLarge { limit_mb: f64 },

    #[error("Invalid path: {reason}")]
    InvalidPath { reason: &'static str },

    #[error("Invalid checksum: expected a 44-character base64-encoded SHA-256 digest")]
    InvalidChecksum,

    #[error("Failed to generate presigned upload URL")]
    PresignedUrl,

    #[error("Failed to generate temporary download URL")]
    TemporaryUrl,

    #[error("Failed to delete object")]
    DeleteObject,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl StorageError {
    /// Machine-readable error code, stable across releases.
    pub fn code(&self) -> &'static str {
        match self {
            StorageError::InvalidExtension { .. } => "INVALID_EXTENSION",
            StorageError::InvalidMimeType { .. } => "INVALID_MIME_TYPE",
            StorageError::InvalidFileSize { .. } => "INVALID_FILE_SIZE",
            StorageError::FileTooLarge { .. } => "FILE_TOO_LARGE",
            StorageError::InvalidPath { .. } => "INVALID_PATH",
            StorageError::InvalidChecksum => "INVALID_CHECKSUM",
            StorageError::PresignedUrl => "PRESIGNED_URL_ERROR",
            StorageError::TemporaryUrl => "TEMPORARY_URL_ERROR",
            StorageError::DeleteObject => "DELETE_OBJECT_ERROR",
        }
    }

    /// Whether this is a deterministic validation failure (retryable only after
    /// the caller corrects its input) as opposed to a backing-store failure.
    pub fn is_validation(&self) -> bool {
        !matches!(
            self,
            StorageError::PresignedUrl | StorageError::TemporaryUrl | StorageError::DeleteObject
        )
    }
}
