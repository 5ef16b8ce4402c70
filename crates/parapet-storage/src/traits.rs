//! Storage abstraction trait
//!
//! The API layer depends on this trait rather than a concrete backend so the
//! S3 client stays an injected, explicitly-constructed collaborator (and so
//! handlers can be tested against a mock).

use async_trait::async_trait;
use parapet_core::FileUploadConfig;
use std::time::Duration;

use crate::error::StorageResult;

/// Object storage abstraction for presigned direct uploads and cleanup.
///
/// **Key format:** `{visibility}[/{path}]/{uuid}.{extension}`, with visibility
/// `public` or `private`. See the `keys` module.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Generate a presigned PUT URL for a direct browser upload.
    ///
    /// The grant is bound to the exact key, content type, content length, and
    /// SHA-256 checksum so the payload cannot be swapped after issuance; when
    /// `public` is set, the object is additionally granted public-read. The
    /// file type, size, and checksum are revalidated against `config` before
    /// any network call.
    async fn presigned_upload_url(
        &self,
        key: &str,
        file_type: &str,
        file_size: u64,
        checksum: &str,
        config: &FileUploadConfig,
        expires_in: Duration,
        public: bool,
    ) -> StorageResult<String>;

    /// Generate a time-limited GET URL for reading a private object.
    async fn presigned_download_url(&self, key: &str, expires_in: Duration)
        -> StorageResult<String>;

    /// Delete an object by key.
    ///
    /// Callers on user-facing paths invoke this fire-and-forget (spawned, not
    /// awaited): a failed delete leaves an orphaned-but-harmless object and is
    /// only logged.
    async fn delete_object(&self, key: &str) -> StorageResult<()>;

    /// Publicly accessible URL for a key: `{endpoint}/{bucket}/{key}`.
    fn public_url(&self, key: &str) -> String;

    /// Best-effort inverse of [`public_url`](Storage::public_url).
    ///
    /// Returns `None` on any URL this backend does not recognize; used only
    /// for non-critical cleanup, never on a required path.
    fn extract_key(&self, url: &str) -> Option<String>;
}
