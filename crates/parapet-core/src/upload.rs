//! Upload policy configuration
//!
//! A `FileUploadConfig` describes one accepted class of uploads: the maximum
//! byte size plus the extension and MIME allow-lists. It is validated at
//! construction so call sites never have to re-check its shape.

use std::collections::HashSet;

/// Errors raised when constructing an invalid upload policy
#[derive(Debug, thiserror::Error)]
pub enum UploadConfigError {
    #[error("max_size must be greater than zero")]
    ZeroMaxSize,

    #[error("accepted extensions list must not be empty")]
    EmptyExtensions,

    #[error("accepted MIME types list must not be empty")]
    EmptyMimeTypes,
}

/// Configuration for one accepted file class (e.g. avatar images).
///
/// Extensions and MIME types are stored lowercase; lookups are case-insensitive.
/// Static after construction, never mutated at runtime.
#[derive(Debug, Clone)]
pub struct FileUploadConfig {
    max_size: u64,
    accepted_extensions: HashSet<String>,
    accepted_mime: HashSet<String>,
}

impl FileUploadConfig {
    pub fn new(
        max_size: u64,
        accepted_extensions: impl IntoIterator<Item = String>,
        accepted_mime: impl IntoIterator<Item = String>,
    ) -> Result<Self, UploadConfigError> {
        if max_size == 0 {
            return Err(UploadConfigError::ZeroMaxSize);
        }

        let accepted_extensions: HashSet<String> = accepted_extensions
            .into_iter()
            .map(|e| e.trim().trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        if accepted_extensions.is_empty() {
            return Err(UploadConfigError::EmptyExtensions);
        }

        let accepted_mime: HashSet<String> = accepted_mime
            .into_iter()
            .map(|m| m.trim().to_lowercase())
            .filter(|m| !m.is_empty())
            .collect();
        if accepted_mime.is_empty() {
            return Err(UploadConfigError::EmptyMimeTypes);
        }

        Ok(Self {
            max_size,
            accepted_extensions,
            accepted_mime,
        })
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    /// Maximum size in megabytes, used for user-facing limit messages.
    pub fn max_size_mb(&self) -> f64 {
        self.max_size as f64 / (1024.0 * 1024.0)
    }

    pub fn accepts_extension(&self, extension: &str) -> bool {
        self.accepted_extensions.contains(&extension.to_lowercase())
    }

    pub fn accepts_mime(&self, mime: &str) -> bool {
        self.accepted_mime.contains(&mime.to_lowercase())
    }

    pub fn accepted_extensions(&self) -> impl Iterator<Item = &str> {
        self.accepted_extensions.iter().map(String::as_str)
    }

    pub fn accepted_mime(&self) -> impl Iterator<Item = &str> {
        self.accepted_mime.iter().map(String::as_str)
    }
}
