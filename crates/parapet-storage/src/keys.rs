//! Object key generation and upload validation
//!
//! Keys have the shape `{visibility}[/{path}]/{uuid}.{extension}`. The
//! visibility prefix (`public/` or `private/`) is a coarse access-control
//! signal, the optional path is caller-supplied and sanitized here, and the
//! v4 UUID makes keys collision-resistant and non-enumerable.

use parapet_core::FileUploadConfig;
use uuid::Uuid;

use crate::error::{StorageError, StorageResult};

/// Fixed length of a base64-encoded SHA-256 digest.
const SHA256_BASE64_LEN: usize = 44;

/// Visibility namespace of an object key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn allowed_extensions(config: &FileUploadConfig) -> String {
    let mut list: Vec<&str> = config.accepted_extensions().collect();
    list.sort_unstable();
    list.join(", ")
}

fn allowed_mime(config: &FileUploadConfig) -> String {
    let mut list: Vec<&str> = config.accepted_mime().collect();
    list.sort_unstable();
    list.join(", ")
}

/// Validate the filename's extension against the allow-list.
///
/// Returns the lowercased extension on success.
pub fn validate_extension(filename: &str, config: &FileUploadConfig) -> StorageResult<String> {
    let extension = filename
        .rsplit_once('.')
        .map(|(stem, ext)| (stem, ext.to_lowercase()))
        .filter(|(stem, ext)| !stem.is_empty() && !ext.is_empty())
        .map(|(_, ext)| ext)
        .ok_or_else(|| StorageError::InvalidExtension {
            extension: String::new(),
            allowed: allowed_extensions(config),
        })?;

    if !config.accepts_extension(&extension) {
        return Err(StorageError::InvalidExtension {
            extension,
            allowed: allowed_extensions(config),
        });
    }

    Ok(extension)
}

/// Validate a MIME type against the allow-list.
pub fn validate_mime_type(mime: &str, config: &FileUploadConfig) -> StorageResult<()> {
    if !config.accepts_mime(mime) {
        return Err(StorageError::InvalidMimeType {
            mime: mime.to_string(),
            allowed: allowed_mime(config),
        });
    }
    Ok(())
}

/// Validate a file size against the configured limit.
pub fn validate_file_size(size: u64, config: &FileUploadConfig) -> StorageResult<()> {
    if size == 0 {
        return Err(StorageError::InvalidFileSize { size });
    }
    if size > config.max_size() {
        return Err(StorageError::FileTooLarge {
            limit_mb: config.max_size_mb(),
        });
    }
    Ok(())
}

/// Validate uploaded file metadata: extension, then MIME type, then size.
///
/// Checks short-circuit at the first failure, in that order.
pub fn validate_file(
    filename: &str,
    mime_type: &str,
    file_size: u64,
    config: &FileUploadConfig,
) -> StorageResult<()> {
    validate_extension(filename, config)?;
    validate_mime_type(mime_type, config)?;
    validate_file_size(file_size, config)?;
    Ok(())
}

/// Sanitize a caller-supplied key path segment.
///
/// Trims whitespace, strips leading/trailing slashes, collapses repeated
/// slashes, and rejects traversal sequences and any character outside
/// `[a-zA-Z0-9-_/]`. Empty input sanitizes to an empty string.
pub fn sanitize_path(path: &str) -> StorageResult<String> {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        return Ok(String::new());
    }

    if trimmed.contains("..") {
        return Err(StorageError::InvalidPath {
            reason: "path traversal detected",
        });
    }

    let mut collapsed = String::with_capacity(trimmed.len());
    let mut prev_slash = false;
    for c in trimmed.chars() {
        if c == '/' {
            if !prev_slash {
                collapsed.push(c);
            }
            prev_slash = true;
        } else {
            collapsed.push(c);
            prev_slash = false;
        }
    }

    let valid = collapsed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '/'));
    if !valid {
        return Err(StorageError::InvalidPath {
            reason: "contains invalid characters",
        });
    }

    Ok(collapsed)
}

/// Generate a collision-resistant object key.
///
/// The extension is validated against the allow-list and the path is
/// sanitized; the UUID component makes two calls with identical arguments
/// produce distinct keys.
pub fn generate_random_key(
    filename: &str,
    visibility: Visibility,
    path: Option<&str>,
    config: &FileUploadConfig,
) -> StorageResult<String> {
    let extension = validate_extension(filename, config)?;
    let path = sanitize_path(path.unwrap_or_default())?;
    let id = Uuid::new_v4();

    if path.is_empty() {
        Ok(format!("{}/{}.{}", visibility, id, extension))
    } else {
        Ok(format!("{}/{}/{}.{}", visibility, path, id, extension))
    }
}

/// Validate an upload checksum: a base64-encoded SHA-256 digest is always
/// exactly 44 characters.
pub fn validate_checksum(checksum: &str) -> StorageResult<()> {
    if checksum.len() != SHA256_BASE64_LEN {
        return Err(StorageError::InvalidChecksum);
    }
    Ok(())
}

/// A key is public iff it lives under the `public/` namespace.
pub fn is_public_file(key: &str) -> bool {
    key.starts_with("public/")
}

pub fn file_visibility(key: &str) -> Visibility {
    if is_public_file(key) {
        Visibility::Public
    } else {
        Visibility::Private
    }
}
