//! Parapet Storage Library
//!
//! Object-storage key management and presigned-upload issuing.
//!
//! # Storage key format
//!
//! Keys are visibility-namespaced: `{visibility}[/{path}]/{uuid}.{extension}`,
//! where visibility is `public` or `private`. The `public/` prefix is a coarse
//! access-control signal; the UUID component prevents collisions and key
//! enumeration. Key generation and all upload validation are centralized in
//! the `keys` module; the S3 backend performs no validation of its own beyond
//! re-checking what it signs.

pub mod error;
pub mod keys;
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use error::{StorageError, StorageResult};
pub use keys::{
    file_visibility, generate_random_key, is_public_file, sanitize_path, validate_checksum,
    validate_file, Visibility,
};
pub use s3::S3Storage;
pub use traits::Storage;
