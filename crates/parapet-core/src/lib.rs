//! Parapet Core Library
//!
//! This crate provides configuration and shared upload policy types used by the
//! storage and API crates.

pub mod config;
pub mod upload;

// Re-export commonly used types
pub use config::Config;
pub use upload::{FileUploadConfig, UploadConfigError};
