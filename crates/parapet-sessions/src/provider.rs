//! External identity/session provider interface
//!
//! The authentication protocol itself is delegated to an external provider;
//! this trait models that collaborator as a set of opaque async calls, scoped
//! by the caller's session token. Implementations live outside this crate
//! (the API crate ships an HTTP-backed one; tests use mocks).

use async_trait::async_trait;
use thiserror::Error;

use crate::descriptor::SessionRecord;

/// Errors surfaced by the identity provider.
#[derive(Debug, Error)]
pub enum AuthProviderError {
    /// Wrong password or TOTP code; surfaced as a field-level error.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The session token is missing, expired, or revoked.
    #[error("unauthorized")]
    Unauthorized,

    /// Any other provider-side failure.
    #[error("auth provider error: {0}")]
    Provider(String),
}

/// TOTP material returned when two-factor enrollment begins.
///
/// The backing secret is persisted by the provider only once the first code
/// is verified; until then this is throwaway client state.
#[derive(Debug, Clone)]
pub struct TwoFactorSetup {
    pub totp_uri: String,
    pub backup_codes: Vec<String>,
}

/// The external identity/session collaborator.
///
/// Every call is scoped by `token`, the caller's active session token.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Resolve the caller's own session.
    async fn get_session(&self, token: &str) -> Result<SessionRecord, AuthProviderError>;

    /// Re-verify the caller's password (used as a gate for sensitive views).
    async fn verify_password(&self, token: &str, password: &str)
        -> Result<(), AuthProviderError>;

    async fn change_password(
        &self,
        token: &str,
        current_password: &str,
        new_password: &str,
        revoke_other_sessions: bool,
    ) -> Result<(), AuthProviderError>;

    /// Begin two-factor enrollment; returns the TOTP URI and backup codes.
    async fn enable_two_factor(
        &self,
        token: &str,
        password: &str,
    ) -> Result<TwoFactorSetup, AuthProviderError>;

    /// Verify a TOTP code, completing enrollment on first success.
    async fn verify_totp(&self, token: &str, code: &str) -> Result<(), AuthProviderError>;

    async fn disable_two_factor(
        &self,
        token: &str,
        password: &str,
    ) -> Result<(), AuthProviderError>;

    /// Fetch backup codes, re-gated on the password.
    async fn backup_codes(
        &self,
        token: &str,
        password: &str,
    ) -> Result<Vec<String>, AuthProviderError>;

    /// Persist the user's avatar URL on their profile, returning the previous
    /// value if one was set.
    async fn set_avatar_url(
        &self,
        token: &str,
        url: &str,
    ) -> Result<Option<String>, AuthProviderError>;

    async fn list_sessions(&self, token: &str) -> Result<Vec<SessionRecord>, AuthProviderError>;

    /// Revoke one session by its token.
    async fn revoke_session(
        &self,
        token: &str,
        target_token: &str,
    ) -> Result<(), AuthProviderError>;

    /// Revoke every session except the caller's.
    async fn revoke_other_sessions(&self, token: &str) -> Result<(), AuthProviderError>;
}
