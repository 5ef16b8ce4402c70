//! Session token extraction
//!
//! Every protected endpoint identifies the caller by the opaque session token
//! in the `Authorization: Bearer <token>` header. The token is never decoded
//! here; it is passed through to the auth provider for verification.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::ApiError;

/// Bearer token lifted from the Authorization header.
#[derive(Debug, Clone)]
pub struct SessionToken(pub String);

impl SessionToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<S> FromRequestParts<S> for SessionToken
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("missing Authorization header".to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::Unauthorized("expected Bearer token".to_string()))?
            .trim();

        if token.is_empty() {
            return Err(ApiError::Unauthorized("empty bearer token".to_string()));
        }

        Ok(SessionToken(token.to_string()))
    }
}
