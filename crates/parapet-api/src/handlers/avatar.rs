//! Avatar upload handlers
//!
//! Uploads go directly from the browser to object storage: the client asks
//! for a presigned PUT URL, uploads the file itself, then confirms the new
//! key so the profile can be updated and the old avatar cleaned up.

use std::time::Duration;

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use parapet_storage::keys::{self, Visibility};
use serde::{Deserialize, Serialize};

use crate::auth::SessionToken;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlRequest {
    pub file_name: String,
    pub file_type: String,
    pub file_size: u64,
    /// Base64-encoded SHA-256 digest of the file contents.
    pub checksum: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlResponse {
    pub upload_url: String,
    pub key: String,
    pub public_url: String,
    pub expires_at: chrono::DateTime<Utc>,
}

/// Issue a presigned PUT URL for a new avatar.
///
/// The key is minted under `public/avatars/{user_id}` so stale avatars are
/// attributable, and the grant is bound to the declared content type, length,
/// and checksum.
#[tracing::instrument(skip(state, token, req), fields(operation = "avatar_upload_url"))]
pub async fn upload_url(
    State(state): State<AppState>,
    token: SessionToken,
    Json(req): Json<UploadUrlRequest>,
) -> Result<Json<UploadUrlResponse>, ApiError> {
    let session = state.auth.get_session(token.as_str()).await?;

    keys::validate_file(&req.file_name, &req.file_type, req.file_size, &state.avatar_config)?;
    keys::validate_checksum(&req.checksum)?;

    let path = format!("avatars/{}", session.user_id);
    let key = keys::generate_random_key(
        &req.file_name,
        Visibility::Public,
        Some(&path),
        &state.avatar_config,
    )?;

    let expires_in = Duration::from_secs(state.config.presign_expiry_minutes * 60);
    let upload_url = state
        .storage
        .presigned_upload_url(
            &key,
            &req.file_type,
            req.file_size,
            &req.checksum,
            &state.avatar_config,
            expires_in,
            true,
        )
        .await?;

    let expires_at = Utc::now() + chrono::Duration::seconds(expires_in.as_secs() as i64);

    tracing::debug!(key = %key, user_id = %session.user_id, "Issued avatar upload URL");

    Ok(Json(UploadUrlResponse {
        upload_url,
        public_url: state.storage.public_url(&key),
        key,
        expires_at,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ConfirmAvatarRequest {
    /// The object key returned by the upload-url endpoint.
    pub key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmAvatarResponse {
    pub avatar_url: String,
}

/// Point the caller's profile at the freshly uploaded avatar.
///
/// If a previous avatar existed and its URL maps back onto one of our keys,
/// the old object is deleted in the background; a failed delete only leaves
/// an orphaned object and is logged, never surfaced.
#[tracing::instrument(skip(state, token, req), fields(operation = "avatar_confirm"))]
pub async fn confirm(
    State(state): State<AppState>,
    token: SessionToken,
    Json(req): Json<ConfirmAvatarRequest>,
) -> Result<(StatusCode, Json<ConfirmAvatarResponse>), ApiError> {
    if !keys::is_public_file(&req.key) {
        return Err(ApiError::BadRequest("avatar key must be public".to_string()));
    }

    let avatar_url = state.storage.public_url(&req.key);
    let previous = state.auth.set_avatar_url(token.as_str(), &avatar_url).await?;

    if let Some(previous_url) = previous {
        if let Some(old_key) = state.storage.extract_key(&previous_url) {
            let storage = state.storage.clone();
            tokio::spawn(async move {
                if let Err(err) = storage.delete_object(&old_key).await {
                    tracing::warn!(key = %old_key, error = %err, "Failed to delete previous avatar");
                }
            });
        } else {
            tracing::debug!(url = %previous_url, "Previous avatar URL not ours, skipping delete");
        }
    }

    Ok((StatusCode::OK, Json(ConfirmAvatarResponse { avatar_url })))
}
