//! Account security handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;

use crate::auth::SessionToken;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    #[serde(default)]
    pub revoke_other_sessions: bool,
}

#[tracing::instrument(skip(state, token, req), fields(operation = "change_password"))]
pub async fn change_password(
    State(state): State<AppState>,
    token: SessionToken,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .auth
        .change_password(
            token.as_str(),
            &req.current_password,
            &req.new_password,
            req.revoke_other_sessions,
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
