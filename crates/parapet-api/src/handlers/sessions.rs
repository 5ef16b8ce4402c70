//! Session listing and revocation handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use parapet_sessions::descriptor::{parse_session, sort_sessions, ParsedSession};

use crate::auth::SessionToken;
use crate::error::ApiError;
use crate::state::AppState;

/// List the caller's sessions as display descriptors, current device first.
#[tracing::instrument(skip(state, token), fields(operation = "list_sessions"))]
pub async fn list(
    State(state): State<AppState>,
    token: SessionToken,
) -> Result<Json<Vec<ParsedSession>>, ApiError> {
    let records = state.auth.list_sessions(token.as_str()).await?;

    let mut parsed: Vec<ParsedSession> = records
        .iter()
        .map(|record| parse_session(record, Some(token.as_str())))
        .collect();
    sort_sessions(&mut parsed);

    Ok(Json(parsed))
}

/// Revoke a single session by its token.
#[tracing::instrument(skip(state, token, target_token), fields(operation = "revoke_session"))]
pub async fn revoke(
    State(state): State<AppState>,
    token: SessionToken,
    Path(target_token): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .auth
        .revoke_session(token.as_str(), &target_token)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Revoke every session except the caller's.
#[tracing::instrument(skip(state, token), fields(operation = "revoke_other_sessions"))]
pub async fn revoke_others(
    State(state): State<AppState>,
    token: SessionToken,
) -> Result<StatusCode, ApiError> {
    state.auth.revoke_other_sessions(token.as_str()).await?;
    Ok(StatusCode::NO_CONTENT)
}
