//! Two-factor enrollment handlers
//!
//! Enrollment is a per-session state machine held server-side; each request
//! advances the caller's machine and returns the resulting view. The TOTP
//! secret is never persisted until the first code verifies, so abandoning a
//! machine mid-flow loses nothing.

use axum::{extract::State, http::StatusCode, Json};
use parapet_sessions::two_factor::{BackupCodesGate, Enrollment, EnrollmentError, EnrollmentState};
use serde::{Deserialize, Serialize};

use crate::auth::SessionToken;
use crate::error::ApiError;
use crate::state::{AppState, EnrollmentSlot};

/// What the client sees of the enrollment machine.
///
/// The TOTP URI is only exposed while the QR code is on screen (steps 2 and
/// 3); backup codes only once enrollment completed (step 4).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentView {
    pub step: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub totp_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_codes: Option<Vec<String>>,
}

impl EnrollmentView {
    fn from_state(state: &EnrollmentState) -> Self {
        match state {
            EnrollmentState::AwaitingPassword => EnrollmentView {
                step: 1,
                totp_uri: None,
                backup_codes: None,
            },
            EnrollmentState::AwaitingQrAck { totp_uri, .. }
            | EnrollmentState::AwaitingCode { totp_uri, .. } => EnrollmentView {
                step: state.step(),
                totp_uri: Some(totp_uri.clone()),
                backup_codes: None,
            },
            EnrollmentState::Completed { backup_codes } => EnrollmentView {
                step: 4,
                totp_uri: None,
                backup_codes: Some(backup_codes.clone()),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PasswordRequest {
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CodeRequest {
    pub code: String,
}

/// Current enrollment state. Step 1 when no machine exists yet.
#[tracing::instrument(skip(state, token), fields(operation = "enrollment_state"))]
pub async fn enrollment_state(
    State(state): State<AppState>,
    token: SessionToken,
) -> Result<Json<EnrollmentView>, ApiError> {
    let enrollments = state.lock_enrollments().await;
    let view = enrollments
        .get(token.as_str())
        .map(|slot| EnrollmentView::from_state(slot.machine.state()))
        .unwrap_or_else(|| EnrollmentView::from_state(&EnrollmentState::AwaitingPassword));
    Ok(Json(view))
}

/// Step 1: verify the password and receive the TOTP setup.
///
/// The machine is taken out of the map for the duration of the provider call
/// so the lock never spans a network round trip, and is only put back once it
/// has advanced past step 1. A rejected password therefore leaves no entry
/// behind; step 1 carries no state worth keeping.
#[tracing::instrument(skip(state, token, req), fields(operation = "enrollment_password"))]
pub async fn submit_password(
    State(state): State<AppState>,
    token: SessionToken,
    Json(req): Json<PasswordRequest>,
) -> Result<Json<EnrollmentView>, ApiError> {
    let mut slot = state
        .lock_enrollments()
        .await
        .remove(token.as_str())
        .unwrap_or_else(|| {
            EnrollmentSlot::new(Enrollment::new(state.auth.clone(), token.as_str()))
        });

    let result = slot.machine.submit_password(&req.password).await;
    let view = EnrollmentView::from_state(slot.machine.state());

    if !matches!(slot.machine.state(), EnrollmentState::AwaitingPassword) {
        state
            .lock_enrollments()
            .await
            .insert(token.as_str().to_string(), slot);
    }

    result?;
    Ok(Json(view))
}

/// Step 2 → 3: the QR code has been scanned.
#[tracing::instrument(skip(state, token), fields(operation = "enrollment_continue"))]
pub async fn acknowledge_qr(
    State(state): State<AppState>,
    token: SessionToken,
) -> Result<Json<EnrollmentView>, ApiError> {
    let mut enrollments = state.lock_enrollments().await;
    let slot = enrollments
        .get_mut(token.as_str())
        .ok_or(ApiError::Enrollment(EnrollmentError::InvalidStep))?;

    slot.machine.acknowledge_qr()?;
    Ok(Json(EnrollmentView::from_state(slot.machine.state())))
}

/// Step 3 → 2: back to the QR code, discarding the entered code.
#[tracing::instrument(skip(state, token), fields(operation = "enrollment_back"))]
pub async fn back_to_qr(
    State(state): State<AppState>,
    token: SessionToken,
) -> Result<Json<EnrollmentView>, ApiError> {
    let mut enrollments = state.lock_enrollments().await;
    let slot = enrollments
        .get_mut(token.as_str())
        .ok_or(ApiError::Enrollment(EnrollmentError::InvalidStep))?;

    slot.machine.back_to_qr()?;
    Ok(Json(EnrollmentView::from_state(slot.machine.state())))
}

/// Step 3: verify the TOTP code, completing enrollment on success.
///
/// Same take-out pattern as `submit_password`: the provider call runs with
/// the map unlocked. The machine goes back regardless of the outcome, since
/// step 3 retains the TOTP setup even after a rejected code.
#[tracing::instrument(skip(state, token, req), fields(operation = "enrollment_code"))]
pub async fn submit_code(
    State(state): State<AppState>,
    token: SessionToken,
    Json(req): Json<CodeRequest>,
) -> Result<Json<EnrollmentView>, ApiError> {
    let mut slot = state
        .lock_enrollments()
        .await
        .remove(token.as_str())
        .ok_or(ApiError::Enrollment(EnrollmentError::InvalidStep))?;

    let result = slot.machine.submit_code(&req.code).await;
    let view = EnrollmentView::from_state(slot.machine.state());

    state
        .lock_enrollments()
        .await
        .insert(token.as_str().to_string(), slot);

    result?;
    Ok(Json(view))
}

/// Dismiss the flow mid-enrollment. A no-op on the terminal step, which must
/// be closed explicitly so the backup codes are acknowledged.
#[tracing::instrument(skip(state, token), fields(operation = "enrollment_dismiss"))]
pub async fn dismiss(
    State(state): State<AppState>,
    token: SessionToken,
) -> Result<Json<EnrollmentView>, ApiError> {
    let mut enrollments = state.lock_enrollments().await;
    if let Some(slot) = enrollments.get_mut(token.as_str()) {
        slot.machine.dismiss();
        if matches!(slot.machine.state(), EnrollmentState::AwaitingPassword) {
            enrollments.remove(token.as_str());
            return Ok(Json(EnrollmentView::from_state(
                &EnrollmentState::AwaitingPassword,
            )));
        }
        return Ok(Json(EnrollmentView::from_state(slot.machine.state())));
    }
    Ok(Json(EnrollmentView::from_state(
        &EnrollmentState::AwaitingPassword,
    )))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseResponse {
    /// True when enrollment just completed and the client should refresh its
    /// session to pick up the two-factor flag.
    pub refresh_session: bool,
}

/// Close the flow from the terminal step.
#[tracing::instrument(skip(state, token), fields(operation = "enrollment_close"))]
pub async fn close(
    State(state): State<AppState>,
    token: SessionToken,
) -> Result<Json<CloseResponse>, ApiError> {
    let mut enrollments = state.lock_enrollments().await;
    let refresh_session = match enrollments.get_mut(token.as_str()) {
        Some(slot) => {
            let completed = slot.machine.close();
            // Close only tears the machine down from the terminal step;
            // mid-flow it is a no-op, matching the pure transition.
            if matches!(slot.machine.state(), EnrollmentState::AwaitingPassword) {
                enrollments.remove(token.as_str());
            }
            completed
        }
        None => false,
    };
    Ok(Json(CloseResponse { refresh_session }))
}

/// Disable two-factor, re-gated on the password.
#[tracing::instrument(skip(state, token, req), fields(operation = "two_factor_disable"))]
pub async fn disable(
    State(state): State<AppState>,
    token: SessionToken,
    Json(req): Json<PasswordRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .auth
        .disable_two_factor(token.as_str(), &req.password)
        .await?;

    // An abandoned enrollment machine is meaningless once 2FA is disabled.
    state.lock_enrollments().await.remove(token.as_str());

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupCodesResponse {
    pub backup_codes: Vec<String>,
}

/// View backup codes behind a one-shot password gate.
#[tracing::instrument(skip(state, token, req), fields(operation = "backup_codes"))]
pub async fn backup_codes(
    State(state): State<AppState>,
    token: SessionToken,
    Json(req): Json<PasswordRequest>,
) -> Result<Json<BackupCodesResponse>, ApiError> {
    let mut gate = BackupCodesGate::new();
    gate.unlock(state.auth.as_ref(), token.as_str(), &req.password)
        .await?;

    let codes = match &gate {
        BackupCodesGate::Viewing { codes } => codes.clone(),
        BackupCodesGate::Locked => Vec::new(),
    };
    gate.close();

    Ok(Json(BackupCodesResponse { backup_codes: codes }))
}
