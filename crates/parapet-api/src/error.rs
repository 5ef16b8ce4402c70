//! HTTP error response conversion
//!
//! Handlers return `Result<impl IntoResponse, ApiError>`; every error renders
//! as a JSON `ErrorResponse` with a machine-readable code. Validation failures
//! keep their user-facing messages; backing-store and provider failures render
//! generic messages (details are logged, never leaked).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use parapet_sessions::provider::AuthProviderError;
use parapet_sessions::two_factor::EnrollmentError;
use parapet_storage::StorageError;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Machine-readable error code for programmatic handling
    pub code: String,
}

/// API-layer error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Auth(#[from] AuthProviderError),

    #[error(transparent)]
    Enrollment(#[from] EnrollmentError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl ApiError {
    fn status_and_body(&self) -> (StatusCode, ErrorResponse) {
        match self {
            ApiError::Storage(err) => {
                let status = match err {
                    StorageError::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                    e if e.is_validation() => StatusCode::BAD_REQUEST,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (
                    status,
                    ErrorResponse {
                        error: err.to_string(),
                        code: err.code().to_string(),
                    },
                )
            }
            ApiError::Auth(err) => auth_status_and_body(err),
            ApiError::Enrollment(err) => match err {
                EnrollmentError::InvalidPassword => (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse {
                        error: err.to_string(),
                        code: "INVALID_PASSWORD".to_string(),
                    },
                ),
                EnrollmentError::CodeVerification => (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse {
                        error: err.to_string(),
                        code: "CODE_VERIFICATION_FAILED".to_string(),
                    },
                ),
                EnrollmentError::InvalidStep => (
                    StatusCode::CONFLICT,
                    ErrorResponse {
                        error: err.to_string(),
                        code: "INVALID_ENROLLMENT_STEP".to_string(),
                    },
                ),
                EnrollmentError::Provider(inner) => auth_status_and_body(inner),
            },
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: msg.clone(),
                    code: "BAD_REQUEST".to_string(),
                },
            ),
            ApiError::Unauthorized(msg) => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse {
                    error: msg.clone(),
                    code: "UNAUTHORIZED".to_string(),
                },
            ),
        }
    }
}

fn auth_status_and_body(err: &AuthProviderError) -> (StatusCode, ErrorResponse) {
    match err {
        AuthProviderError::InvalidCredentials => (
            StatusCode::BAD_REQUEST,
            ErrorResponse {
                error: "Invalid password".to_string(),
                code: "INVALID_CREDENTIALS".to_string(),
            },
        ),
        AuthProviderError::Unauthorized => (
            StatusCode::UNAUTHORIZED,
            ErrorResponse {
                error: "Unauthorized".to_string(),
                code: "UNAUTHORIZED".to_string(),
            },
        ),
        AuthProviderError::Provider(_) => (
            StatusCode::BAD_GATEWAY,
            ErrorResponse {
                error: "Authentication provider unavailable".to_string(),
                code: "AUTH_PROVIDER_ERROR".to_string(),
            },
        ),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();

        if status.is_server_error() {
            tracing::error!(status = %status, error = %self, "Request failed");
        } else {
            tracing::debug!(status = %status, error = %self, "Request rejected");
        }

        (status, Json(body)).into_response()
    }
}
