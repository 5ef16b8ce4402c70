//! Route configuration and setup

use axum::{
    http::{HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

const API_PREFIX: &str = "/api/v0";

/// Request bodies are small JSON documents; file bytes never pass through
/// this server (uploads go straight to object storage).
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Setup all application routes
pub fn setup_routes(state: AppState) -> Result<Router, anyhow::Error> {
    let cors = setup_cors(&state)?;

    let api = Router::new()
        .route("/profile/avatar/upload-url", post(handlers::avatar::upload_url))
        .route("/profile/avatar", put(handlers::avatar::confirm))
        .route("/account/change-password", post(handlers::account::change_password))
        .route("/sessions", get(handlers::sessions::list))
        .route("/sessions/revoke-others", post(handlers::sessions::revoke_others))
        .route("/sessions/{token}", delete(handlers::sessions::revoke))
        .route("/two-factor/enrollment", get(handlers::two_factor::enrollment_state))
        .route(
            "/two-factor/enrollment/password",
            post(handlers::two_factor::submit_password),
        )
        .route(
            "/two-factor/enrollment/continue",
            post(handlers::two_factor::acknowledge_qr),
        )
        .route("/two-factor/enrollment/back", post(handlers::two_factor::back_to_qr))
        .route("/two-factor/enrollment/code", post(handlers::two_factor::submit_code))
        .route("/two-factor/enrollment/dismiss", post(handlers::two_factor::dismiss))
        .route("/two-factor/enrollment/close", post(handlers::two_factor::close))
        .route("/two-factor/disable", post(handlers::two_factor::disable))
        .route("/two-factor/backup-codes", post(handlers::two_factor::backup_codes));

    let app = Router::new()
        .route("/health", get(health))
        .nest(API_PREFIX, api)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(cors);

    Ok(app)
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

fn setup_cors(state: &AppState) -> Result<CorsLayer, anyhow::Error> {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    if state.config.cors_origins.iter().any(|o| o == "*") {
        Ok(cors.allow_origin(Any))
    } else {
        let origins = state
            .config
            .cors_origins
            .iter()
            .map(|origin| {
                origin
                    .parse::<HeaderValue>()
                    .map_err(|_| anyhow::anyhow!("invalid CORS origin: {origin}"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(cors.allow_origin(origins))
    }
}
