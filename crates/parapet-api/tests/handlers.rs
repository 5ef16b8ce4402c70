//! Handler tests against in-memory storage and auth provider mocks.

use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use axum_test::TestServer;
use chrono::{Duration as ChronoDuration, Utc};
use parapet_api::setup::routes::setup_routes;
use parapet_api::state::{AppState, ENROLLMENT_TTL};
use parapet_core::config::Config;
use parapet_core::upload::FileUploadConfig;
use parapet_sessions::descriptor::SessionRecord;
use parapet_sessions::provider::{AuthProvider, AuthProviderError, TwoFactorSetup};
use parapet_storage::error::StorageResult;
use parapet_storage::Storage;
use serde_json::{json, Value};
use uuid::Uuid;

const TOKEN: &str = "sess-current";
const OTHER_TOKEN: &str = "sess-other";
const PASSWORD: &str = "hunter2";
const TOTP_CODE: &str = "123456";
const CHECKSUM: &str = "n4bQgYhMfWWaL+qgxVrQFaO/TxsrC4Is0V1sFbDwCgg=";

struct MockStorage {
    deleted: Mutex<Vec<String>>,
}

impl MockStorage {
    fn new() -> Self {
        Self {
            deleted: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Storage for MockStorage {
    async fn presigned_upload_url(
        &self,
        key: &str,
        _file_type: &str,
        _file_size: u64,
        _checksum: &str,
        _config: &FileUploadConfig,
        _expires_in: std::time::Duration,
        _public: bool,
    ) -> StorageResult<String> {
        Ok(format!("https://uploads.test/{key}?signature=mock"))
    }

    async fn presigned_download_url(
        &self,
        key: &str,
        _expires_in: std::time::Duration,
    ) -> StorageResult<String> {
        Ok(format!("https://downloads.test/{key}?signature=mock"))
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        self.deleted.lock().unwrap().push(key.to_string());
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("https://cdn.test/bucket/{key}")
    }

    fn extract_key(&self, url: &str) -> Option<String> {
        url.strip_prefix("https://cdn.test/bucket/")
            .map(|k| k.to_string())
    }
}

struct MockAuth {
    user_id: Uuid,
    avatar_url: Mutex<Option<String>>,
    revoked: Mutex<Vec<String>>,
    revoked_others: Mutex<bool>,
}

impl MockAuth {
    fn new() -> Self {
        Self {
            user_id: Uuid::new_v4(),
            avatar_url: Mutex::new(None),
            revoked: Mutex::new(Vec::new()),
            revoked_others: Mutex::new(false),
        }
    }

    fn record(&self, token: &str, agent: &str, minutes_ago: i64) -> SessionRecord {
        SessionRecord {
            id: Uuid::new_v4(),
            token: token.to_string(),
            user_id: self.user_id,
            ip_address: Some("203.0.113.7".to_string()),
            user_agent: Some(agent.to_string()),
            created_at: Utc::now() - ChronoDuration::minutes(minutes_ago),
            expires_at: Utc::now() + ChronoDuration::days(7),
        }
    }
}

#[async_trait]
impl AuthProvider for MockAuth {
    async fn get_session(&self, token: &str) -> Result<SessionRecord, AuthProviderError> {
        if token == TOKEN {
            Ok(self.record(TOKEN, "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36", 1))
        } else {
            Err(AuthProviderError::Unauthorized)
        }
    }

    async fn verify_password(&self, _token: &str, password: &str) -> Result<(), AuthProviderError> {
        if password == PASSWORD {
            Ok(())
        } else {
            Err(AuthProviderError::InvalidCredentials)
        }
    }

    async fn change_password(
        &self,
        _token: &str,
        current_password: &str,
        _new_password: &str,
        _revoke_other_sessions: bool,
    ) -> Result<(), AuthProviderError> {
        self.verify_password(_token, current_password).await
    }

    async fn enable_two_factor(
        &self,
        _token: &str,
        password: &str,
    ) -> Result<TwoFactorSetup, AuthProviderError> {
        if password != PASSWORD {
            return Err(AuthProviderError::InvalidCredentials);
        }
        Ok(TwoFactorSetup {
            totp_uri: "otpauth://totp/app:user?secret=ABC123".to_string(),
            backup_codes: vec!["aaaa-bbbb".to_string(), "cccc-dddd".to_string()],
        })
    }

    async fn verify_totp(&self, _token: &str, code: &str) -> Result<(), AuthProviderError> {
        if code == TOTP_CODE {
            Ok(())
        } else {
            Err(AuthProviderError::InvalidCredentials)
        }
    }

    async fn disable_two_factor(
        &self,
        _token: &str,
        password: &str,
    ) -> Result<(), AuthProviderError> {
        self.verify_password(_token, password).await
    }

    async fn backup_codes(
        &self,
        _token: &str,
        password: &str,
    ) -> Result<Vec<String>, AuthProviderError> {
        if password != PASSWORD {
            return Err(AuthProviderError::InvalidCredentials);
        }
        Ok(vec!["aaaa-bbbb".to_string(), "cccc-dddd".to_string()])
    }

    async fn set_avatar_url(
        &self,
        _token: &str,
        url: &str,
    ) -> Result<Option<String>, AuthProviderError> {
        let mut guard = self.avatar_url.lock().unwrap();
        let previous = guard.replace(url.to_string());
        Ok(previous.filter(|p| p != url))
    }

    async fn list_sessions(&self, _token: &str) -> Result<Vec<SessionRecord>, AuthProviderError> {
        Ok(vec![
            self.record(
                OTHER_TOKEN,
                "Mozilla/5.0 (iPhone; CPU iPhone OS 17_1 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Mobile/15E148 Safari/604.1",
                5,
            ),
            self.record(TOKEN, "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36", 60),
        ])
    }

    async fn revoke_session(
        &self,
        _token: &str,
        target_token: &str,
    ) -> Result<(), AuthProviderError> {
        self.revoked.lock().unwrap().push(target_token.to_string());
        Ok(())
    }

    async fn revoke_other_sessions(&self, _token: &str) -> Result<(), AuthProviderError> {
        *self.revoked_others.lock().unwrap() = true;
        Ok(())
    }
}

fn test_config() -> Config {
    Config {
        server_port: 0,
        environment: "test".to_string(),
        cors_origins: vec!["*".to_string()],
        s3_bucket: "bucket".to_string(),
        s3_region: "us-east-1".to_string(),
        s3_endpoint: None,
        presign_expiry_minutes: 3,
        auth_base_url: "http://auth.test".to_string(),
        avatar_max_file_size: 2 * 1024 * 1024,
        avatar_allowed_extensions: vec![
            "jpg".to_string(),
            "jpeg".to_string(),
            "png".to_string(),
            "webp".to_string(),
        ],
        avatar_allowed_content_types: vec![
            "image/jpeg".to_string(),
            "image/png".to_string(),
            "image/webp".to_string(),
        ],
    }
}

fn test_server() -> (TestServer, Arc<MockStorage>, Arc<MockAuth>) {
    let storage = Arc::new(MockStorage::new());
    let auth = Arc::new(MockAuth::new());
    let state = AppState::new(test_config(), storage.clone(), auth.clone())
        .expect("state should build from test config");
    let app = setup_routes(state).expect("routes should build");
    (
        TestServer::new(app).expect("test server"),
        storage,
        auth,
    )
}

#[tokio::test]
async fn test_upload_url_mints_key_under_user_namespace() {
    let (server, _storage, auth) = test_server();

    let response = server
        .post("/api/v0/profile/avatar/upload-url")
        .authorization_bearer(TOKEN)
        .json(&json!({
            "fileName": "me.PNG",
            "fileType": "image/png",
            "fileSize": 1024,
            "checksum": CHECKSUM,
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    let key = body["key"].as_str().unwrap();
    assert!(key.starts_with(&format!("public/avatars/{}/", auth.user_id)));
    assert!(key.ends_with(".png"));
    assert!(body["uploadUrl"]
        .as_str()
        .unwrap()
        .starts_with("https://uploads.test/"));
    assert_eq!(
        body["publicUrl"].as_str().unwrap(),
        format!("https://cdn.test/bucket/{key}")
    );
}

#[tokio::test]
async fn test_upload_url_rejects_disallowed_extension() {
    let (server, _storage, _auth) = test_server();

    let response = server
        .post("/api/v0/profile/avatar/upload-url")
        .authorization_bearer(TOKEN)
        .json(&json!({
            "fileName": "script.svg",
            "fileType": "image/png",
            "fileSize": 1024,
            "checksum": CHECKSUM,
        }))
        .await;

    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["code"], "INVALID_EXTENSION");
}

#[tokio::test]
async fn test_upload_url_rejects_malformed_checksum() {
    let (server, _storage, _auth) = test_server();

    let response = server
        .post("/api/v0/profile/avatar/upload-url")
        .authorization_bearer(TOKEN)
        .json(&json!({
            "fileName": "me.png",
            "fileType": "image/png",
            "fileSize": 1024,
            "checksum": "not-a-digest",
        }))
        .await;

    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["code"], "INVALID_CHECKSUM");
}

#[tokio::test]
async fn test_upload_url_rejects_oversize_file_with_413() {
    let (server, _storage, _auth) = test_server();

    let response = server
        .post("/api/v0/profile/avatar/upload-url")
        .authorization_bearer(TOKEN)
        .json(&json!({
            "fileName": "me.png",
            "fileType": "image/png",
            "fileSize": 10 * 1024 * 1024,
            "checksum": CHECKSUM,
        }))
        .await;

    response.assert_status(axum::http::StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_missing_bearer_token_is_unauthorized() {
    let (server, _storage, _auth) = test_server();

    let response = server.get("/api/v0/sessions").await;
    response.assert_status_unauthorized();
}

#[tokio::test]
async fn test_confirm_avatar_deletes_previous_object() {
    let (server, storage, _auth) = test_server();

    let first = server
        .put("/api/v0/profile/avatar")
        .authorization_bearer(TOKEN)
        .json(&json!({ "key": "public/avatars/u/one.png" }))
        .await;
    first.assert_status_ok();

    let second = server
        .put("/api/v0/profile/avatar")
        .authorization_bearer(TOKEN)
        .json(&json!({ "key": "public/avatars/u/two.png" }))
        .await;
    second.assert_status_ok();

    // The delete runs on a spawned task; give it a moment.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    let deleted = storage.deleted.lock().unwrap().clone();
    assert_eq!(deleted, vec!["public/avatars/u/one.png".to_string()]);
}

#[tokio::test]
async fn test_confirm_avatar_rejects_private_key() {
    let (server, _storage, _auth) = test_server();

    let response = server
        .put("/api/v0/profile/avatar")
        .authorization_bearer(TOKEN)
        .json(&json!({ "key": "private/avatars/u/one.png" }))
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn test_list_sessions_puts_current_device_first() {
    let (server, _storage, _auth) = test_server();

    let response = server
        .get("/api/v0/sessions")
        .authorization_bearer(TOKEN)
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    let sessions = body.as_array().unwrap();
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0]["isCurrentDevice"], true);
    assert_eq!(sessions[1]["isCurrentDevice"], false);
    assert_eq!(sessions[1]["browser"], "Safari");
    assert_eq!(sessions[1]["os"], "iOS");
}

#[tokio::test]
async fn test_revoke_session_and_others() {
    let (server, _storage, auth) = test_server();

    let response = server
        .delete(&format!("/api/v0/sessions/{OTHER_TOKEN}"))
        .authorization_bearer(TOKEN)
        .await;
    response.assert_status(axum::http::StatusCode::NO_CONTENT);
    assert_eq!(
        auth.revoked.lock().unwrap().clone(),
        vec![OTHER_TOKEN.to_string()]
    );

    let response = server
        .post("/api/v0/sessions/revoke-others")
        .authorization_bearer(TOKEN)
        .await;
    response.assert_status(axum::http::StatusCode::NO_CONTENT);
    assert!(*auth.revoked_others.lock().unwrap());
}

#[tokio::test]
async fn test_enrollment_full_flow() {
    let (server, _storage, _auth) = test_server();

    // Fresh session starts at step 1.
    let state = server
        .get("/api/v0/two-factor/enrollment")
        .authorization_bearer(TOKEN)
        .await;
    state.assert_status_ok();
    assert_eq!(state.json::<Value>()["step"], 1);

    let step2 = server
        .post("/api/v0/two-factor/enrollment/password")
        .authorization_bearer(TOKEN)
        .json(&json!({ "password": PASSWORD }))
        .await;
    step2.assert_status_ok();
    let body: Value = step2.json();
    assert_eq!(body["step"], 2);
    assert!(body["totpUri"].as_str().unwrap().starts_with("otpauth://"));
    assert!(body.get("backupCodes").is_none());

    let step3 = server
        .post("/api/v0/two-factor/enrollment/continue")
        .authorization_bearer(TOKEN)
        .await;
    step3.assert_status_ok();
    assert_eq!(step3.json::<Value>()["step"], 3);

    // Wrong code stays on step 3.
    let rejected = server
        .post("/api/v0/two-factor/enrollment/code")
        .authorization_bearer(TOKEN)
        .json(&json!({ "code": "000000" }))
        .await;
    rejected.assert_status_bad_request();

    let step4 = server
        .post("/api/v0/two-factor/enrollment/code")
        .authorization_bearer(TOKEN)
        .json(&json!({ "code": TOTP_CODE }))
        .await;
    step4.assert_status_ok();
    let body: Value = step4.json();
    assert_eq!(body["step"], 4);
    assert!(body.get("totpUri").is_none());
    assert_eq!(body["backupCodes"].as_array().unwrap().len(), 2);

    let closed = server
        .post("/api/v0/two-factor/enrollment/close")
        .authorization_bearer(TOKEN)
        .await;
    closed.assert_status_ok();
    assert_eq!(closed.json::<Value>()["refreshSession"], true);

    // Machine is gone; state reads as step 1 again.
    let state = server
        .get("/api/v0/two-factor/enrollment")
        .authorization_bearer(TOKEN)
        .await;
    assert_eq!(state.json::<Value>()["step"], 1);
}

#[tokio::test]
async fn test_enrollment_wrong_password_stays_on_step_one() {
    let (server, _storage, _auth) = test_server();

    let response = server
        .post("/api/v0/two-factor/enrollment/password")
        .authorization_bearer(TOKEN)
        .json(&json!({ "password": "wrong" }))
        .await;
    response.assert_status_bad_request();
    assert_eq!(response.json::<Value>()["error"], "Invalid password");

    let state = server
        .get("/api/v0/two-factor/enrollment")
        .authorization_bearer(TOKEN)
        .await;
    assert_eq!(state.json::<Value>()["step"], 1);
}

#[tokio::test]
async fn test_failed_password_attempts_leave_no_enrollment_state() {
    let storage = Arc::new(MockStorage::new());
    let auth = Arc::new(MockAuth::new());
    let state = AppState::new(test_config(), storage, auth).expect("state should build");
    let server = TestServer::new(setup_routes(state.clone()).expect("routes should build"))
        .expect("test server");

    // Rejected passwords must not accumulate machines in the map.
    for _ in 0..100 {
        server
            .post("/api/v0/two-factor/enrollment/password")
            .authorization_bearer(TOKEN)
            .json(&json!({ "password": "wrong" }))
            .await
            .assert_status_bad_request();
    }
    assert!(state.enrollments.lock().await.is_empty());

    // A successful attempt is retained, once.
    server
        .post("/api/v0/two-factor/enrollment/password")
        .authorization_bearer(TOKEN)
        .json(&json!({ "password": PASSWORD }))
        .await
        .assert_status_ok();
    assert_eq!(state.enrollments.lock().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stale_enrollments_are_swept() {
    let storage = Arc::new(MockStorage::new());
    let auth = Arc::new(MockAuth::new());
    let state = AppState::new(test_config(), storage, auth).expect("state should build");
    let server = TestServer::new(setup_routes(state.clone()).expect("routes should build"))
        .expect("test server");

    server
        .post("/api/v0/two-factor/enrollment/password")
        .authorization_bearer(TOKEN)
        .json(&json!({ "password": PASSWORD }))
        .await
        .assert_status_ok();
    assert_eq!(state.enrollments.lock().await.len(), 1);

    tokio::time::advance(ENROLLMENT_TTL + std::time::Duration::from_secs(1)).await;

    // The abandoned machine is gone on the next map access.
    let response = server
        .get("/api/v0/two-factor/enrollment")
        .authorization_bearer(TOKEN)
        .await;
    assert_eq!(response.json::<Value>()["step"], 1);
    assert!(state.enrollments.lock().await.is_empty());
}

#[tokio::test]
async fn test_enrollment_dismiss_mid_flow_resets() {
    let (server, _storage, _auth) = test_server();

    server
        .post("/api/v0/two-factor/enrollment/password")
        .authorization_bearer(TOKEN)
        .json(&json!({ "password": PASSWORD }))
        .await
        .assert_status_ok();

    let dismissed = server
        .post("/api/v0/two-factor/enrollment/dismiss")
        .authorization_bearer(TOKEN)
        .await;
    dismissed.assert_status_ok();
    assert_eq!(dismissed.json::<Value>()["step"], 1);
}

#[tokio::test]
async fn test_enrollment_continue_without_machine_conflicts() {
    let (server, _storage, _auth) = test_server();

    let response = server
        .post("/api/v0/two-factor/enrollment/continue")
        .authorization_bearer(TOKEN)
        .await;
    response.assert_status(axum::http::StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_backup_codes_gate() {
    let (server, _storage, _auth) = test_server();

    let response = server
        .post("/api/v0/two-factor/backup-codes")
        .authorization_bearer(TOKEN)
        .json(&json!({ "password": PASSWORD }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["backupCodes"].as_array().unwrap().len(), 2);

    let rejected = server
        .post("/api/v0/two-factor/backup-codes")
        .authorization_bearer(TOKEN)
        .json(&json!({ "password": "wrong" }))
        .await;
    rejected.assert_status_bad_request();
}

#[tokio::test]
async fn test_health_endpoint() {
    let (server, _storage, _auth) = test_server();

    let response = server.get("/health").await;
    response.assert_status_ok();
}
