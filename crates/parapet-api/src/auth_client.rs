//! HTTP-backed identity provider client
//!
//! Talks to the external auth service over its JSON API, forwarding the
//! caller's session token as a bearer credential. Error bodies use the
//! provider's `{ "code": ..., "message": ... }` shape; credential failures
//! (wrong password, bad TOTP code) map to `InvalidCredentials` so handlers
//! can surface them as field-level errors.

use async_trait::async_trait;
use parapet_sessions::descriptor::SessionRecord;
use parapet_sessions::provider::{AuthProvider, AuthProviderError, TwoFactorSetup};
use serde::Deserialize;

#[derive(Clone)]
pub struct HttpAuthProvider {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TwoFactorSetupBody {
    #[serde(rename = "totpURI")]
    totp_uri: String,
    #[serde(rename = "backupCodes")]
    backup_codes: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct BackupCodesBody {
    #[serde(rename = "backupCodes")]
    backup_codes: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct UserBody {
    #[serde(default)]
    image: Option<String>,
}

impl HttpAuthProvider {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Map a non-success response to a provider error, consuming the body.
    async fn error_from_response(resp: reqwest::Response) -> AuthProviderError {
        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return AuthProviderError::Unauthorized;
        }

        let body = resp.json::<ProviderErrorBody>().await.ok();
        let code = body.as_ref().and_then(|b| b.code.as_deref()).unwrap_or("");
        match code {
            "INVALID_PASSWORD" | "INVALID_CREDENTIALS" | "INVALID_TWO_FACTOR_CODE"
            | "INVALID_BACKUP_CODE" => AuthProviderError::InvalidCredentials,
            _ => {
                let message = body
                    .and_then(|b| b.message)
                    .unwrap_or_else(|| format!("unexpected status {status}"));
                AuthProviderError::Provider(message)
            }
        }
    }

    async fn send(
        &self,
        req: reqwest::RequestBuilder,
        token: &str,
    ) -> Result<reqwest::Response, AuthProviderError> {
        let resp = req
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AuthProviderError::Provider(e.to_string()))?;

        if resp.status().is_success() {
            Ok(resp)
        } else {
            Err(Self::error_from_response(resp).await)
        }
    }

    async fn post_json<B: serde::Serialize>(
        &self,
        path: &str,
        token: &str,
        body: &B,
    ) -> Result<reqwest::Response, AuthProviderError> {
        self.send(self.client.post(self.url(path)).json(body), token)
            .await
    }
}

#[async_trait]
impl AuthProvider for HttpAuthProvider {
    async fn get_session(&self, token: &str) -> Result<SessionRecord, AuthProviderError> {
        let resp = self.send(self.client.get(self.url("/session")), token).await?;
        resp.json::<SessionRecord>()
            .await
            .map_err(|e| AuthProviderError::Provider(e.to_string()))
    }

    async fn verify_password(
        &self,
        token: &str,
        password: &str,
    ) -> Result<(), AuthProviderError> {
        self.post_json(
            "/verify-password",
            token,
            &serde_json::json!({ "password": password }),
        )
        .await?;
        Ok(())
    }

    async fn change_password(
        &self,
        token: &str,
        current_password: &str,
        new_password: &str,
        revoke_other_sessions: bool,
    ) -> Result<(), AuthProviderError> {
        self.post_json(
            "/change-password",
            token,
            &serde_json::json!({
                "currentPassword": current_password,
                "newPassword": new_password,
                "revokeOtherSessions": revoke_other_sessions,
            }),
        )
        .await?;
        Ok(())
    }

    async fn enable_two_factor(
        &self,
        token: &str,
        password: &str,
    ) -> Result<TwoFactorSetup, AuthProviderError> {
        let resp = self
            .post_json(
                "/two-factor/enable",
                token,
                &serde_json::json!({ "password": password }),
            )
            .await?;
        let body = resp
            .json::<TwoFactorSetupBody>()
            .await
            .map_err(|e| AuthProviderError::Provider(e.to_string()))?;
        Ok(TwoFactorSetup {
            totp_uri: body.totp_uri,
            backup_codes: body.backup_codes,
        })
    }

    async fn verify_totp(&self, token: &str, code: &str) -> Result<(), AuthProviderError> {
        self.post_json(
            "/two-factor/verify-totp",
            token,
            &serde_json::json!({ "code": code }),
        )
        .await?;
        Ok(())
    }

    async fn disable_two_factor(
        &self,
        token: &str,
        password: &str,
    ) -> Result<(), AuthProviderError> {
        self.post_json(
            "/two-factor/disable",
            token,
            &serde_json::json!({ "password": password }),
        )
        .await?;
        Ok(())
    }

    async fn backup_codes(
        &self,
        token: &str,
        password: &str,
    ) -> Result<Vec<String>, AuthProviderError> {
        let resp = self
            .post_json(
                "/two-factor/backup-codes",
                token,
                &serde_json::json!({ "password": password }),
            )
            .await?;
        let body = resp
            .json::<BackupCodesBody>()
            .await
            .map_err(|e| AuthProviderError::Provider(e.to_string()))?;
        Ok(body.backup_codes)
    }

    async fn set_avatar_url(
        &self,
        token: &str,
        url: &str,
    ) -> Result<Option<String>, AuthProviderError> {
        // The provider echoes back the user record as it was before the
        // update, so the previous image URL can be cleaned up by the caller.
        let resp = self
            .post_json("/update-user", token, &serde_json::json!({ "image": url }))
            .await?;
        let previous = resp
            .json::<UserBody>()
            .await
            .map_err(|e| AuthProviderError::Provider(e.to_string()))?;
        Ok(previous.image.filter(|img| img != url))
    }

    async fn list_sessions(&self, token: &str) -> Result<Vec<SessionRecord>, AuthProviderError> {
        let resp = self
            .send(self.client.get(self.url("/list-sessions")), token)
            .await?;
        resp.json::<Vec<SessionRecord>>()
            .await
            .map_err(|e| AuthProviderError::Provider(e.to_string()))
    }

    async fn revoke_session(
        &self,
        token: &str,
        target_token: &str,
    ) -> Result<(), AuthProviderError> {
        self.post_json(
            "/revoke-session",
            token,
            &serde_json::json!({ "token": target_token }),
        )
        .await?;
        Ok(())
    }

    async fn revoke_other_sessions(&self, token: &str) -> Result<(), AuthProviderError> {
        self.post_json("/revoke-other-sessions", token, &serde_json::json!({}))
            .await?;
        Ok(())
    }
}
