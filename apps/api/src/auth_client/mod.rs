//! Auth client: the single point of entry for calls to the hosted auth
//! service (GoTrue REST API under `{SUPABASE_URL}/auth/v1`).
//!
//! Calls are fire-once. A failed call is reported to the caller and never
//! retried.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("auth service rejected request (status {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("service role key is not configured")]
    AdminKeyMissing,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: Value,
    pub email_confirmed_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthSession {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub refresh_token: String,
    pub user: AuthUser,
}

/// Sign-up yields a session only when the project auto-confirms emails.
#[derive(Debug, Clone, PartialEq)]
pub struct SignUpResult {
    pub user: AuthUser,
    pub session: Option<AuthSession>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(AuthSession),
    User(AuthUser),
}

#[derive(Debug, Deserialize)]
struct GoTrueErrorBody {
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

impl GoTrueErrorBody {
    fn into_message(self) -> Option<String> {
        self.msg
            .or(self.message)
            .or(self.error_description)
            .or(self.error)
    }
}

#[derive(Serialize)]
struct SignUpRequest<'a> {
    email: &'a str,
    password: &'a str,
    data: &'a Value,
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RefreshGrant<'a> {
    refresh_token: &'a str,
}

/// Operations the portal needs from the external auth service.
///
/// Carried in `AppState` as `Arc<dyn AuthProvider>`.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &Value,
    ) -> Result<SignUpResult, AuthError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;

    async fn refresh(&self, refresh_token: &str) -> Result<AuthSession, AuthError>;

    /// Resolves an access token to its user.
    async fn get_user(&self, access_token: &str) -> Result<AuthUser, AuthError>;

    /// Admin-only: removes an auth user. Requires the service role key.
    async fn delete_user(&self, user_id: Uuid) -> Result<(), AuthError>;
}

#[derive(Clone)]
pub struct GoTrueClient {
    client: Client,
    base_url: String,
    anon_key: String,
    service_role_key: Option<String>,
}

impl GoTrueClient {
    pub fn new(
        project_url: &str,
        anon_key: String,
        service_role_key: Option<String>,
    ) -> Result<Self, AuthError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()?,
            base_url: format!("{}/auth/v1", project_url.trim_end_matches('/')),
            anon_key,
            service_role_key,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn public(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header("apikey", &self.anon_key)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, AuthError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<GoTrueErrorBody>(&body)
            .ok()
            .and_then(GoTrueErrorBody::into_message)
            .unwrap_or(body);
        Err(AuthError::Rejected {
            status: status.as_u16(),
            message,
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, AuthError> {
        let response = self.send(request).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(AuthError::Parse)
    }
}

#[async_trait]
impl AuthProvider for GoTrueClient {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &Value,
    ) -> Result<SignUpResult, AuthError> {
        let request = self
            .public(self.client.post(self.url("/signup")))
            .json(&SignUpRequest {
                email,
                password,
                data: metadata,
            });
        let result = match self.send_json::<SignUpResponse>(request).await? {
            SignUpResponse::Session(session) => SignUpResult {
                user: session.user.clone(),
                session: Some(session),
            },
            SignUpResponse::User(user) => SignUpResult {
                user,
                session: None,
            },
        };
        debug!(
            "Auth sign-up succeeded for {} (session issued: {})",
            result.user.id,
            result.session.is_some()
        );
        Ok(result)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let request = self
            .public(self.client.post(self.url("/token")))
            .query(&[("grant_type", "password")])
            .json(&PasswordGrant { email, password });
        self.send_json(request).await
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let request = self
            .public(self.client.post(self.url("/logout")))
            .bearer_auth(access_token);
        self.send(request).await?;
        Ok(())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AuthSession, AuthError> {
        let request = self
            .public(self.client.post(self.url("/token")))
            .query(&[("grant_type", "refresh_token")])
            .json(&RefreshGrant { refresh_token });
        self.send_json(request).await
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, AuthError> {
        let request = self
            .public(self.client.get(self.url("/user")))
            .bearer_auth(access_token);
        self.send_json(request).await
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<(), AuthError> {
        let key = self
            .service_role_key
            .as_deref()
            .ok_or(AuthError::AdminKeyMissing)?;
        let request = self
            .client
            .delete(self.url(&format!("/admin/users/{user_id}")))
            .header("apikey", key)
            .bearer_auth(key);
        self.send(request).await?;
        Ok(())
    }
}
