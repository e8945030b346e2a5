use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::api::http::{HttpClient, HttpResponse, ReqwestHttpClient};
use crate::auth::session::User;
use crate::error::AuthError;

// Minimum lengths enforced before a registration request is issued
const MIN_USERNAME_LEN: usize = 3;
const MIN_PASSWORD_LEN: usize = 6;

/// Successful login/registration payload
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    /// Human-readable confirmation from the server
    #[serde(default)]
    pub message: String,
    /// The authenticated account
    pub user: User,
    /// Opaque bearer token proving the session
    pub token: String,
}

/// Successful profile payload
#[derive(Debug, Deserialize)]
struct ProfileResponse {
    user: User,
}

/// Failure payload shape shared by all endpoints
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Client for the remote authentication endpoints. Every call is a single
/// attempt; failures surface to the caller and are never retried here.
pub struct AuthApi {
    /// Base URL of the service, without a trailing slash
    base_url: String,
    /// Pluggable transport, mockable in tests
    http: Arc<dyn HttpClient>,
}

impl AuthApi {
    /// Create a client for the given base URL using the default transport
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http_client(base_url, Arc::new(ReqwestHttpClient::new()))
    }

    /// Create a client with a custom transport
    pub fn with_http_client(base_url: impl Into<String>, http: Arc<dyn HttpClient>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url, http }
    }

    /// Get the configured base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sign in with an existing account.
    ///
    /// `POST /api/auth/login` with `{email, password}`.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, AuthError> {
        validate_login(email, password)?;

        let body = json!({ "email": email, "password": password }).to_string();
        let response = self
            .http
            .post(&self.url("/api/auth/login"), json_headers(), body)
            .await
            .map_err(AuthError::network)?;

        debug!(status = response.status(), "Login response received");
        Self::parse_auth_response(&response, "Login failed")
    }

    /// Create a new account.
    ///
    /// `POST /api/auth/register` with `{username, email, password}`.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthResponse, AuthError> {
        validate_registration(username, email, password)?;

        let body = json!({
            "username": username,
            "email": email,
            "password": password,
        })
        .to_string();
        let response = self
            .http
            .post(&self.url("/api/auth/register"), json_headers(), body)
            .await
            .map_err(AuthError::network)?;

        debug!(status = response.status(), "Registration response received");
        Self::parse_auth_response(&response, "Registration failed")
    }

    /// Fetch the profile belonging to a bearer token. Used to validate a
    /// persisted session and to refresh the cached user record.
    ///
    /// `GET /api/user/profile` with `Authorization: Bearer <token>`.
    pub async fn fetch_profile(&self, token: &str) -> Result<User, AuthError> {
        let mut headers = HashMap::new();
        headers.insert("Authorization".to_string(), format!("Bearer {token}"));

        let response = self
            .http
            .get(&self.url("/api/user/profile"), headers)
            .await
            .map_err(AuthError::network)?;

        debug!(status = response.status(), "Profile response received");
        if !response.is_success() {
            return Err(Self::failure(&response, "Failed to fetch profile"));
        }

        let profile: ProfileResponse = response.json().map_err(AuthError::InvalidPayload)?;
        Ok(profile.user)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn parse_auth_response(
        response: &HttpResponse,
        fallback: &str,
    ) -> Result<AuthResponse, AuthError> {
        if !response.is_success() {
            return Err(Self::failure(response, fallback));
        }
        response.json().map_err(AuthError::InvalidPayload)
    }

    /// Turn a failure response into an error, preferring the server's own
    /// `error` message over the per-operation fallback.
    fn failure(response: &HttpResponse, fallback: &str) -> AuthError {
        let message = response
            .json::<ErrorBody>()
            .map(|body| body.error)
            .unwrap_or_else(|_| fallback.to_string());
        AuthError::Server {
            status: response.status(),
            message,
        }
    }
}

fn json_headers() -> HashMap<String, String> {
    let mut headers = HashMap::new();
    headers.insert("Content-Type".to_string(), "application/json".to_string());
    headers
}

/// Check login form input before any request is issued
pub fn validate_login(email: &str, password: &str) -> Result<(), AuthError> {
    if !is_well_formed_email(email) {
        return Err(AuthError::validation("email", "Enter a valid email address"));
    }
    if password.is_empty() {
        return Err(AuthError::validation("password", "Password is required"));
    }
    Ok(())
}

/// Check registration form input before any request is issued
pub fn validate_registration(
    username: &str,
    email: &str,
    password: &str,
) -> Result<(), AuthError> {
    if username.chars().count() < MIN_USERNAME_LEN {
        return Err(AuthError::validation(
            "username",
            format!("Username must be at least {MIN_USERNAME_LEN} characters"),
        ));
    }
    if !is_well_formed_email(email) {
        return Err(AuthError::validation("email", "Enter a valid email address"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::validation(
            "password",
            format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }
    Ok(())
}

// Shallow shape check only; the server remains the authority on addresses.
fn is_well_formed_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.contains(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::http::mock::MockHttpClient;
    use crate::error::ErrorCode;

    const BASE: &str = "http://api.test";

    fn api_with_mock() -> (AuthApi, Arc<MockHttpClient>) {
        let mock = Arc::new(MockHttpClient::new());
        let api = AuthApi::with_http_client(BASE, Arc::clone(&mock) as Arc<dyn HttpClient>);
        (api, mock)
    }

    fn auth_body(token: &str) -> serde_json::Value {
        serde_json::json!({
            "message": "ok",
            "user": { "id": 1, "username": "ann", "email": "ann@x.com" },
            "token": token,
        })
    }

    #[tokio::test]
    async fn login_returns_user_and_token() {
        let (api, mock) = api_with_mock();
        mock.mock_json(format!("{BASE}/api/auth/login"), 200, &auth_body("tok-1"));

        let response = api.login("ann@x.com", "secret").await.unwrap();
        assert_eq!(response.token, "tok-1");
        assert_eq!(response.user.username, "ann");
    }

    #[tokio::test]
    async fn login_failure_uses_server_error_message() {
        let (api, mock) = api_with_mock();
        mock.mock_json(
            format!("{BASE}/api/auth/login"),
            401,
            &serde_json::json!({ "error": "Invalid credentials" }),
        );

        let err = api.login("ann@x.com", "wrong").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid credentials");
        assert_eq!(err.code(), ErrorCode::ServerRejected);
    }

    #[tokio::test]
    async fn login_failure_without_error_body_falls_back() {
        let (api, mock) = api_with_mock();
        mock.mock_response(format!("{BASE}/api/auth/login"), 500, "boom");

        let err = api.login("ann@x.com", "secret").await.unwrap_err();
        assert_eq!(err.to_string(), "Login failed");
    }

    #[tokio::test]
    async fn register_failure_falls_back_to_registration_message() {
        let (api, mock) = api_with_mock();
        mock.mock_response(format!("{BASE}/api/auth/register"), 500, "boom");

        let err = api.register("ann", "ann@x.com", "secret").await.unwrap_err();
        assert_eq!(err.to_string(), "Registration failed");
    }

    #[tokio::test]
    async fn fetch_profile_parses_user() {
        let (api, mock) = api_with_mock();
        mock.mock_json(
            format!("{BASE}/api/user/profile"),
            200,
            &serde_json::json!({ "user": { "id": 7, "username": "bob", "email": "bob@x.com" } }),
        );

        let user = api.fetch_profile("tok-7").await.unwrap();
        assert_eq!(user.id, 7);
        assert_eq!(user.email, "bob@x.com");
    }

    #[tokio::test]
    async fn malformed_success_body_is_invalid_payload() {
        let (api, mock) = api_with_mock();
        mock.mock_response(format!("{BASE}/api/user/profile"), 200, "not json");

        let err = api.fetch_profile("tok").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidPayload);
    }

    #[tokio::test]
    async fn validation_rejects_before_any_request() {
        let (api, mock) = api_with_mock();

        assert!(api.login("not-an-email", "secret").await.is_err());
        assert!(api.login("ann@x.com", "").await.is_err());
        assert!(api.register("ab", "ann@x.com", "secret1").await.is_err());
        assert!(api.register("ann", "ann@x.com", "short").await.is_err());

        assert!(mock.requests().is_empty());
    }

    #[test]
    fn email_shape_check() {
        assert!(is_well_formed_email("ann@x.com"));
        assert!(!is_well_formed_email("ann"));
        assert!(!is_well_formed_email("@x.com"));
        assert!(!is_well_formed_email("ann@"));
        assert!(!is_well_formed_email("ann@xcom"));
        assert!(!is_well_formed_email("ann@.com"));
        assert!(!is_well_formed_email("a nn@x.com"));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let api = AuthApi::new("http://api.test/");
        assert_eq!(api.base_url(), "http://api.test");
    }
}
