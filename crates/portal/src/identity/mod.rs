//! Identity provider client.
//!
//! Credentials never touch this portal: sign-up and sign-in (password or
//! Google) are delegated to a hosted identity provider, and only the
//! verified account profile comes back. The backend's user record is
//! authoritative for display name and photo; profile edits push the same
//! values to the provider so a later sign-in starts from them.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use aegis_core::Email;

use crate::config::IdentityConfig;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Errors that can occur when talking to the identity provider.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Email/password pair was rejected.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// An account with this email already exists.
    #[error("email already in use")]
    EmailInUse,

    /// Password failed validation.
    #[error("weak password: {0}")]
    WeakPassword(String),

    /// A provider token was missing or expired.
    #[error("invalid identity token")]
    InvalidToken,

    /// Provider returned an error the client has no mapping for.
    #[error("identity provider error ({status}): {message}")]
    Provider { status: u16, message: String },
}

/// A verified account as the provider reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityUser {
    /// Verified email address.
    pub email: Email,
    /// Display name, if the account has one.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Avatar URL, if the account has one.
    #[serde(default)]
    pub photo_url: Option<String>,
    /// Session token issued with this response; carried into the session
    /// and attached to user-scoped backend calls.
    #[serde(with = "crate::models::session::token_serde")]
    pub id_token: SecretString,
}

/// Error body the provider returns on rejection.
#[derive(Debug, Deserialize)]
struct ProviderError {
    error: String,
}

// =============================================================================
// IdentityClient
// =============================================================================

/// Client for the hosted identity provider.
#[derive(Clone)]
pub struct IdentityClient {
    inner: Arc<IdentityClientInner>,
}

struct IdentityClientInner {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
}

impl IdentityClient {
    /// Create a new identity provider client.
    #[must_use]
    pub fn new(config: &IdentityConfig) -> Self {
        Self {
            inner: Arc::new(IdentityClientInner {
                client: reqwest::Client::new(),
                base_url: config.base_url.clone(),
                api_key: config.api_key.clone(),
            }),
        }
    }

    /// Register a new account with email and password.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::WeakPassword` if the password doesn't meet
    /// requirements, `IdentityError::EmailInUse` if the email is taken, or a
    /// transport error if the provider is unreachable.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn sign_up(
        &self,
        name: &str,
        email: &Email,
        password: &str,
    ) -> Result<IdentityUser, IdentityError> {
        validate_password(password)?;

        self.post(
            "signup",
            &serde_json::json!({
                "name": name,
                "email": email,
                "password": password,
            }),
        )
        .await
    }

    /// Authenticate an existing account.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::InvalidCredentials` if the email/password pair
    /// is wrong, or a transport error if the provider is unreachable.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn sign_in(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<IdentityUser, IdentityError> {
        self.post(
            "signin",
            &serde_json::json!({
                "email": email,
                "password": password,
            }),
        )
        .await
    }

    /// Authenticate with a Google ID token.
    ///
    /// The browser completes the Google flow; the provider verifies the
    /// token and returns (or provisions) the matching account.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::InvalidToken` if the provider rejects the
    /// token, or a transport error if the provider is unreachable.
    #[instrument(skip_all)]
    pub async fn sign_in_with_google(&self, id_token: &str) -> Result<IdentityUser, IdentityError> {
        self.post("signin-google", &serde_json::json!({ "idToken": id_token }))
            .await
    }

    /// Revoke a session token.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::InvalidToken` if the token is already dead,
    /// or a transport error if the provider is unreachable.
    #[instrument(skip_all)]
    pub async fn sign_out(&self, token: &SecretString) -> Result<(), IdentityError> {
        self.post_ok(
            "signout",
            &serde_json::json!({ "idToken": token.expose_secret() }),
        )
        .await
    }

    /// Push the display name and photo to the provider's copy of the
    /// account.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::InvalidToken` if the session token is stale,
    /// or a transport error if the provider is unreachable.
    #[instrument(skip(self, token), fields(display_name = %display_name))]
    pub async fn update_profile(
        &self,
        token: &SecretString,
        display_name: &str,
        photo_url: Option<&str>,
    ) -> Result<(), IdentityError> {
        self.post_ok(
            "update-profile",
            &serde_json::json!({
                "idToken": token.expose_secret(),
                "displayName": display_name,
                "photoUrl": photo_url,
            }),
        )
        .await
    }

    async fn post(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<IdentityUser, IdentityError> {
        let text = self.send(path, body).await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// POST where only success matters; the response body is dropped.
    async fn post_ok(&self, path: &str, body: &serde_json::Value) -> Result<(), IdentityError> {
        self.send(path, body).await.map(|_| ())
    }

    async fn send(&self, path: &str, body: &serde_json::Value) -> Result<String, IdentityError> {
        let response = self
            .inner
            .client
            .post(format!("{}/{path}", self.inner.base_url))
            .header("X-Api-Key", self.inner.api_key.expose_secret())
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(map_provider_error(status.as_u16(), &text));
        }

        Ok(text)
    }
}

/// Map a provider error body to a typed error.
///
/// The provider uses stable SCREAMING_SNAKE codes in `{"error": "..."}`.
fn map_provider_error(status: u16, body: &str) -> IdentityError {
    let code = serde_json::from_str::<ProviderError>(body)
        .map(|e| e.error)
        .unwrap_or_default();

    match code.as_str() {
        "EMAIL_EXISTS" => IdentityError::EmailInUse,
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_CREDENTIALS" => {
            IdentityError::InvalidCredentials
        }
        "WEAK_PASSWORD" => {
            IdentityError::WeakPassword("password rejected by identity provider".to_string())
        }
        "INVALID_ID_TOKEN" | "TOKEN_EXPIRED" => IdentityError::InvalidToken,
        _ => IdentityError::Provider {
            status,
            message: body.chars().take(200).collect(),
        },
    }
}

/// Validate password meets requirements before it ever leaves the portal.
fn validate_password(password: &str) -> Result<(), IdentityError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(IdentityError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_password_too_short() {
        let result = validate_password("short");
        assert!(matches!(result, Err(IdentityError::WeakPassword(_))));
    }

    #[test]
    fn test_validate_password_minimum_length() {
        assert!(validate_password("12345678").is_ok());
    }

    #[test]
    fn test_map_provider_error_email_exists() {
        let err = map_provider_error(409, r#"{"error": "EMAIL_EXISTS"}"#);
        assert!(matches!(err, IdentityError::EmailInUse));
    }

    #[test]
    fn test_map_provider_error_bad_credentials() {
        for code in ["EMAIL_NOT_FOUND", "INVALID_PASSWORD", "INVALID_CREDENTIALS"] {
            let body = format!(r#"{{"error": "{code}"}}"#);
            let err = map_provider_error(401, &body);
            assert!(matches!(err, IdentityError::InvalidCredentials), "{code}");
        }
    }

    #[test]
    fn test_map_provider_error_dead_tokens() {
        for code in ["INVALID_ID_TOKEN", "TOKEN_EXPIRED"] {
            let body = format!(r#"{{"error": "{code}"}}"#);
            let err = map_provider_error(400, &body);
            assert!(matches!(err, IdentityError::InvalidToken), "{code}");
        }
    }

    #[test]
    fn test_map_provider_error_unknown_code_keeps_status() {
        let err = map_provider_error(503, r#"{"error": "MAINTENANCE"}"#);
        match err {
            IdentityError::Provider { status, .. } => assert_eq!(status, 503),
            other => panic!("expected Provider error, got {other:?}"),
        }
    }

    #[test]
    fn test_map_provider_error_non_json_body() {
        let err = map_provider_error(502, "Bad Gateway");
        assert!(matches!(err, IdentityError::Provider { status: 502, .. }));
    }

    #[test]
    fn test_identity_user_reads_camel_case() {
        let user: IdentityUser = serde_json::from_str(
            r#"{"email": "maria@example.com", "displayName": "Maria", "photoUrl": null, "idToken": "tok-123"}"#,
        )
        .unwrap();
        assert_eq!(user.email.as_str(), "maria@example.com");
        assert_eq!(user.display_name.as_deref(), Some("Maria"));
        assert!(user.photo_url.is_none());
        assert_eq!(user.id_token.expose_secret(), "tok-123");
    }
}
