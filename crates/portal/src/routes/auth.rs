//! Authentication route handlers.
//!
//! Sign-up and sign-in (password or Google) delegate credential checks
//! to the identity provider; the backend user record is upserted on
//! every sign-in so display name and photo stay current. The session
//! holds the resulting identity, and the role cache is invalidated
//! whenever it changes hands.

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use aegis_core::{Email, Role};

use crate::api::UpsertUser;
use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::identity::IdentityUser;
use crate::middleware::{OptionalUser, clear_current_user, set_current_user};
use crate::models::CurrentUser;
use crate::state::AppState;

/// Where the sign-in page sends users who arrived without a destination.
const DEFAULT_RETURN_TO: &str = "/dashboard";

// =============================================================================
// Form Types
// =============================================================================

/// Sign-up form data.
#[derive(Debug, Deserialize)]
pub struct SignUpForm {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Sign-in form data.
#[derive(Debug, Deserialize)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
}

/// Google sign-in form data.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleSignInForm {
    pub id_token: String,
}

// =============================================================================
// Query Types
// =============================================================================

/// Query parameters for the sign-in page.
#[derive(Debug, Deserialize)]
pub struct SignInQuery {
    pub return_to: Option<String>,
}

/// Query parameters for the forbidden page.
#[derive(Debug, Deserialize)]
pub struct ForbiddenQuery {
    pub from: Option<String>,
}

// =============================================================================
// Response Types
// =============================================================================

/// The signed-in user as responses expose it. Never the token.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub name: String,
    pub email: Email,
    pub photo_url: Option<String>,
}

impl From<&CurrentUser> for UserView {
    fn from(user: &CurrentUser) -> Self {
        Self {
            name: user.name.clone(),
            email: user.email.clone(),
            photo_url: user.photo_url.clone(),
        }
    }
}

/// Session snapshot returned by sign-in, sign-up, and `/auth/me`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub user: Option<UserView>,
    pub role: Option<Role>,
}

/// View model for the sign-in page.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInPage {
    pub return_to: String,
}

/// View model for the forbidden page.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForbiddenPage {
    pub error: String,
    pub from: Option<String>,
}

// =============================================================================
// Pages
// =============================================================================

/// Render the sign-in page view model.
///
/// GET /auth/sign-in
///
/// Echoes back a sanitized `return_to` so the client can resume the
/// interrupted navigation after authentication.
pub async fn sign_in_page(Query(query): Query<SignInQuery>) -> impl IntoResponse {
    Json(SignInPage {
        return_to: sanitize_return_to(query.return_to.as_deref()),
    })
}

/// Render the forbidden page view model.
///
/// GET /forbidden
///
/// Lands here after a role gate refuses a page navigation; shows which
/// path was refused without ever echoing an off-site value.
pub async fn forbidden_page(Query(query): Query<ForbiddenQuery>) -> impl IntoResponse {
    let from = query.from.filter(|f| is_local_path(f));
    Json(ForbiddenPage {
        error: "Access denied".to_string(),
        from,
    })
}

// =============================================================================
// Sign-up / Sign-in
// =============================================================================

/// Register a new account and sign it in.
///
/// POST /auth/sign-up
///
/// # Errors
///
/// Returns 400 for a weak password, 409-mapped provider errors when the
/// email is taken, and 500 if the session cannot be written.
pub async fn sign_up(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<SignUpForm>,
) -> Result<Json<MeResponse>> {
    let email = parse_email(&form.email)?;
    let name = form.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Name is required".to_string()));
    }

    let identity = state.identity().sign_up(name, &email, &form.password).await?;

    establish_session(&state, &session, &email, name, identity).await
}

/// Authenticate an existing account.
///
/// POST /auth/sign-in
///
/// # Errors
///
/// Returns 401 for bad credentials and 500 if the session cannot be
/// written.
pub async fn sign_in(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<SignInForm>,
) -> Result<Json<MeResponse>> {
    let email = parse_email(&form.email)?;

    let identity = state.identity().sign_in(&email, &form.password).await?;

    let fallback_name = resolved_name(identity.display_name.as_deref(), &email);
    establish_session(&state, &session, &email, &fallback_name, identity).await
}

/// Authenticate with a Google credential.
///
/// POST /auth/google
///
/// The browser completes the Google flow and posts the resulting ID
/// token; the identity provider verifies it and returns (or provisions)
/// the account.
///
/// # Errors
///
/// Returns 401 for a rejected token and 500 if the session cannot be
/// written.
pub async fn sign_in_with_google(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<GoogleSignInForm>,
) -> Result<Json<MeResponse>> {
    let identity = state.identity().sign_in_with_google(&form.id_token).await?;

    let email = identity.email.clone();
    let name = resolved_name(identity.display_name.as_deref(), &email);
    establish_session(&state, &session, &email, &name, identity).await
}

/// Sign the current user out.
///
/// POST /auth/sign-out
///
/// Revokes the provider token (best effort), clears the session, drops
/// the cached role so a later sign-in starts fresh, and detaches the
/// error-reporting user context. Signing out while signed out is a
/// no-op, not an error.
pub async fn sign_out(
    State(state): State<AppState>,
    session: Session,
    OptionalUser(user): OptionalUser,
) -> Result<Json<serde_json::Value>> {
    if let Some(user) = user {
        state.roles().invalidate(&user.email).await;
        if let Err(e) = state.identity().sign_out(&user.access_token).await {
            tracing::warn!(error = %e, "Identity token revocation failed");
        }
    }

    clear_current_user(&session)
        .await
        .map_err(|e| AppError::Internal(format!("session write failed: {e}")))?;
    session
        .flush()
        .await
        .map_err(|e| AppError::Internal(format!("session write failed: {e}")))?;

    clear_sentry_user();

    Ok(Json(serde_json::json!({ "success": true })))
}

/// Report the current session and role.
///
/// GET /auth/me
///
/// Both fields are null when nobody is signed in; the client treats this
/// as the signed-out state rather than an error.
pub async fn me(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
) -> Json<MeResponse> {
    let Some(user) = user else {
        return Json(MeResponse {
            user: None,
            role: None,
        });
    };

    let role = match state.roles().resolve(&user.email, &user.access_token).await {
        Ok(role) => Some(role),
        Err(e) => {
            tracing::warn!(error = %e, email = %user.email, "Role lookup failed for /auth/me");
            None
        }
    };

    Json(MeResponse {
        user: Some(UserView::from(&user)),
        role,
    })
}

// =============================================================================
// Helpers
// =============================================================================

/// Upsert the backend user record, store the session, and report back.
///
/// The display name and photo on the session come from the backend record,
/// which is authoritative once the upsert lands.
async fn establish_session(
    state: &AppState,
    session: &Session,
    email: &Email,
    name: &str,
    identity: IdentityUser,
) -> Result<Json<MeResponse>> {
    let token: SecretString = identity.id_token;

    let record = state
        .backend()
        .upsert_user(
            &token,
            &UpsertUser {
                name: name.to_string(),
                email: email.clone(),
                photo_url: identity.photo_url.clone(),
            },
        )
        .await?;

    let user = CurrentUser {
        name: record.name.clone(),
        email: record.email.clone(),
        photo_url: record.photo_url.clone(),
        access_token: token,
    };

    // A fresh sign-in may carry fresh grants
    state.roles().invalidate(email).await;
    let role = match state.roles().resolve(&user.email, &user.access_token).await {
        Ok(role) => Some(role),
        Err(e) => {
            tracing::warn!(error = %e, email = %email, "Role lookup failed after sign-in");
            None
        }
    };

    set_current_user(session, &user)
        .await
        .map_err(|e| AppError::Internal(format!("session write failed: {e}")))?;
    set_sentry_user(user.email.as_str());

    Ok(Json(MeResponse {
        user: Some(UserView::from(&user)),
        role,
    }))
}

fn parse_email(raw: &str) -> Result<Email> {
    Email::parse(raw).map_err(|e| AppError::Validation(e.to_string()))
}

/// Pick a display name: the provider's, else the email's local part.
fn resolved_name(display_name: Option<&str>, email: &Email) -> String {
    match display_name {
        Some(name) if !name.trim().is_empty() => name.to_string(),
        _ => email
            .as_str()
            .split('@')
            .next()
            .unwrap_or_default()
            .to_string(),
    }
}

/// Keep only local, absolute-path destinations.
///
/// Anything else (full URLs, protocol-relative `//host` forms, empty
/// strings) falls back to the dashboard so the sign-in page can never be
/// used as an open redirect.
fn sanitize_return_to(raw: Option<&str>) -> String {
    match raw {
        Some(path) if is_local_path(path) => path.to_string(),
        _ => DEFAULT_RETURN_TO.to_string(),
    }
}

fn is_local_path(path: &str) -> bool {
    path.starts_with('/') && !path.starts_with("//") && !path.starts_with("/\\")
}
