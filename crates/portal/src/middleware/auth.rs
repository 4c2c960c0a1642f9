//! Access-control middleware and extractors.
//!
//! Provides the gate decision logic and extractors for requiring a
//! signed-in user or a specific role in route handlers.
//!
//! A gate evaluation starts pending and settles into exactly one of
//! authorized, unauthenticated, or unauthorized. The extractors await the
//! session load and the role lookup before deciding, so a pending state
//! can never leak into a redirect; [`decide`] still encodes the pending
//! arm so the settling order is checkable on its own.

use axum::{
    Json,
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;
use tower_sessions::Session;

use aegis_core::Role;

use crate::models::CurrentUser;
use crate::models::session::keys;
use crate::state::AppState;

// =============================================================================
// Gate Decision
// =============================================================================

/// Load state of a gate input (the session, or the role lookup).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Loadable<T> {
    /// The lookup has not completed yet.
    Loading,
    /// The lookup completed and found nothing. A failed role fetch lands
    /// here too: no role, never a default one.
    Missing,
    /// The lookup completed with a value.
    Loaded(T),
}

/// Where a gate evaluation lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// An input is still loading; show nothing, redirect nowhere.
    Pending,
    /// The caller may proceed.
    Authorized,
    /// Nobody is signed in; send to sign-in, keeping the attempted path.
    Unauthenticated,
    /// Signed in but the role does not grant access; send to forbidden.
    Unauthorized,
}

/// Decide whether a gated request may proceed.
///
/// `required` is `None` for routes that only need a signed-in user. Role
/// state is only consulted when a role is required; an admin gate with the
/// role still loading stays pending rather than denying.
#[must_use]
pub fn decide(
    session: Loadable<()>,
    role: Loadable<Role>,
    required: Option<Role>,
) -> GateDecision {
    match session {
        Loadable::Loading => GateDecision::Pending,
        Loadable::Missing => GateDecision::Unauthenticated,
        Loadable::Loaded(()) => match required {
            None => GateDecision::Authorized,
            Some(required) => match role {
                Loadable::Loading => GateDecision::Pending,
                Loadable::Missing => GateDecision::Unauthorized,
                Loadable::Loaded(role) if role.satisfies(required) => GateDecision::Authorized,
                Loadable::Loaded(_) => GateDecision::Unauthorized,
            },
        },
    }
}

// =============================================================================
// Rejection Rendering
// =============================================================================

/// Error returned when a gate refuses a request.
///
/// Page navigations get a See Other redirect carrying the attempted path;
/// `/api/` callers get a JSON status instead.
#[derive(Debug, PartialEq, Eq)]
pub enum AccessRejection {
    /// Redirect to the sign-in page, preserving the destination.
    SignIn { return_to: String },
    /// Redirect to the forbidden page, noting the attempted path.
    Forbidden { from: String },
    /// 401 JSON for API requests.
    ApiUnauthenticated,
    /// 403 JSON for API requests.
    ApiUnauthorized,
}

impl AccessRejection {
    /// Build the rejection for a settled (non-authorized) decision.
    ///
    /// `Pending` cannot reach here because both gate inputs are awaited
    /// before deciding; if it ever does, deny rather than allow.
    fn for_decision(decision: GateDecision, path: &str) -> Self {
        let is_api = path.starts_with("/api/");
        match decision {
            GateDecision::Unauthenticated => {
                if is_api {
                    Self::ApiUnauthenticated
                } else {
                    Self::SignIn {
                        return_to: path.to_string(),
                    }
                }
            }
            _ => {
                if is_api {
                    Self::ApiUnauthorized
                } else {
                    Self::Forbidden {
                        from: path.to_string(),
                    }
                }
            }
        }
    }
}

impl IntoResponse for AccessRejection {
    fn into_response(self) -> Response {
        match self {
            Self::SignIn { return_to } => Redirect::to(&format!(
                "/auth/sign-in?return_to={}",
                urlencoding::encode(&return_to)
            ))
            .into_response(),
            Self::Forbidden { from } => {
                Redirect::to(&format!("/forbidden?from={}", urlencoding::encode(&from)))
                    .into_response()
            }
            Self::ApiUnauthenticated => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Sign in required" })),
            )
                .into_response(),
            Self::ApiUnauthorized => (
                StatusCode::FORBIDDEN,
                Json(json!({ "error": "Access denied" })),
            )
                .into_response(),
        }
    }
}

// =============================================================================
// Extractors
// =============================================================================

/// Extractor that requires a signed-in user of any role.
///
/// # Example
///
/// ```rust,ignore
/// async fn my_applications(
///     RequireUser(user): RequireUser,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.name)
/// }
/// ```
pub struct RequireUser(pub CurrentUser);

/// Extractor that requires a signed-in user holding the admin role.
pub struct RequireAdmin(pub CurrentUser);

/// Extractor that requires a signed-in user holding the agent role.
pub struct RequireAgent(pub CurrentUser);

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireUser`, this does not reject the request when nobody is
/// signed in.
pub struct OptionalUser(pub Option<CurrentUser>);

/// Read the attempted path (with query) for rejection payloads.
fn attempted_path(parts: &Parts) -> String {
    parts
        .uri
        .path_and_query()
        .map_or_else(|| parts.uri.path().to_string(), |pq| pq.as_str().to_string())
}

/// Read the current user out of the session, if any.
async fn session_user(parts: &Parts) -> Option<CurrentUser> {
    let session = parts.extensions.get::<Session>()?;
    session
        .get::<CurrentUser>(keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

/// Run the gate for one request.
///
/// Awaits the session load, then the role lookup when one is required, and
/// only then decides. The role fetch never fires without a session email.
async fn gate(
    parts: &Parts,
    state: &AppState,
    required: Option<Role>,
) -> Result<CurrentUser, AccessRejection> {
    let user = session_user(parts).await;

    let session_state = user
        .as_ref()
        .map_or(Loadable::Missing, |_| Loadable::Loaded(()));

    let role_state = match (&user, required) {
        (Some(user), Some(_)) => {
            match state.roles().resolve(&user.email, &user.access_token).await {
                Ok(role) => Loadable::Loaded(role),
                Err(e) => {
                    tracing::warn!(error = %e, email = %user.email, "Role lookup failed during gating");
                    Loadable::Missing
                }
            }
        }
        _ => Loadable::Missing,
    };

    match decide(session_state, role_state, required) {
        GateDecision::Authorized => {
            // The match above only authorizes with a loaded session
            user.ok_or(AccessRejection::ApiUnauthenticated)
        }
        decision => Err(AccessRejection::for_decision(
            decision,
            &attempted_path(parts),
        )),
    }
}

impl<S> FromRequestParts<S> for RequireUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AccessRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        gate(parts, &state, None).await.map(Self)
    }
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AccessRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        gate(parts, &state, Some(Role::Admin)).await.map(Self)
    }
}

impl<S> FromRequestParts<S> for RequireAgent
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AccessRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        gate(parts, &state, Some(Role::Agent)).await.map(Self)
    }
}

impl<S> FromRequestParts<S> for OptionalUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(session_user(parts).await))
    }
}

// =============================================================================
// Session Helpers
// =============================================================================

/// Helper to set the current user in the session (sign-in).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(keys::CURRENT_USER, user).await
}

/// Helper to clear the current user from the session (sign-out).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.remove::<CurrentUser>(keys::CURRENT_USER).await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_no_session_is_unauthenticated() {
        for required in [None, Some(Role::Admin), Some(Role::Agent)] {
            assert_eq!(
                decide(Loadable::Missing, Loadable::Missing, required),
                GateDecision::Unauthenticated
            );
        }
    }

    #[test]
    fn test_session_loading_is_pending() {
        assert_eq!(
            decide(Loadable::Loading, Loadable::Missing, None),
            GateDecision::Pending
        );
    }

    #[test]
    fn test_signed_in_user_passes_plain_gate() {
        assert_eq!(
            decide(Loadable::Loaded(()), Loadable::Missing, None),
            GateDecision::Authorized
        );
    }

    #[test]
    fn test_role_loading_never_denies() {
        // An admin gate with the role still loading must stay pending,
        // not bounce the user to forbidden.
        assert_eq!(
            decide(Loadable::Loaded(()), Loadable::Loading, Some(Role::Admin)),
            GateDecision::Pending
        );
    }

    #[test]
    fn test_failed_role_lookup_is_unauthorized() {
        assert_eq!(
            decide(Loadable::Loaded(()), Loadable::Missing, Some(Role::Admin)),
            GateDecision::Unauthorized
        );
    }

    #[test]
    fn test_matching_role_is_authorized() {
        assert_eq!(
            decide(
                Loadable::Loaded(()),
                Loadable::Loaded(Role::Admin),
                Some(Role::Admin)
            ),
            GateDecision::Authorized
        );
        assert_eq!(
            decide(
                Loadable::Loaded(()),
                Loadable::Loaded(Role::Agent),
                Some(Role::Agent)
            ),
            GateDecision::Authorized
        );
    }

    #[test]
    fn test_wrong_role_is_unauthorized() {
        assert_eq!(
            decide(
                Loadable::Loaded(()),
                Loadable::Loaded(Role::Customer),
                Some(Role::Admin)
            ),
            GateDecision::Unauthorized
        );
    }

    #[test]
    fn test_roles_do_not_nest() {
        // An admin hitting an agent gate is denied; the roles are
        // disjoint tiers, not a hierarchy.
        assert_eq!(
            decide(
                Loadable::Loaded(()),
                Loadable::Loaded(Role::Admin),
                Some(Role::Agent)
            ),
            GateDecision::Unauthorized
        );
    }

    #[test]
    fn test_page_rejection_preserves_attempted_path() {
        let rejection =
            AccessRejection::for_decision(GateDecision::Unauthenticated, "/dashboard?tab=claims");
        assert_eq!(
            rejection,
            AccessRejection::SignIn {
                return_to: "/dashboard?tab=claims".to_string()
            }
        );

        let rejection = AccessRejection::for_decision(GateDecision::Unauthorized, "/dashboard");
        assert_eq!(
            rejection,
            AccessRejection::Forbidden {
                from: "/dashboard".to_string()
            }
        );
    }

    #[test]
    fn test_api_rejection_is_json_status() {
        assert_eq!(
            AccessRejection::for_decision(GateDecision::Unauthenticated, "/api/admin/users"),
            AccessRejection::ApiUnauthenticated
        );
        assert_eq!(
            AccessRejection::for_decision(GateDecision::Unauthorized, "/api/admin/users"),
            AccessRejection::ApiUnauthorized
        );
    }

    #[test]
    fn test_sign_in_redirect_encodes_return_to() {
        let response = AccessRejection::SignIn {
            return_to: "/dashboard?tab=claims".to_string(),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response.headers().get("location").unwrap();
        assert_eq!(
            location,
            "/auth/sign-in?return_to=%2Fdashboard%3Ftab%3Dclaims"
        );
    }

    #[test]
    fn test_forbidden_redirect_carries_from() {
        let response = AccessRejection::Forbidden {
            from: "/dashboard".to_string(),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response.headers().get("location").unwrap();
        assert_eq!(location, "/forbidden?from=%2Fdashboard");
    }

    #[test]
    fn test_api_rejections_map_to_statuses() {
        assert_eq!(
            AccessRejection::ApiUnauthenticated.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AccessRejection::ApiUnauthorized.into_response().status(),
            StatusCode::FORBIDDEN
        );
    }
}
