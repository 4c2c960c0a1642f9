//! Admin user management handlers.
//!
//! Role grants live on the backend user record as a pair of flags; the
//! cached role for the affected account is dropped on every change so
//! the new grant takes effect on their next request, not after the TTL.

use axum::{
    Json,
    extract::{Path, State},
};

use aegis_core::UserId;

use crate::api::{RoleUpdate, UserRecord};
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// List every registered user.
///
/// GET /api/admin/users
pub async fn list_users(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserRecord>>> {
    let users = state.backend().get_users(&admin.access_token).await?;
    Ok(Json(users))
}

/// List users holding the agent grant, for assignment pickers.
///
/// GET /api/admin/agents
pub async fn list_agents(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserRecord>>> {
    let users = state.backend().get_users(&admin.access_token).await?;
    let agents = users.into_iter().filter(|u| u.flags.is_agent).collect();

    Ok(Json(agents))
}

/// Change a user's role grants.
///
/// PATCH /api/admin/users/{id}/role
///
/// # Errors
///
/// Returns 404 when no user has this id.
pub async fn update_role(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Json(update): Json<RoleUpdate>,
) -> Result<Json<UserRecord>> {
    let record = state
        .backend()
        .update_user_role(&admin.access_token, &user_id, update)
        .await?;

    // The grant must land on their next request, not after the cache TTL.
    state.roles().invalidate(&record.email).await;

    tracing::info!(
        user = %record.email,
        is_admin = update.is_admin,
        is_agent = update.is_agent,
        changed_by = %admin.email,
        "Role grants updated"
    );

    Ok(Json(record))
}
