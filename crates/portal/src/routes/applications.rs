//! Application review route handlers.
//!
//! Customers see their own applications, agents review the ones assigned
//! to them, and admins see everything and hand out assignments. Approval
//! and rejection go through [`PipelineService`] so purchase counts and
//! rejection feedback behave the same on both review surfaces.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;

use aegis_core::{ApplicationId, Email};

use crate::api::Application;
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, RequireAgent, RequireUser};
use crate::models::CurrentUser;
use crate::services::pipeline::PipelineService;
use crate::state::AppState;

// =============================================================================
// Request Types
// =============================================================================

/// Rejection request; feedback is shown to the applicant verbatim.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectForm {
    #[serde(default)]
    pub feedback: Option<String>,
}

/// Agent assignment request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignForm {
    pub agent_email: Email,
}

// =============================================================================
// Customer Views
// =============================================================================

/// List the signed-in user's applications.
///
/// GET /api/applications/mine
pub async fn my_applications(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Application>>> {
    let applications = state
        .backend()
        .get_applications_for_user(&user.access_token, &user.email)
        .await?;

    Ok(Json(applications))
}

/// Fetch the signed-in user's most recent open application, if any.
///
/// GET /api/applications/active
///
/// Returns a JSON `null` body rather than 404 when nothing is open, so
/// dashboards can render the empty state without an error path.
pub async fn active_application(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
) -> Result<Json<Option<Application>>> {
    let application = state
        .backend()
        .get_active_application(&user.access_token, &user.email)
        .await?;

    Ok(Json(application))
}

// =============================================================================
// Agent Review
// =============================================================================

/// List the applications assigned to the signed-in agent.
///
/// GET /api/agent/applications
pub async fn agent_applications(
    RequireAgent(agent): RequireAgent,
    State(state): State<AppState>,
) -> Result<Json<Vec<Application>>> {
    let applications = state
        .backend()
        .get_agent_applications(&agent.access_token, &agent.email)
        .await?;

    Ok(Json(applications))
}

/// Approve an application assigned to the signed-in agent.
///
/// POST /api/agent/applications/{id}/approve
///
/// # Errors
///
/// Returns 403 when the application is assigned to somebody else or to
/// nobody at all.
pub async fn agent_approve(
    RequireAgent(agent): RequireAgent,
    State(state): State<AppState>,
    Path(application_id): Path<ApplicationId>,
) -> Result<Json<Application>> {
    ensure_assigned_to(&state, &agent, &application_id).await?;

    let application = PipelineService::new(state.backend())
        .approve(&agent.access_token, &application_id)
        .await?;

    Ok(Json(application))
}

/// Reject an application assigned to the signed-in agent.
///
/// POST /api/agent/applications/{id}/reject
///
/// # Errors
///
/// Returns 403 when the application is assigned to somebody else or to
/// nobody at all.
pub async fn agent_reject(
    RequireAgent(agent): RequireAgent,
    State(state): State<AppState>,
    Path(application_id): Path<ApplicationId>,
    Json(form): Json<RejectForm>,
) -> Result<Json<Application>> {
    ensure_assigned_to(&state, &agent, &application_id).await?;

    let application = PipelineService::new(state.backend())
        .reject(&agent.access_token, &application_id, form.feedback)
        .await?;

    Ok(Json(application))
}

// =============================================================================
// Admin Review
// =============================================================================

/// List every application.
///
/// GET /api/admin/applications
pub async fn all_applications(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<Application>>> {
    let applications = state.backend().get_applications(&admin.access_token).await?;

    Ok(Json(applications))
}

/// Assign an agent to an application.
///
/// PATCH /api/admin/applications/{id}/assign
///
/// # Errors
///
/// Returns 400 when the target user exists but holds no agent grant, and
/// 404 when either the application or the user is unknown.
pub async fn assign_agent(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(application_id): Path<ApplicationId>,
    Json(form): Json<AssignForm>,
) -> Result<Json<Application>> {
    let target = state
        .backend()
        .get_user_by_email(&admin.access_token, &form.agent_email)
        .await?;
    if !target.flags.is_agent {
        return Err(AppError::Validation(format!(
            "{} is not an agent",
            form.agent_email
        )));
    }

    let application = state
        .backend()
        .assign_agent(&admin.access_token, &application_id, &form.agent_email)
        .await?;

    tracing::info!(
        application_id = %application_id,
        agent = %form.agent_email,
        "Application assigned"
    );

    Ok(Json(application))
}

/// Approve any application.
///
/// POST /api/admin/applications/{id}/approve
pub async fn admin_approve(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(application_id): Path<ApplicationId>,
) -> Result<Json<Application>> {
    let application = PipelineService::new(state.backend())
        .approve(&admin.access_token, &application_id)
        .await?;

    Ok(Json(application))
}

/// Reject any application.
///
/// POST /api/admin/applications/{id}/reject
pub async fn admin_reject(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(application_id): Path<ApplicationId>,
    Json(form): Json<RejectForm>,
) -> Result<Json<Application>> {
    let application = PipelineService::new(state.backend())
        .reject(&admin.access_token, &application_id, form.feedback)
        .await?;

    Ok(Json(application))
}

// =============================================================================
// Helpers
// =============================================================================

/// Agents may only act on applications assigned to them.
async fn ensure_assigned_to(
    state: &AppState,
    agent: &CurrentUser,
    application_id: &ApplicationId,
) -> Result<()> {
    let application = state
        .backend()
        .get_application(&agent.access_token, application_id)
        .await?;

    if application.agent_email.as_ref() != Some(&agent.email) {
        tracing::warn!(
            application_id = %application_id,
            agent = %agent.email,
            "Agent acted on an application not assigned to them"
        );
        return Err(AppError::Forbidden(
            "This application is not assigned to you".to_string(),
        ));
    }

    Ok(())
}
