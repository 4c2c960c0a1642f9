//! Claim route handlers.
//!
//! Customers file claims against their approved applications; agents
//! review the queue and approve them. Claimant identity and the
//! denormalized policy title come from the server, not the request body.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;

use aegis_core::{ApplicationId, ApplicationStatus, ClaimId, ClaimStatus};

use crate::api::{ClaimInput, ClaimRequest, ClaimStatusUpdate};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{RequireAgent, RequireUser};
use crate::state::AppState;

// =============================================================================
// Request Types
// =============================================================================

/// Claim submission form.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimForm {
    pub application_id: ApplicationId,
    pub reason: String,
    #[serde(default)]
    pub document_url: Option<String>,
}

// =============================================================================
// Customer Claims
// =============================================================================

/// File a claim against an approved application.
///
/// POST /api/claims
///
/// # Errors
///
/// Returns 403 for someone else's application and 400 when the
/// application is not approved or the reason is blank.
pub async fn submit_claim(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    Json(form): Json<ClaimForm>,
) -> Result<Json<ClaimRequest>> {
    if form.reason.trim().is_empty() {
        return Err(AppError::Validation("Reason is required".to_string()));
    }

    let application = state
        .backend()
        .get_application(&user.access_token, &form.application_id)
        .await?;

    if application.user_email != user.email {
        return Err(AppError::Forbidden(
            "This application belongs to another customer".to_string(),
        ));
    }
    if application.status != ApplicationStatus::Approved {
        return Err(AppError::Validation(
            "Claims can only be filed against an approved application".to_string(),
        ));
    }

    let claim = state
        .backend()
        .submit_claim(
            &user.access_token,
            &ClaimInput {
                application_id: form.application_id.clone(),
                policy_title: application.policy_title.clone(),
                user_email: user.email.clone(),
                reason: form.reason.trim().to_string(),
                document_url: form.document_url,
            },
        )
        .await?;

    add_breadcrumb(
        "claims",
        "Claim filed",
        Some(&[("application_id", form.application_id.as_str())]),
    );

    Ok(Json(claim))
}

/// List the signed-in user's claims.
///
/// GET /api/claims/mine
pub async fn my_claims(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<ClaimRequest>>> {
    let claims = state
        .backend()
        .get_claims(&user.access_token, Some(&user.email))
        .await?;

    Ok(Json(claims))
}

// =============================================================================
// Agent Review
// =============================================================================

/// List every claim awaiting review.
///
/// GET /api/agent/claims
pub async fn review_queue(
    RequireAgent(agent): RequireAgent,
    State(state): State<AppState>,
) -> Result<Json<Vec<ClaimRequest>>> {
    let claims = state.backend().get_claims(&agent.access_token, None).await?;

    Ok(Json(claims))
}

/// Approve a claim.
///
/// POST /api/agent/claims/{id}/approve
///
/// # Errors
///
/// Returns 404 when no claim has this id.
pub async fn approve_claim(
    RequireAgent(agent): RequireAgent,
    State(state): State<AppState>,
    Path(claim_id): Path<ClaimId>,
) -> Result<Json<ClaimRequest>> {
    let claim = state
        .backend()
        .update_claim_status(
            &agent.access_token,
            &claim_id,
            &ClaimStatusUpdate {
                status: ClaimStatus::Approved,
            },
        )
        .await?;

    tracing::info!(claim_id = %claim_id, agent = %agent.email, "Claim approved");

    Ok(Json(claim))
}
