//! Purchase pipeline route handlers: quote, apply, pay.
//!
//! Thin wrappers over [`PipelineService`]; every step requires a signed-in
//! user because quotes are held in the session and payments settle against
//! the session identity.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use tower_sessions::Session;

use aegis_core::{ApplicationId, PaymentFrequency, PaymentRef, PolicyId};

use crate::api::{Application, Transaction};
use crate::error::Result;
use crate::middleware::RequireUser;
use crate::services::pipeline::{ApplicationForm, PaymentStart, PipelineService};
use crate::services::quote::{Quote, QuoteInput};
use crate::state::AppState;

// =============================================================================
// Request Types
// =============================================================================

/// Payment initiation request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    #[serde(default)]
    pub frequency: PaymentFrequency,
}

/// Confirmation that the processor accepted a charge.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSuccessForm {
    pub payment_ref: PaymentRef,
    #[serde(default)]
    pub frequency: PaymentFrequency,
}

// =============================================================================
// Handlers
// =============================================================================

/// Price a policy for the signed-in user.
///
/// POST /api/policies/{id}/quote
///
/// The accepted quote is parked in the session so a following
/// application submission can pick it up.
///
/// # Errors
///
/// Returns 404 for an unknown policy and 400 when the applicant falls
/// outside the policy's age band.
pub async fn quote(
    RequireUser(_user): RequireUser,
    State(state): State<AppState>,
    session: Session,
    Path(policy_id): Path<PolicyId>,
    Json(input): Json<QuoteInput>,
) -> Result<Json<Quote>> {
    let quote = PipelineService::new(state.backend())
        .quote(&session, &policy_id, input)
        .await?;

    Ok(Json(quote))
}

/// Submit an application for a policy.
///
/// POST /api/policies/{id}/apply
///
/// Applicant identity comes from the session, never the body. When the
/// session holds a quote for this policy the submission is priced from
/// it; otherwise it goes in unquoted and gets priced before payment.
///
/// # Errors
///
/// Returns 404 for an unknown policy and 400 for incomplete forms.
pub async fn apply(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    session: Session,
    Path(policy_id): Path<PolicyId>,
    Json(form): Json<ApplicationForm>,
) -> Result<Json<Application>> {
    let application = PipelineService::new(state.backend())
        .submit(&session, &user, &policy_id, form)
        .await?;

    Ok(Json(application))
}

/// Start a payment for an approved application.
///
/// POST /api/applications/{id}/pay
///
/// # Errors
///
/// Returns 403 for someone else's application, 409 when the application
/// is not approved or was never priced, and 402 when the processor
/// refuses the intent.
pub async fn pay(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    Path(application_id): Path<ApplicationId>,
    Json(request): Json<PaymentRequest>,
) -> Result<Json<PaymentStart>> {
    let start = PipelineService::new(state.backend())
        .payment_intent(&user, &application_id, request.frequency)
        .await?;

    Ok(Json(start))
}

/// Record a completed charge against an application.
///
/// POST /api/applications/{id}/payment-success
///
/// # Errors
///
/// Returns 500 with the processor reference when the charge succeeded
/// but the backend could not record it; support settles those by hand.
pub async fn payment_success(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    Path(application_id): Path<ApplicationId>,
    Json(form): Json<PaymentSuccessForm>,
) -> Result<Json<Transaction>> {
    let transaction = PipelineService::new(state.backend())
        .record_success(&user, &application_id, form.payment_ref, form.frequency)
        .await?;

    Ok(Json(transaction))
}
