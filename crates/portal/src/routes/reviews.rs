//! Review route handlers.
//!
//! Reviews are public to read and tied to the reviewer's session on
//! write. The policy title is denormalized server-side from the catalog.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

use aegis_core::PolicyId;

use crate::api::{Review, ReviewInput};
use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::state::AppState;

const MIN_RATING: u8 = 1;
const MAX_RATING: u8 = 5;

// =============================================================================
// Request Types
// =============================================================================

/// Query parameters for the review list.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewQuery {
    pub policy_id: Option<PolicyId>,
}

/// Review submission form. Reviewer identity comes from the session.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewForm {
    pub policy_id: PolicyId,
    pub rating: u8,
    pub comment: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// List reviews, optionally scoped to one policy.
///
/// GET /api/reviews
pub async fn list_reviews(
    State(state): State<AppState>,
    Query(query): Query<ReviewQuery>,
) -> Result<Json<Vec<Review>>> {
    let reviews = state.backend().get_reviews(query.policy_id.as_ref()).await?;
    Ok(Json(reviews))
}

/// Submit a review for a policy.
///
/// POST /api/reviews
///
/// # Errors
///
/// Returns 400 for a rating outside 1 through 5 or a blank comment, and
/// 404 when the policy does not exist.
pub async fn submit_review(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    Json(form): Json<ReviewForm>,
) -> Result<Json<Review>> {
    validate_rating(form.rating)?;
    if form.comment.trim().is_empty() {
        return Err(AppError::Validation("Comment is required".to_string()));
    }

    let policy = state.backend().get_policy(&form.policy_id).await?;

    let review = state
        .backend()
        .submit_review(
            &user.access_token,
            &ReviewInput {
                policy_id: form.policy_id,
                policy_title: policy.title,
                user_name: user.name.clone(),
                user_email: user.email.clone(),
                user_photo_url: user.photo_url.clone(),
                rating: form.rating,
                comment: form.comment.trim().to_string(),
            },
        )
        .await?;

    Ok(Json(review))
}

// =============================================================================
// Helpers
// =============================================================================

fn validate_rating(rating: u8) -> Result<()> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(AppError::Validation(format!(
            "Rating must be between {MIN_RATING} and {MAX_RATING}"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_bounds() {
        assert!(validate_rating(0).is_err());
        assert!(validate_rating(1).is_ok());
        assert!(validate_rating(5).is_ok());
        assert!(validate_rating(6).is_err());
    }
}
