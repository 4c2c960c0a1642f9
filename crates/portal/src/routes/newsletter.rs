//! Newsletter signup handler.

use axum::{Json, extract::State};

use crate::api::NewsletterSignup;
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Subscribe to the newsletter.
///
/// POST /api/newsletter
///
/// Open to anonymous visitors; the backend deduplicates by email.
pub async fn subscribe(
    State(state): State<AppState>,
    Json(signup): Json<NewsletterSignup>,
) -> Result<Json<serde_json::Value>> {
    if signup.name.trim().is_empty() {
        return Err(AppError::Validation("Name is required".to_string()));
    }

    state.backend().subscribe_newsletter(&signup).await?;

    Ok(Json(serde_json::json!({ "success": true })))
}
