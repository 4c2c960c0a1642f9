//! Profile and upload route handlers.
//!
//! The profile is the backend's user record; edits push the new values
//! to the identity provider, go through the same upsert used at
//! sign-in, and refresh the session copy so the header shows the new
//! name without a round trip. Photo files land on the external image
//! host and only the hosted URL is stored.

use axum::{
    Json,
    extract::{Multipart, State},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::api::{UpsertUser, UserRecord};
use crate::error::{AppError, Result};
use crate::middleware::{RequireUser, set_current_user};
use crate::models::CurrentUser;
use crate::state::AppState;

/// Multipart field name the upload form uses for the file.
const UPLOAD_FIELD: &str = "image";

// =============================================================================
// Request / Response Types
// =============================================================================

/// Profile update form.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileForm {
    pub name: String,
    #[serde(default)]
    pub photo_url: Option<String>,
}

/// Hosted location of an uploaded file.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub url: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// Fetch the signed-in user's profile record.
///
/// GET /api/profile
pub async fn get_profile(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
) -> Result<Json<UserRecord>> {
    let record = state
        .backend()
        .get_user_by_email(&user.access_token, &user.email)
        .await?;

    Ok(Json(record))
}

/// Update display name and photo.
///
/// PUT /api/profile
///
/// Email is the account key and is not editable here.
pub async fn update_profile(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<ProfileForm>,
) -> Result<Json<UserRecord>> {
    let name = form.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Name is required".to_string()));
    }
    let photo_url = form.photo_url.or_else(|| user.photo_url.clone());

    state
        .identity()
        .update_profile(&user.access_token, name, photo_url.as_deref())
        .await?;

    let record = state
        .backend()
        .upsert_user(
            &user.access_token,
            &UpsertUser {
                name: name.to_string(),
                email: user.email.clone(),
                photo_url,
            },
        )
        .await?;

    let refreshed = CurrentUser {
        name: record.name.clone(),
        email: record.email.clone(),
        photo_url: record.photo_url.clone(),
        access_token: user.access_token,
    };
    set_current_user(&session, &refreshed)
        .await
        .map_err(|e| AppError::Internal(format!("session write failed: {e}")))?;

    Ok(Json(record))
}

/// Upload an image and return its hosted URL.
///
/// POST /api/uploads
///
/// Accepts a multipart form with a single `image` file field. Used for
/// profile photos, blog covers, and claim documents.
///
/// # Errors
///
/// Returns 400 when the field is missing, empty, or over the size limit.
pub async fn upload(
    RequireUser(_user): RequireUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadedFile>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("unreadable multipart body: {e}")))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or("upload.jpg").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("unreadable upload: {e}")))?;

        let url = state
            .uploads()
            .upload_image(bytes.to_vec(), &filename)
            .await?;

        return Ok(Json(UploadedFile { url }));
    }

    Err(AppError::Validation(format!(
        "multipart field '{UPLOAD_FIELD}' is required"
    )))
}
