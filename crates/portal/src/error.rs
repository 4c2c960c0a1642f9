//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use aegis_core::{ApplicationId, PaymentRef};

use crate::api::BackendError;
use crate::identity::IdentityError;
use crate::services::roles::RoleError;
use crate::uploads::UploadError;

/// Application-level error type for the portal.
#[derive(Debug, Error)]
pub enum AppError {
    /// Policy backend API operation failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Identity provider operation failed.
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    /// Image host operation failed.
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not signed in.
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// User is signed in but their role does not grant access.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Application submitted without a quote on file for the policy.
    #[error("No quote on file for policy {0}")]
    NotQuoted(String),

    /// Payment attempted on an application that is not approved.
    #[error("Application {0} is not approved for payment")]
    NotPayable(String),

    /// Payment processor rejected the charge.
    #[error("Payment processor error: {0}")]
    Processor(String),

    /// The processor confirmed the charge but recording it failed. The
    /// charge stands; the payment reference is the support handle.
    #[error("Payment {payment_ref} succeeded but could not be recorded for application {application_id}")]
    Reconciliation {
        payment_ref: PaymentRef,
        application_id: ApplicationId,
    },

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RoleError> for AppError {
    fn from(err: RoleError) -> Self {
        // The shared backend error lives in an Arc inside the cache, so the
        // variant cannot be recovered; a failed lookup is a server fault.
        Self::Internal(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(
            self,
            Self::Internal(_) | Self::Backend(_) | Self::Reconciliation { .. }
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Backend(err) => match err {
                BackendError::NotFound(_) => StatusCode::NOT_FOUND,
                BackendError::Rejected { status, .. } if *status < 500 => {
                    StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_REQUEST)
                }
                _ => StatusCode::BAD_GATEWAY,
            },
            Self::Identity(err) => match err {
                IdentityError::InvalidCredentials | IdentityError::InvalidToken => {
                    StatusCode::UNAUTHORIZED
                }
                IdentityError::EmailInUse => StatusCode::CONFLICT,
                IdentityError::WeakPassword(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::BAD_GATEWAY,
            },
            Self::Upload(_) => StatusCode::BAD_GATEWAY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotQuoted(_) | Self::NotPayable(_) => StatusCode::CONFLICT,
            Self::Processor(_) => StatusCode::PAYMENT_REQUIRED,
            Self::Reconciliation { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Internal(_) => "Internal server error".to_string(),
            Self::Backend(err) => match err {
                BackendError::NotFound(what) => format!("Not found: {what}"),
                BackendError::Rejected { status, message } if *status < 500 => message.clone(),
                _ => "Policy service unavailable".to_string(),
            },
            Self::Identity(err) => match err {
                IdentityError::InvalidCredentials => "Invalid email or password".to_string(),
                IdentityError::InvalidToken => "Session expired, please sign in again".to_string(),
                IdentityError::EmailInUse => {
                    "An account with this email already exists".to_string()
                }
                IdentityError::WeakPassword(msg) => msg.clone(),
                _ => "Identity service unavailable".to_string(),
            },
            Self::Upload(_) => "Image upload failed".to_string(),
            // Keep the payment reference visible so support can reconcile
            Self::Reconciliation { .. } => self.to_string(),
            _ => self.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user email.
///
/// Call this after successful sign-in to associate errors with users.
pub fn set_sentry_user(email: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            email: Some(email.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on sign-out to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("pipeline", "Quote accepted", Some(&[("policy_id", "64db1f0c")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("policy-123".to_string());
        assert_eq!(err.to_string(), "Not found: policy-123");

        let err = AppError::Validation("coverage must be positive".to_string());
        assert_eq!(
            err.to_string(),
            "Validation error: coverage must be positive"
        );
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthenticated("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::Validation("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::RateLimited),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_pipeline_errors_are_conflicts() {
        assert_eq!(
            get_status(AppError::NotQuoted("policy-1".to_string())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::NotPayable("app-1".to_string())),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_processor_error_is_payment_required() {
        assert_eq!(
            get_status(AppError::Processor("card declined".to_string())),
            StatusCode::PAYMENT_REQUIRED
        );
    }

    #[test]
    fn test_reconciliation_keeps_payment_ref_visible() {
        let err = AppError::Reconciliation {
            payment_ref: PaymentRef::new("pi_3Nq8xYZ"),
            application_id: ApplicationId::new("app-42"),
        };
        let display = err.to_string();
        assert!(display.contains("pi_3Nq8xYZ"));
        assert!(display.contains("app-42"));
        assert_eq!(get_status(err), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_backend_network_error_is_bad_gateway() {
        let err = AppError::Backend(BackendError::Unexpected("no data".to_string()));
        assert_eq!(get_status(err), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_backend_not_found_passes_through() {
        let err = AppError::Backend(BackendError::NotFound("policy abc".to_string()));
        assert_eq!(get_status(err), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_backend_client_rejection_keeps_status() {
        let err = AppError::Backend(BackendError::Rejected {
            status: 422,
            message: "duration out of range".to_string(),
        });
        assert_eq!(get_status(err), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
