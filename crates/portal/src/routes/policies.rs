//! Policy catalog route handlers.
//!
//! Browsing is public: the list supports category filtering, keyword
//! search, and pagination, and the backend client caches unsearched
//! pages. Catalog management is admin-only and invalidates those caches
//! through the backend client on every write.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use rust_decimal::Decimal;
use serde::Deserialize;

use aegis_core::PolicyId;

use crate::api::{Policy, PolicyInput, PolicyPage};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// Default page size for the catalog list.
const DEFAULT_PAGE_SIZE: u32 = 9;
/// Hard ceiling on the page size a client may request.
const MAX_PAGE_SIZE: u32 = 50;
/// Default number of cards on the popular shelf.
const DEFAULT_POPULAR_LIMIT: u32 = 6;

// =============================================================================
// Query Types
// =============================================================================

/// Query parameters for the catalog list.
#[derive(Debug, Deserialize)]
pub struct CatalogQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Query parameters for the popular shelf.
#[derive(Debug, Deserialize)]
pub struct PopularQuery {
    pub limit: Option<u32>,
}

// =============================================================================
// Public Catalog
// =============================================================================

/// List the policy catalog, paginated.
///
/// GET /api/policies
///
/// Blank `category` and `search` values are treated as absent, so
/// `?search=` behaves like no search at all.
pub async fn list_policies(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<PolicyPage>> {
    let category = non_blank(query.category.as_deref());
    let search = non_blank(query.search.as_deref());
    let page = query.page.unwrap_or(1).max(1);
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    let page = state
        .backend()
        .get_policies(category, search, page, limit)
        .await?;

    Ok(Json(page))
}

/// List the most-purchased policies.
///
/// GET /api/policies/popular
pub async fn popular_policies(
    State(state): State<AppState>,
    Query(query): Query<PopularQuery>,
) -> Result<Json<Vec<Policy>>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_POPULAR_LIMIT)
        .clamp(1, MAX_PAGE_SIZE);

    let policies = state.backend().get_popular_policies(limit).await?;

    Ok(Json(policies))
}

/// Fetch a single policy.
///
/// GET /api/policies/{id}
///
/// # Errors
///
/// Returns 404 when no policy has this id.
pub async fn get_policy(
    State(state): State<AppState>,
    Path(policy_id): Path<PolicyId>,
) -> Result<Json<Policy>> {
    let policy = state.backend().get_policy(&policy_id).await?;
    Ok(Json(policy))
}

// =============================================================================
// Admin Catalog Management
// =============================================================================

/// Create a policy.
///
/// POST /api/admin/policies
///
/// # Errors
///
/// Returns 400 when the input fails validation.
pub async fn create_policy(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<PolicyInput>,
) -> Result<Json<Policy>> {
    validate_policy_input(&input)?;

    let policy = state
        .backend()
        .create_policy(&admin.access_token, &input)
        .await?;

    add_breadcrumb(
        "admin",
        "Policy created",
        Some(&[("policy_id", policy.id.as_str()), ("title", &policy.title)]),
    );

    Ok(Json(policy))
}

/// Update a policy.
///
/// PUT /api/admin/policies/{id}
///
/// # Errors
///
/// Returns 400 when the input fails validation and 404 when no policy
/// has this id.
pub async fn update_policy(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(policy_id): Path<PolicyId>,
    Json(input): Json<PolicyInput>,
) -> Result<Json<Policy>> {
    validate_policy_input(&input)?;

    let policy = state
        .backend()
        .update_policy(&admin.access_token, &policy_id, &input)
        .await?;

    Ok(Json(policy))
}

/// Delete a policy.
///
/// DELETE /api/admin/policies/{id}
///
/// # Errors
///
/// Returns 404 when no policy has this id.
pub async fn delete_policy(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(policy_id): Path<PolicyId>,
) -> Result<Json<serde_json::Value>> {
    state
        .backend()
        .delete_policy(&admin.access_token, &policy_id)
        .await?;

    tracing::info!(policy_id = %policy_id, admin = %admin.email, "Policy deleted");

    Ok(Json(serde_json::json!({ "success": true })))
}

// =============================================================================
// Helpers
// =============================================================================

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Reject catalog input the quote engine could not safely price.
fn validate_policy_input(input: &PolicyInput) -> Result<()> {
    if input.title.trim().is_empty() {
        return Err(AppError::Validation("Title is required".to_string()));
    }
    if input.category.trim().is_empty() {
        return Err(AppError::Validation("Category is required".to_string()));
    }
    if input.min_age >= input.max_age {
        return Err(AppError::Validation(
            "Minimum age must be below maximum age".to_string(),
        ));
    }
    if input.coverage_min > input.coverage_max {
        return Err(AppError::Validation(
            "Coverage floor exceeds coverage ceiling".to_string(),
        ));
    }
    if input.duration_options.is_empty() {
        return Err(AppError::Validation(
            "At least one duration option is required".to_string(),
        ));
    }
    if input.duration_options.iter().any(|&years| years == 0) {
        return Err(AppError::Validation(
            "Duration options must be at least one year".to_string(),
        ));
    }
    if input.base_premium_rate <= Decimal::ZERO {
        return Err(AppError::Validation(
            "Base premium rate must be positive".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn valid_input() -> PolicyInput {
        PolicyInput {
            title: "Term Life Shield".to_string(),
            category: "term-life".to_string(),
            image_url: None,
            description: "Simple term coverage".to_string(),
            min_age: 18,
            max_age: 65,
            coverage_min: Decimal::from(100_000),
            coverage_max: Decimal::from(2_000_000),
            duration_options: vec![10, 15, 20],
            base_premium_rate: Decimal::new(5, 4),
        }
    }

    #[test]
    fn test_valid_input_passes() {
        assert!(validate_policy_input(&valid_input()).is_ok());
    }

    #[test]
    fn test_inverted_age_band_rejected() {
        let mut input = valid_input();
        input.min_age = 70;
        assert!(matches!(
            validate_policy_input(&input),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_inverted_coverage_band_rejected() {
        let mut input = valid_input();
        input.coverage_min = Decimal::from(5_000_000);
        assert!(matches!(
            validate_policy_input(&input),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_empty_durations_rejected() {
        let mut input = valid_input();
        input.duration_options.clear();
        assert!(validate_policy_input(&input).is_err());

        input.duration_options = vec![10, 0];
        assert!(validate_policy_input(&input).is_err());
    }

    #[test]
    fn test_zero_rate_rejected() {
        let mut input = valid_input();
        input.base_premium_rate = Decimal::ZERO;
        assert!(validate_policy_input(&input).is_err());
    }

    #[test]
    fn test_blank_filters_collapse_to_none() {
        assert_eq!(non_blank(Some("  ")), None);
        assert_eq!(non_blank(Some("")), None);
        assert_eq!(non_blank(Some("health")), Some("health"));
        assert_eq!(non_blank(None), None);
    }
}
