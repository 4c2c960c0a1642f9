//! Role-aware dashboard handlers.
//!
//! `/dashboard` resolves the caller's role once and returns a view model
//! tagged with it, so the client renders the right home screen without a
//! second round trip. The admin stat and chart endpoints back the
//! widgets on the admin variant.

use axum::{Json, extract::State};
use serde::Serialize;

use aegis_core::Role;

use crate::api::{Application, ChartPoint, DashboardStats, Transaction};
use crate::error::Result;
use crate::middleware::{RequireAdmin, RequireUser};
use crate::models::CurrentUser;
use crate::state::AppState;

/// How many recent payments the customer dashboard shows.
const RECENT_PAYMENTS: usize = 5;

// =============================================================================
// View Types
// =============================================================================

/// One sidebar navigation entry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavLink {
    pub label: &'static str,
    pub href: &'static str,
}

/// The dashboard variant for the caller's role.
#[derive(Debug, Serialize)]
#[serde(tag = "role", rename_all = "camelCase")]
pub enum DashboardView {
    #[serde(rename_all = "camelCase")]
    Customer {
        nav: Vec<NavLink>,
        active_application: Option<Application>,
        recent_payments: Vec<Transaction>,
    },
    #[serde(rename_all = "camelCase")]
    Agent {
        nav: Vec<NavLink>,
        assigned_applications: Vec<Application>,
    },
    #[serde(rename_all = "camelCase")]
    Admin {
        nav: Vec<NavLink>,
        stats: DashboardStats,
        chart: Vec<ChartPoint>,
    },
}

// =============================================================================
// Handlers
// =============================================================================

/// Build the dashboard for the signed-in user's role.
///
/// GET /dashboard
pub async fn dashboard(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
) -> Result<Json<DashboardView>> {
    let role = state.roles().resolve(&user.email, &user.access_token).await?;

    let view = match role {
        Role::Customer => customer_view(&state, &user).await?,
        Role::Agent => agent_view(&state, &user).await?,
        Role::Admin => admin_view(&state, &user).await?,
    };

    Ok(Json(view))
}

/// Fetch the admin overview counters.
///
/// GET /api/admin/stats
pub async fn admin_stats(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<DashboardStats>> {
    let stats = state
        .backend()
        .get_dashboard_stats(&admin.access_token)
        .await?;

    Ok(Json(stats))
}

/// Fetch the admin earnings chart series.
///
/// GET /api/admin/chart-data
pub async fn admin_chart(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<ChartPoint>>> {
    let chart = state.backend().get_chart_data(&admin.access_token).await?;

    Ok(Json(chart))
}

// =============================================================================
// View Builders
// =============================================================================

async fn customer_view(state: &AppState, user: &CurrentUser) -> Result<DashboardView> {
    let active_application = state
        .backend()
        .get_active_application(&user.access_token, &user.email)
        .await?;

    let mut recent_payments = state
        .backend()
        .get_payment_history(&user.access_token, Some(&user.email))
        .await?;
    recent_payments.truncate(RECENT_PAYMENTS);

    Ok(DashboardView::Customer {
        nav: customer_nav(),
        active_application,
        recent_payments,
    })
}

async fn agent_view(state: &AppState, user: &CurrentUser) -> Result<DashboardView> {
    let assigned_applications = state
        .backend()
        .get_agent_applications(&user.access_token, &user.email)
        .await?;

    Ok(DashboardView::Agent {
        nav: agent_nav(),
        assigned_applications,
    })
}

async fn admin_view(state: &AppState, user: &CurrentUser) -> Result<DashboardView> {
    let stats = state
        .backend()
        .get_dashboard_stats(&user.access_token)
        .await?;
    let chart = state.backend().get_chart_data(&user.access_token).await?;

    Ok(DashboardView::Admin {
        nav: admin_nav(),
        stats,
        chart,
    })
}

fn customer_nav() -> Vec<NavLink> {
    vec![
        NavLink { label: "My Applications", href: "/api/applications/mine" },
        NavLink { label: "My Claims", href: "/api/claims/mine" },
        NavLink { label: "Payment History", href: "/api/payments/mine" },
        NavLink { label: "Profile", href: "/api/profile" },
    ]
}

fn agent_nav() -> Vec<NavLink> {
    vec![
        NavLink { label: "Assigned Applications", href: "/api/agent/applications" },
        NavLink { label: "Claim Requests", href: "/api/agent/claims" },
        NavLink { label: "My Articles", href: "/api/agent/blogs" },
        NavLink { label: "Profile", href: "/api/profile" },
    ]
}

fn admin_nav() -> Vec<NavLink> {
    vec![
        NavLink { label: "Applications", href: "/api/admin/applications" },
        NavLink { label: "Users", href: "/api/admin/users" },
        NavLink { label: "Policies", href: "/api/admin/policies" },
        NavLink { label: "Transactions", href: "/api/admin/transactions" },
        NavLink { label: "Articles", href: "/api/admin/blogs" },
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_view_is_tagged_with_role() {
        let view = DashboardView::Agent {
            nav: agent_nav(),
            assigned_applications: Vec::new(),
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["role"], "agent");
        assert!(json["assignedApplications"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_nav_links_are_camel_cased() {
        let json = serde_json::to_value(customer_nav()).unwrap();
        assert_eq!(json[0]["label"], "My Applications");
        assert_eq!(json[0]["href"], "/api/applications/mine");
    }
}
