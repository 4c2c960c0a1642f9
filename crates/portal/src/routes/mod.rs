//! HTTP route handlers for the portal.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                      - Liveness check
//! GET  /health/ready                - Readiness check
//! GET  /dashboard                   - Role-aware dashboard view model
//! GET  /forbidden                   - Access-refused page
//!
//! # Auth
//! GET  /auth/sign-in                - Sign-in page (echoes sanitized return_to)
//! POST /auth/sign-in                - Authenticate
//! POST /auth/sign-up                - Create account
//! POST /auth/google                 - Authenticate with a Google ID token
//! POST /auth/sign-out               - End session
//! GET  /auth/me                     - Current session snapshot
//!
//! # Catalog (public)
//! GET  /api/policies                - Paginated catalog with filter and search
//! GET  /api/policies/popular        - Most-purchased policies
//! GET  /api/policies/{id}           - Policy detail
//!
//! # Purchase pipeline (signed in)
//! POST /api/policies/{id}/quote     - Price a policy, park the quote in the session
//! POST /api/policies/{id}/apply     - Submit an application
//! POST /api/applications/{id}/pay   - Create a payment intent
//! POST /api/applications/{id}/payment-success - Record a completed charge
//!
//! # Applications, claims, payments (signed in)
//! GET  /api/applications/mine       - My applications
//! GET  /api/applications/active     - My most recent open application
//! POST /api/claims                  - File a claim
//! GET  /api/claims/mine             - My claims
//! GET  /api/payments/mine           - My payment history
//! GET  /api/payments/config         - Processor publishable key
//!
//! # Profile (signed in)
//! GET  /api/profile                 - My profile record
//! PUT  /api/profile                 - Update display name and photo
//! POST /api/uploads                 - Upload an image, get back its URL
//!
//! # Blogs, reviews, newsletter (public reads)
//! GET  /api/blogs                   - Article list
//! GET  /api/blogs/{id}              - Article detail (counts a visit)
//! GET  /api/reviews                 - Reviews, optionally ?policyId=
//! POST /api/reviews                 - Submit a review (signed in)
//! POST /api/newsletter              - Newsletter signup
//!
//! # Agent
//! GET    /api/agent/applications    - Applications assigned to me
//! POST   /api/agent/applications/{id}/approve - Approve an assigned application
//! POST   /api/agent/applications/{id}/reject  - Reject an assigned application
//! GET    /api/agent/claims          - Claim review queue
//! POST   /api/agent/claims/{id}/approve - Approve a claim
//! GET    /api/agent/blogs           - My articles
//! POST   /api/agent/blogs           - Publish an article
//! GET    /api/agent/blogs/{id}      - Fetch an article for editing
//! PUT    /api/agent/blogs/{id}      - Update my article
//! DELETE /api/agent/blogs/{id}      - Delete my article
//!
//! # Admin
//! GET    /api/admin/users           - All users
//! PATCH  /api/admin/users/{id}/role - Change role grants
//! GET    /api/admin/agents          - Users holding the agent grant
//! POST   /api/admin/policies        - Create a policy
//! PUT    /api/admin/policies/{id}   - Update a policy
//! DELETE /api/admin/policies/{id}   - Delete a policy
//! GET    /api/admin/applications    - All applications
//! PATCH  /api/admin/applications/{id}/assign  - Assign an agent
//! POST   /api/admin/applications/{id}/approve - Approve any application
//! POST   /api/admin/applications/{id}/reject  - Reject any application
//! GET    /api/admin/transactions    - All recorded payments
//! GET    /api/admin/stats           - Dashboard counters
//! GET    /api/admin/chart-data      - Earnings chart series
//! GET    /api/admin/blogs           - All articles
//! POST   /api/admin/blogs           - Publish an article
//! PUT    /api/admin/blogs/{id}      - Update any article
//! DELETE /api/admin/blogs/{id}      - Delete any article
//! ```

pub mod applications;
pub mod auth;
pub mod blogs;
pub mod claims;
pub mod dashboard;
pub mod newsletter;
pub mod payments;
pub mod pipeline;
pub mod policies;
pub mod profile;
pub mod reviews;
pub mod users;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, patch, post, put},
};

use crate::middleware::auth_rate_limiter;
use crate::state::AppState;
use crate::uploads::MAX_UPLOAD_BYTES;

/// Request body ceiling for uploads; the file limit plus multipart framing.
const UPLOAD_BODY_LIMIT: usize = MAX_UPLOAD_BYTES + 64 * 1024;

/// Create the auth routes router.
///
/// Credential endpoints sit behind the strict limiter; `/auth/me` is
/// added after the layer because the client polls it on navigation.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/sign-in", get(auth::sign_in_page).post(auth::sign_in))
        .route("/sign-up", post(auth::sign_up))
        .route("/google", post(auth::sign_in_with_google))
        .route("/sign-out", post(auth::sign_out))
        .layer(auth_rate_limiter())
        .route("/me", get(auth::me))
}

/// Create the policy catalog routes router, purchase steps included.
pub fn policy_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(policies::list_policies))
        .route("/popular", get(policies::popular_policies))
        .route("/{id}", get(policies::get_policy))
        .route("/{id}/quote", post(pipeline::quote))
        .route("/{id}/apply", post(pipeline::apply))
}

/// Create the customer application routes router.
pub fn application_routes() -> Router<AppState> {
    Router::new()
        .route("/mine", get(applications::my_applications))
        .route("/active", get(applications::active_application))
        .route("/{id}/pay", post(pipeline::pay))
        .route("/{id}/payment-success", post(pipeline::payment_success))
}

/// Create the customer claim routes router.
pub fn claim_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(claims::submit_claim))
        .route("/mine", get(claims::my_claims))
}

/// Create the payment read routes router.
pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/mine", get(payments::my_payments))
        .route("/config", get(payments::payment_config))
}

/// Create the agent workspace routes router.
pub fn agent_routes() -> Router<AppState> {
    Router::new()
        .route("/applications", get(applications::agent_applications))
        .route(
            "/applications/{id}/approve",
            post(applications::agent_approve),
        )
        .route(
            "/applications/{id}/reject",
            post(applications::agent_reject),
        )
        .route("/claims", get(claims::review_queue))
        .route("/claims/{id}/approve", post(claims::approve_claim))
        .route(
            "/blogs",
            get(blogs::agent_blogs).post(blogs::agent_create_blog),
        )
        .route(
            "/blogs/{id}",
            get(blogs::agent_edit_blog)
                .put(blogs::agent_update_blog)
                .delete(blogs::agent_delete_blog),
        )
}

/// Create the admin workspace routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(users::list_users))
        .route("/users/{id}/role", patch(users::update_role))
        .route("/agents", get(users::list_agents))
        .route("/policies", post(policies::create_policy))
        .route(
            "/policies/{id}",
            put(policies::update_policy).delete(policies::delete_policy),
        )
        .route("/applications", get(applications::all_applications))
        .route(
            "/applications/{id}/assign",
            patch(applications::assign_agent),
        )
        .route(
            "/applications/{id}/approve",
            post(applications::admin_approve),
        )
        .route(
            "/applications/{id}/reject",
            post(applications::admin_reject),
        )
        .route("/transactions", get(payments::all_transactions))
        .route("/stats", get(dashboard::admin_stats))
        .route("/chart-data", get(dashboard::admin_chart))
        .route(
            "/blogs",
            get(blogs::admin_blogs).post(blogs::admin_create_blog),
        )
        .route(
            "/blogs/{id}",
            put(blogs::admin_update_blog).delete(blogs::admin_delete_blog),
        )
}

/// Create all routes for the portal.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Role-aware landing
        .route("/dashboard", get(dashboard::dashboard))
        .route("/forbidden", get(auth::forbidden_page))
        // Session
        .nest("/auth", auth_routes())
        // Catalog and purchase pipeline
        .nest("/api/policies", policy_routes())
        .nest("/api/applications", application_routes())
        // Claims and payments
        .nest("/api/claims", claim_routes())
        .nest("/api/payments", payment_routes())
        // Profile and uploads
        .route(
            "/api/profile",
            get(profile::get_profile).put(profile::update_profile),
        )
        .route(
            "/api/uploads",
            post(profile::upload).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        // Public content
        .route("/api/blogs", get(blogs::list_blogs))
        .route("/api/blogs/{id}", get(blogs::read_blog))
        .route(
            "/api/reviews",
            get(reviews::list_reviews).post(reviews::submit_review),
        )
        .route("/api/newsletter", post(newsletter::subscribe))
        // Staff workspaces
        .nest("/api/agent", agent_routes())
        .nest("/api/admin", admin_routes())
}
