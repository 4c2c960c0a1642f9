//! Session and role gate tests.
//!
//! Exercises the access middleware end to end: anonymous rejection shapes
//! for API and page paths, role gates that do not nest, agent assignment
//! checks, role cache behavior across grants and backend outages, and the
//! role-aware dashboard.

use aegis_integration_tests::{PortalClient, TEST_PASSWORD, TestPortal};
use reqwest::StatusCode;
use serde_json::{Value, json};

// =============================================================================
// Anonymous Callers
// =============================================================================

#[tokio::test]
async fn test_anonymous_api_request_is_refused_with_json() {
    let portal = TestPortal::spawn().await;
    let visitor = portal.session();

    for path in ["/api/applications/mine", "/api/admin/users", "/api/agent/claims"] {
        let resp = visitor.get(path).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "for {path}");

        let body: Value = resp.json().await.expect("Failed to parse error");
        assert_eq!(body["error"], "Sign in required", "for {path}");
    }
}

#[tokio::test]
async fn test_anonymous_page_redirects_to_sign_in() {
    let portal = TestPortal::spawn().await;
    let visitor = portal.session();

    let resp = visitor.get("/dashboard").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let location = resp
        .headers()
        .get("location")
        .expect("No Location header")
        .to_str()
        .expect("Location is not ASCII");
    assert_eq!(location, "/auth/sign-in?return_to=%2Fdashboard");
}

#[tokio::test]
async fn test_sign_in_page_echoes_a_sanitized_return_to() {
    let portal = TestPortal::spawn().await;
    let visitor = portal.session();

    let resp = visitor
        .get("/auth/sign-in?return_to=%2Fapi%2Fclaims%2Fmine")
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let page: Value = resp.json().await.expect("Failed to parse page");
    assert_eq!(page["returnTo"], "/api/claims/mine");

    // Off-site destinations fall back to the dashboard.
    let resp = visitor
        .get("/auth/sign-in?return_to=https%3A%2F%2Fevil.example%2F")
        .await;
    let page: Value = resp.json().await.expect("Failed to parse page");
    assert_eq!(page["returnTo"], "/dashboard");
}

// =============================================================================
// Role Gates
// =============================================================================

#[tokio::test]
async fn test_customer_cannot_reach_staff_surfaces() {
    let portal = TestPortal::spawn().await;

    let maria = portal.session();
    maria.sign_up("Maria Gomez", "maria@example.com").await;

    for path in ["/api/admin/users", "/api/agent/applications"] {
        let resp = maria.get(path).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN, "for {path}");

        let body: Value = resp.json().await.expect("Failed to parse error");
        assert_eq!(body["error"], "Access denied", "for {path}");
    }
}

#[tokio::test]
async fn test_roles_do_not_nest() {
    let portal = TestPortal::spawn().await;

    portal.backend.grant_admin("iris@aegis.test");
    let admin = portal.session();
    admin.sign_up("Iris Weber", "iris@aegis.test").await;

    portal.backend.grant_agent("nadia@aegis.test");
    let agent = portal.session();
    agent.sign_up("Nadia Rahman", "nadia@aegis.test").await;

    // An admin is not an agent, and an agent is not an admin.
    let resp = admin.get("/api/agent/claims").await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = agent.get("/api/admin/users").await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_sign_out_ends_the_session() {
    let portal = TestPortal::spawn().await;

    let maria = portal.session();
    maria.sign_up("Maria Gomez", "maria@example.com").await;

    let resp = maria.get("/auth/me").await;
    let me: Value = resp.json().await.expect("Failed to parse me");
    assert_eq!(me["user"]["email"], "maria@example.com");
    assert_eq!(me["role"], "customer");

    maria.sign_out().await;
    assert_eq!(portal.identity.sign_out_count(), 1);

    let resp = maria.get("/auth/me").await;
    let me: Value = resp.json().await.expect("Failed to parse me");
    assert!(me["user"].is_null());
    assert!(me["role"].is_null());

    let resp = maria.get("/api/applications/mine").await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_google_sign_in_provisions_a_session() {
    let portal = TestPortal::spawn().await;

    let leo = portal.session();
    let resp = leo
        .post(
            "/auth/google",
            json!({ "idToken": "google:leo@example.com:Leo Martin" }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let me: Value = resp.json().await.expect("Failed to parse sign-in response");
    assert_eq!(me["user"]["email"], "leo@example.com");
    assert_eq!(me["user"]["name"], "Leo Martin");
    assert_eq!(me["role"], "customer");
    assert!(portal.identity.has_account("leo@example.com"));

    // The session is as good as a password one
    let resp = leo.get("/api/applications/mine").await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_google_sign_in_rejects_a_bad_token() {
    let portal = TestPortal::spawn().await;

    let visitor = portal.session();
    let resp = visitor
        .post("/auth/google", json!({ "idToken": "bogus" }))
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body: Value = resp.json().await.expect("Failed to parse error");
    assert_eq!(body["error"], "Session expired, please sign in again");
}

#[tokio::test]
async fn test_duplicate_sign_up_is_a_conflict() {
    let portal = TestPortal::spawn().await;

    let maria = portal.session();
    maria.sign_up("Maria Gomez", "maria@example.com").await;

    let again = portal.session();
    let resp = again
        .post(
            "/auth/sign-up",
            json!({
                "name": "Maria Impostor",
                "email": "maria@example.com",
                "password": TEST_PASSWORD
            }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let body: Value = resp.json().await.expect("Failed to parse error");
    assert_eq!(body["error"], "An account with this email already exists");
}

// =============================================================================
// Agent Assignment
// =============================================================================

/// Submit a bare application as the given customer, returning its id.
async fn submit_application(customer: &PortalClient, policy_id: &str) -> String {
    let resp = customer
        .post(
            &format!("/api/policies/{policy_id}/apply"),
            json!({
                "address": "12 Harbor Lane, Rotterdam",
                "phone": "+31 6 1234 5678",
                "nomineeName": "Ana Gomez",
                "nomineeRelation": "sister",
                "age": 30,
                "gender": "male",
                "coverage": "1000000",
                "durationYears": 10
            }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK, "apply failed");
    let application: Value = resp.json().await.expect("Failed to parse application");
    application["_id"]
        .as_str()
        .expect("Application has no id")
        .to_string()
}

#[tokio::test]
async fn test_agents_may_only_work_assigned_applications() {
    let portal = TestPortal::spawn().await;
    let policy = portal.backend.seed_policy("Term Life Shield", "term-life");

    let maria = portal.session();
    maria.sign_up("Maria Gomez", "maria@example.com").await;
    let application_id = submit_application(&maria, policy.id.as_str()).await;

    portal.backend.grant_admin("iris@aegis.test");
    let admin = portal.session();
    admin.sign_up("Iris Weber", "iris@aegis.test").await;

    portal.backend.grant_agent("nadia@aegis.test");
    let nadia = portal.session();
    nadia.sign_up("Nadia Rahman", "nadia@aegis.test").await;

    portal.backend.grant_agent("omar@aegis.test");
    let omar = portal.session();
    omar.sign_up("Omar Said", "omar@aegis.test").await;

    // Nobody is assigned yet.
    let resp = nadia
        .post_empty(&format!("/api/agent/applications/{application_id}/approve"))
        .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = admin
        .patch(
            &format!("/api/admin/applications/{application_id}/assign"),
            json!({ "agentEmail": "nadia@aegis.test" }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let application: Value = resp.json().await.expect("Failed to parse application");
    assert_eq!(application["agentEmail"], "nadia@aegis.test");

    // The assignment shows up in Nadia's queue and nobody else's.
    let resp = nadia.get("/api/agent/applications").await;
    let queue: Value = resp.json().await.expect("Failed to parse queue");
    assert_eq!(queue.as_array().expect("Not an array").len(), 1);

    let resp = omar.get("/api/agent/applications").await;
    let queue: Value = resp.json().await.expect("Failed to parse queue");
    assert!(queue.as_array().expect("Not an array").is_empty());

    let resp = omar
        .post_empty(&format!("/api/agent/applications/{application_id}/approve"))
        .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: Value = resp.json().await.expect("Failed to parse error");
    let message = body["error"].as_str().expect("No error message");
    assert!(message.contains("not assigned"), "got: {message}");

    let resp = nadia
        .post_empty(&format!("/api/agent/applications/{application_id}/approve"))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let application: Value = resp.json().await.expect("Failed to parse application");
    assert_eq!(application["status"], "Approved");
}

#[tokio::test]
async fn test_assignment_requires_the_agent_grant() {
    let portal = TestPortal::spawn().await;
    let policy = portal.backend.seed_policy("Term Life Shield", "term-life");

    let maria = portal.session();
    maria.sign_up("Maria Gomez", "maria@example.com").await;
    let application_id = submit_application(&maria, policy.id.as_str()).await;

    portal.backend.grant_admin("iris@aegis.test");
    let admin = portal.session();
    admin.sign_up("Iris Weber", "iris@aegis.test").await;

    let resp = admin
        .patch(
            &format!("/api/admin/applications/{application_id}/assign"),
            json!({ "agentEmail": "maria@example.com" }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = resp.json().await.expect("Failed to parse error");
    let message = body["error"].as_str().expect("No error message");
    assert!(message.contains("not an agent"), "got: {message}");
}

#[tokio::test]
async fn test_rejection_feedback_reaches_the_applicant() {
    let portal = TestPortal::spawn().await;
    let policy = portal.backend.seed_policy("Term Life Shield", "term-life");

    let maria = portal.session();
    maria.sign_up("Maria Gomez", "maria@example.com").await;
    let application_id = submit_application(&maria, policy.id.as_str()).await;

    portal.backend.grant_admin("iris@aegis.test");
    let admin = portal.session();
    admin.sign_up("Iris Weber", "iris@aegis.test").await;

    let resp = admin
        .post(
            &format!("/api/admin/applications/{application_id}/reject"),
            json!({ "feedback": "Medical records are incomplete" }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = maria.get("/api/applications/mine").await;
    let mine: Value = resp.json().await.expect("Failed to parse applications");
    assert_eq!(mine[0]["status"], "Rejected");
    assert_eq!(mine[0]["rejectionFeedback"], "Medical records are incomplete");

    // Rejection does not touch the purchase count.
    assert_eq!(portal.backend.policy(policy.id.as_str()).purchase_count, 0);
}

// =============================================================================
// Role Cache
// =============================================================================

#[tokio::test]
async fn test_role_lookups_are_memoized_per_user() {
    let portal = TestPortal::spawn().await;

    let maria = portal.session();
    maria.sign_up("Maria Gomez", "maria@example.com").await;

    let before = portal.backend.check_role_hits();
    for _ in 0..3 {
        let resp = maria.get("/auth/me").await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    // Three polls, zero extra backend lookups.
    assert_eq!(portal.backend.check_role_hits(), before);
}

#[tokio::test]
async fn test_role_grant_lands_on_the_next_request() {
    let portal = TestPortal::spawn().await;

    let kai = portal.session();
    kai.sign_up("Kai Novak", "kai@example.com").await;

    portal.backend.grant_admin("iris@aegis.test");
    let admin = portal.session();
    admin.sign_up("Iris Weber", "iris@aegis.test").await;

    let resp = kai.get("/api/agent/applications").await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = admin.get("/api/admin/users").await;
    let users: Value = resp.json().await.expect("Failed to parse users");
    let kai_id = users
        .as_array()
        .expect("Not an array")
        .iter()
        .find(|u| u["email"] == "kai@example.com")
        .expect("Kai is not registered")["_id"]
        .as_str()
        .expect("User has no id")
        .to_string();

    let resp = admin
        .patch(
            &format!("/api/admin/users/{kai_id}/role"),
            json!({ "isAdmin": false, "isAgent": true }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    // No TTL wait: the grant must apply immediately.
    let resp = kai.get("/api/agent/applications").await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = kai.get("/auth/me").await;
    let me: Value = resp.json().await.expect("Failed to parse me");
    assert_eq!(me["role"], "agent");
}

#[tokio::test]
async fn test_role_outage_refuses_access_without_caching_the_failure() {
    let portal = TestPortal::spawn().await;

    portal.backend.grant_agent("nadia@aegis.test");
    let nadia = portal.session();
    nadia.sign_up("Nadia Rahman", "nadia@aegis.test").await;
    nadia.sign_out().await;

    // The next two lookups fail: one at sign-in, one at the gate.
    portal.backend.fail_next_role_checks(2);

    let me = nadia.sign_in("nadia@aegis.test").await;
    assert!(me["role"].is_null(), "outage must not default a role");

    let resp = nadia.get("/api/agent/claims").await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // The failure is not cached; the next request recovers on its own.
    let resp = nadia.get("/api/agent/claims").await;
    assert_eq!(resp.status(), StatusCode::OK);
}

// =============================================================================
// Dashboard
// =============================================================================

#[tokio::test]
async fn test_dashboard_matches_the_callers_role() {
    let portal = TestPortal::spawn().await;

    let maria = portal.session();
    maria.sign_up("Maria Gomez", "maria@example.com").await;

    portal.backend.grant_agent("nadia@aegis.test");
    let nadia = portal.session();
    nadia.sign_up("Nadia Rahman", "nadia@aegis.test").await;

    portal.backend.grant_admin("iris@aegis.test");
    let iris = portal.session();
    iris.sign_up("Iris Weber", "iris@aegis.test").await;

    let resp = maria.get("/dashboard").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let view: Value = resp.json().await.expect("Failed to parse dashboard");
    assert_eq!(view["role"], "customer");
    assert!(view["activeApplication"].is_null());
    assert!(view["recentPayments"].as_array().expect("Not an array").is_empty());

    let resp = nadia.get("/dashboard").await;
    let view: Value = resp.json().await.expect("Failed to parse dashboard");
    assert_eq!(view["role"], "agent");
    assert!(view["assignedApplications"].is_array());

    let resp = iris.get("/dashboard").await;
    let view: Value = resp.json().await.expect("Failed to parse dashboard");
    assert_eq!(view["role"], "admin");
    assert_eq!(view["stats"]["totalUsers"], 3);
    assert!(view["chart"].is_array());
}
