//! Catalog browsing and admin catalog management tests.
//!
//! Public side: pagination, category filter, keyword search, detail
//! lookup, and the popular shelf ordering. Admin side: policy create,
//! update, delete, input validation, and loading the starter catalog
//! from the seed file through the same API the CLI uses.

use aegis_integration_tests::{PortalClient, TestPortal};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};

use aegis_portal::api::PolicyInput;

// =============================================================================
// Helpers
// =============================================================================

/// Open a signed-in persona holding the admin grant.
async fn sign_up_admin(portal: &TestPortal) -> PortalClient {
    portal.backend.grant_admin("iris@aegis.test");
    let admin = portal.session();
    admin.sign_up("Iris Weber", "iris@aegis.test").await;
    admin
}

/// A complete, valid policy creation payload.
fn policy_payload(title: &str) -> Value {
    json!({
        "title": title,
        "category": "term-life",
        "description": "Level-premium term coverage.",
        "minAge": 18,
        "maxAge": 65,
        "coverageMin": "100000",
        "coverageMax": "2000000",
        "durationOptions": [10, 15, 20],
        "basePremiumRate": "0.0005"
    })
}

// =============================================================================
// Public Catalog
// =============================================================================

#[tokio::test]
async fn test_catalog_lists_are_paginated() {
    let portal = TestPortal::spawn().await;
    for n in 1..=12 {
        portal.backend.seed_policy(&format!("Cover Plan {n:02}"), "term-life");
    }

    let visitor = portal.session();

    let resp = visitor.get("/api/policies?page=1&limit=5").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let page: Value = resp.json().await.expect("Failed to parse page");
    assert_eq!(page["policies"].as_array().expect("Not an array").len(), 5);
    // Total counts every match, not just this page.
    assert_eq!(page["total"], 12);

    let resp = visitor.get("/api/policies?page=3&limit=5").await;
    let page: Value = resp.json().await.expect("Failed to parse page");
    assert_eq!(page["policies"].as_array().expect("Not an array").len(), 2);

    // Default page size is nine.
    let resp = visitor.get("/api/policies").await;
    let page: Value = resp.json().await.expect("Failed to parse page");
    assert_eq!(page["policies"].as_array().expect("Not an array").len(), 9);
}

#[tokio::test]
async fn test_catalog_filters_by_category_and_search() {
    let portal = TestPortal::spawn().await;
    portal.backend.seed_policy("Term Life Shield", "term-life");
    portal.backend.seed_policy("Young Starter Cover", "term-life");
    portal.backend.seed_policy("Family Senior Plan", "senior");

    let visitor = portal.session();

    let resp = visitor.get("/api/policies?category=senior").await;
    let page: Value = resp.json().await.expect("Failed to parse page");
    assert_eq!(page["total"], 1);
    assert_eq!(page["policies"][0]["title"], "Family Senior Plan");

    // Search is a case-insensitive title match.
    let resp = visitor.get("/api/policies?search=SHIELD").await;
    let page: Value = resp.json().await.expect("Failed to parse page");
    assert_eq!(page["total"], 1);
    assert_eq!(page["policies"][0]["title"], "Term Life Shield");

    // A blank search is no search at all.
    let resp = visitor.get("/api/policies?search=").await;
    let page: Value = resp.json().await.expect("Failed to parse page");
    assert_eq!(page["total"], 3);
}

#[tokio::test]
async fn test_policy_detail_is_public_and_unknown_ids_are_not_found() {
    let portal = TestPortal::spawn().await;
    let policy = portal.backend.seed_policy("Term Life Shield", "term-life");

    let visitor = portal.session();

    let resp = visitor.get(&format!("/api/policies/{}", policy.id)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let detail: Value = resp.json().await.expect("Failed to parse policy");
    assert_eq!(detail["title"], "Term Life Shield");
    assert_eq!(detail["durationOptions"], json!([10, 15, 20]));

    let resp = visitor.get("/api/policies/p999").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.expect("Failed to parse error");
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_popular_shelf_orders_by_purchase_count() {
    let portal = TestPortal::spawn().await;
    let quiet = portal.backend.seed_policy("Quiet Seller", "term-life");
    let steady = portal.backend.seed_policy("Steady Seller", "term-life");
    let hot = portal.backend.seed_policy("Hot Seller", "term-life");

    let maria = portal.session();
    maria.sign_up("Maria Gomez", "maria@example.com").await;
    let admin = sign_up_admin(&portal).await;

    // Two approvals for the hot policy, one for the steady one.
    for policy_id in [hot.id.as_str(), hot.id.as_str(), steady.id.as_str()] {
        let resp = maria
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
        let application_id = application["_id"].as_str().expect("No id");

        let resp = admin
            .post_empty(&format!("/api/admin/applications/{application_id}/approve"))
            .await;
        assert_eq!(resp.status(), StatusCode::OK, "approve failed");
    }

    let visitor = portal.session();
    let resp = visitor.get("/api/policies/popular?limit=2").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let shelf: Value = resp.json().await.expect("Failed to parse shelf");
    let shelf = shelf.as_array().expect("Not an array");
    assert_eq!(shelf.len(), 2);
    assert_eq!(shelf[0]["title"], "Hot Seller");
    assert_eq!(shelf[0]["purchaseCount"], 2);
    assert_eq!(shelf[1]["title"], "Steady Seller");

    let resp = visitor.get("/api/policies/popular").await;
    let shelf: Value = resp.json().await.expect("Failed to parse shelf");
    assert_eq!(shelf.as_array().expect("Not an array").len(), 3);
    assert_eq!(shelf[2]["title"], quiet.title);
}

// =============================================================================
// Admin Catalog Management
// =============================================================================

#[tokio::test]
async fn test_admin_creates_updates_and_deletes_policies() {
    let portal = TestPortal::spawn().await;
    let admin = sign_up_admin(&portal).await;
    let visitor = portal.session();

    let resp = admin
        .post("/api/admin/policies", policy_payload("Term Life Shield"))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let created: Value = resp.json().await.expect("Failed to parse policy");
    let policy_id = created["_id"].as_str().expect("Policy has no id").to_string();
    assert_eq!(created["purchaseCount"], 0);

    // The new policy is immediately visible to the public.
    let resp = visitor.get(&format!("/api/policies/{policy_id}")).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let mut updated = policy_payload("Term Life Shield Plus");
    updated["maxAge"] = json!(70);
    let resp = admin
        .put(&format!("/api/admin/policies/{policy_id}"), updated)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    // The edit lands on the public detail view, not a stale cache.
    let resp = visitor.get(&format!("/api/policies/{policy_id}")).await;
    let detail: Value = resp.json().await.expect("Failed to parse policy");
    assert_eq!(detail["title"], "Term Life Shield Plus");
    assert_eq!(detail["maxAge"], 70);

    let resp = admin
        .delete(&format!("/api/admin/policies/{policy_id}"))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("Failed to parse delete");
    assert_eq!(body["success"], true);

    let resp = visitor.get(&format!("/api/policies/{policy_id}")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_policy_input_validation_guards_the_quote_engine() {
    let portal = TestPortal::spawn().await;
    let admin = sign_up_admin(&portal).await;

    let cases: [(&str, Value, &str); 6] = [
        ("blank title", json!({"title": "  "}), "Title is required"),
        ("inverted ages", json!({"minAge": 70}), "below maximum age"),
        (
            "inverted coverage",
            json!({"coverageMin": "5000000"}),
            "Coverage floor",
        ),
        ("no durations", json!({"durationOptions": []}), "duration"),
        ("zero-year term", json!({"durationOptions": [10, 0]}), "at least one year"),
        ("zero rate", json!({"basePremiumRate": "0"}), "must be positive"),
    ];

    for (label, patch, expected) in cases {
        let mut payload = policy_payload("Term Life Shield");
        for (key, value) in patch.as_object().expect("Patch is not an object") {
            payload[key] = value.clone();
        }

        let resp = admin.post("/api/admin/policies", payload).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "accepted {label}");

        let body: Value = resp.json().await.expect("Failed to parse error");
        let message = body["error"].as_str().expect("No error message");
        assert!(message.contains(expected), "{label} got: {message}");
    }

    // Nothing invalid made it into the catalog.
    let resp = admin.get("/api/policies").await;
    let page: Value = resp.json().await.expect("Failed to parse page");
    assert_eq!(page["total"], 0);
}

#[tokio::test]
async fn test_catalog_management_requires_the_admin_grant() {
    let portal = TestPortal::spawn().await;

    portal.backend.grant_agent("nadia@aegis.test");
    let agent = portal.session();
    agent.sign_up("Nadia Rahman", "nadia@aegis.test").await;

    let resp = agent
        .post("/api/admin/policies", policy_payload("Term Life Shield"))
        .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let visitor = portal.session();
    let resp = visitor
        .post("/api/admin/policies", policy_payload("Term Life Shield"))
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Seed Catalog
// =============================================================================

/// Mirror of the CLI's seed file layout.
#[derive(Debug, Deserialize)]
struct SeedFile {
    policies: Vec<PolicyInput>,
}

#[tokio::test]
async fn test_seed_catalog_loads_through_the_admin_api() {
    let seed_path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../seeds/policies.yaml");
    let content = std::fs::read_to_string(seed_path).expect("Failed to read seed file");
    let seed_file: SeedFile = serde_yaml::from_str(&content).expect("Failed to parse seed file");
    assert_eq!(seed_file.policies.len(), 4, "seed catalog drifted");

    let portal = TestPortal::spawn().await;
    let admin = sign_up_admin(&portal).await;

    for input in &seed_file.policies {
        let payload = serde_json::to_value(input).expect("Failed to serialize seed");
        let resp = admin.post("/api/admin/policies", payload).await;
        assert_eq!(resp.status(), StatusCode::OK, "seed refused: {}", input.title);
    }

    let visitor = portal.session();
    let resp = visitor.get("/api/policies?limit=10").await;
    let page: Value = resp.json().await.expect("Failed to parse page");
    assert_eq!(page["total"], 4);

    // Every seed prices under the engine it was written for.
    let customer = portal.session();
    customer.sign_up("Maria Gomez", "maria@example.com").await;
    let policies = page["policies"].as_array().expect("Not an array");
    let shield = policies
        .iter()
        .find(|p| p["title"] == "Term Life Shield")
        .expect("Seed catalog is missing Term Life Shield");
    let resp = customer
        .post(
            &format!("/api/policies/{}/quote", shield["_id"].as_str().expect("No id")),
            json!({
                "age": 30,
                "gender": "male",
                "smoker": false,
                "coverage": "1000000",
                "durationYears": 10
            }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let quote: Value = resp.json().await.expect("Failed to parse quote");
    assert_eq!(quote["annualPremium"], "5000.00");
}
