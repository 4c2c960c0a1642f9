//! In-memory mock of the policy backend.
//!
//! Serves the same REST surface the portal's backend client speaks, with
//! plain `Vec`s behind mutexes instead of a document store. The mock trusts
//! every bearer token it sees; authentication behavior under test lives in
//! the portal, not here.
//!
//! Failure injection: [`BackendHandle::fail_next_role_checks`] makes the
//! role endpoint return 500 a set number of times, and
//! [`BackendHandle::fail_payment_records`] wedges the payment ledger so
//! reconciliation paths can be exercised.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};

use aegis_core::{
    ApplicationId, ApplicationStatus, BlogId, ClaimId, ClaimStatus, PaymentStatus, PolicyId,
    ReviewId, RoleFlags, TransactionId, UserId,
};
use aegis_portal::api::{
    Application, ApplicationInput, AssignAgent, Blog, BlogInput, ChartPoint, ClaimInput,
    ClaimRequest, ClaimStatusUpdate, DashboardStats, NewsletterSignup, PaymentIntentRequest,
    PaymentIntentResponse, Policy, PolicyInput, PolicyPage, RecordPayment, Review, ReviewInput,
    RoleUpdate, StatusUpdate, Transaction, UpsertUser, UserRecord,
};

/// Shared stores behind the mock's routes.
#[derive(Default)]
pub struct BackendState {
    policies: Mutex<Vec<Policy>>,
    users: Mutex<Vec<UserRecord>>,
    applications: Mutex<Vec<Application>>,
    claims: Mutex<Vec<ClaimRequest>>,
    blogs: Mutex<Vec<Blog>>,
    reviews: Mutex<Vec<Review>>,
    transactions: Mutex<Vec<Transaction>>,
    newsletter: Mutex<Vec<NewsletterSignup>>,
    role_flags: Mutex<HashMap<String, RoleFlags>>,
    next_id: AtomicUsize,
    check_role_hits: AtomicUsize,
    check_role_failures: AtomicUsize,
    record_payment_fails: AtomicBool,
    payment_intent_rejects: AtomicBool,
}

impl BackendState {
    fn mint(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    fn flags_for(&self, email: &str) -> RoleFlags {
        self.role_flags
            .lock()
            .expect("role flags lock poisoned")
            .get(email)
            .copied()
            .unwrap_or_default()
    }
}

/// Handle for seeding and inspecting the mock from tests.
#[derive(Clone)]
pub struct BackendHandle {
    /// Base URL of the mock, e.g. `http://127.0.0.1:49230`.
    pub base_url: String,
    state: Arc<BackendState>,
}

impl BackendHandle {
    /// Insert a catalog policy with sensible defaults and return it.
    pub fn seed_policy(&self, title: &str, category: &str) -> Policy {
        let policy = Policy {
            id: PolicyId::new(self.state.mint("p")),
            title: title.to_string(),
            category: category.to_string(),
            image_url: None,
            description: format!("{title} cover."),
            min_age: 18,
            max_age: 65,
            coverage_min: Decimal::from(50_000),
            coverage_max: Decimal::from(2_000_000),
            duration_options: vec![10, 15, 20],
            base_premium_rate: Decimal::new(5, 4),
            purchase_count: 0,
        };
        self.state
            .policies
            .lock()
            .expect("policies lock poisoned")
            .push(policy.clone());
        policy
    }

    /// Set role grants for an email, updating any existing user record.
    pub fn grant(&self, email: &str, flags: RoleFlags) {
        self.state
            .role_flags
            .lock()
            .expect("role flags lock poisoned")
            .insert(email.to_string(), flags);
        let mut users = self.state.users.lock().expect("users lock poisoned");
        if let Some(user) = users.iter_mut().find(|u| u.email.as_str() == email) {
            user.flags = flags;
        }
    }

    /// Grant the admin role to an email.
    pub fn grant_admin(&self, email: &str) {
        self.grant(
            email,
            RoleFlags {
                is_admin: true,
                is_agent: false,
            },
        );
    }

    /// Grant the agent role to an email.
    pub fn grant_agent(&self, email: &str) {
        self.grant(
            email,
            RoleFlags {
                is_admin: false,
                is_agent: true,
            },
        );
    }

    /// Fetch a stored policy by ID.
    ///
    /// # Panics
    ///
    /// Panics if the policy does not exist; tests seed what they read.
    #[must_use]
    pub fn policy(&self, id: &str) -> Policy {
        self.state
            .policies
            .lock()
            .expect("policies lock poisoned")
            .iter()
            .find(|p| p.id.as_str() == id)
            .cloned()
            .unwrap_or_else(|| panic!("no policy {id} in mock backend"))
    }

    /// Fetch a stored application by ID.
    ///
    /// # Panics
    ///
    /// Panics if the application does not exist.
    #[must_use]
    pub fn application(&self, id: &str) -> Application {
        self.state
            .applications
            .lock()
            .expect("applications lock poisoned")
            .iter()
            .find(|a| a.id.as_str() == id)
            .cloned()
            .unwrap_or_else(|| panic!("no application {id} in mock backend"))
    }

    /// All recorded transactions.
    #[must_use]
    pub fn transactions(&self) -> Vec<Transaction> {
        self.state
            .transactions
            .lock()
            .expect("transactions lock poisoned")
            .clone()
    }

    /// All stored claims.
    #[must_use]
    pub fn claims(&self) -> Vec<ClaimRequest> {
        self.state
            .claims
            .lock()
            .expect("claims lock poisoned")
            .clone()
    }

    /// Number of newsletter signups recorded.
    #[must_use]
    pub fn newsletter_count(&self) -> usize {
        self.state
            .newsletter
            .lock()
            .expect("newsletter lock poisoned")
            .len()
    }

    /// How many times the role endpoint has been hit.
    #[must_use]
    pub fn check_role_hits(&self) -> usize {
        self.state.check_role_hits.load(Ordering::Relaxed)
    }

    /// Make the next `n` role checks fail with a 500.
    pub fn fail_next_role_checks(&self, n: usize) {
        self.state.check_role_failures.store(n, Ordering::Relaxed);
    }

    /// Toggle payment ledger failures.
    pub fn fail_payment_records(&self, enabled: bool) {
        self.state
            .record_payment_fails
            .store(enabled, Ordering::Relaxed);
    }

    /// Make the processor refuse every payment intent with a 400.
    pub fn reject_payment_intents(&self, enabled: bool) {
        self.state
            .payment_intent_rejects
            .store(enabled, Ordering::Relaxed);
    }
}

/// Bind the mock on an ephemeral port and serve it in the background.
///
/// # Panics
///
/// Panics if the listener cannot be bound.
pub async fn spawn() -> BackendHandle {
    let state = Arc::new(BackendState::default());

    let app = Router::new()
        .route("/policies", get(list_policies).post(create_policy))
        .route("/policies/popular", get(popular_policies))
        .route(
            "/policies/{id}",
            get(get_policy).put(update_policy).delete(delete_policy),
        )
        .route("/policies/{id}/purchase", patch(purchase_policy))
        .route("/users", post(upsert_user).get(list_users))
        .route("/users/{id}/role", patch(update_role))
        .route("/check-role", get(check_role))
        .route(
            "/applications",
            post(submit_application).get(list_applications),
        )
        .route("/applications/user", get(applications_for_user))
        .route("/applications/active-by-email", get(active_application))
        .route("/applications/{id}", get(get_application))
        .route(
            "/applications/{id}/status",
            patch(update_application_status),
        )
        .route("/applications/{id}/assign", patch(assign_agent))
        .route("/agent-applications", get(agent_applications))
        .route("/claim-requests", post(submit_claim).get(list_claims))
        .route("/claim-requests/{id}", get(get_claim).patch(update_claim))
        .route("/blogs", get(list_blogs).post(create_blog))
        .route(
            "/blogs/{id}",
            get(get_blog).put(update_blog).delete(delete_blog),
        )
        .route("/blogs/{id}/visit", patch(visit_blog))
        .route("/reviews", post(submit_review).get(list_reviews))
        .route("/newsletter", post(subscribe_newsletter))
        .route("/create-payment-intent", post(create_payment_intent))
        .route("/payment/success", post(record_payment))
        .route("/payment-history/all", get(payment_history))
        .route("/dashboard/stats", get(dashboard_stats))
        .route("/dashboard/chart-data", get(chart_data))
        .with_state(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock backend listener");
    let addr = listener
        .local_addr()
        .expect("Failed to read mock backend address");
    tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("Mock backend server error");
    });

    BackendHandle {
        base_url: format!("http://{addr}"),
        state,
    }
}

// =============================================================================
// Policy Routes
// =============================================================================

#[derive(Deserialize)]
struct CatalogParams {
    category: Option<String>,
    search: Option<String>,
    page: Option<u32>,
    limit: Option<u32>,
}

async fn list_policies(
    State(state): State<Arc<BackendState>>,
    Query(params): Query<CatalogParams>,
) -> Json<PolicyPage> {
    let policies = state.policies.lock().expect("policies lock poisoned");
    let matching: Vec<Policy> = policies
        .iter()
        .filter(|p| {
            params
                .category
                .as_deref()
                .is_none_or(|category| p.category == category)
        })
        .filter(|p| {
            params
                .search
                .as_deref()
                .is_none_or(|search| p.title.to_lowercase().contains(&search.to_lowercase()))
        })
        .cloned()
        .collect();

    let total = matching.len() as u64;
    let page = params.page.unwrap_or(1).max(1) as usize;
    let limit = params.limit.unwrap_or(9).max(1) as usize;
    let policies = matching
        .into_iter()
        .skip((page - 1) * limit)
        .take(limit)
        .collect();

    Json(PolicyPage { policies, total })
}

#[derive(Deserialize)]
struct PopularParams {
    limit: Option<u32>,
}

async fn popular_policies(
    State(state): State<Arc<BackendState>>,
    Query(params): Query<PopularParams>,
) -> Json<Vec<Policy>> {
    let mut policies = state
        .policies
        .lock()
        .expect("policies lock poisoned")
        .clone();
    policies.sort_by(|a, b| b.purchase_count.cmp(&a.purchase_count));
    policies.truncate(params.limit.unwrap_or(6) as usize);
    Json(policies)
}

async fn get_policy(
    State(state): State<Arc<BackendState>>,
    Path(id): Path<String>,
) -> Result<Json<Policy>, StatusCode> {
    state
        .policies
        .lock()
        .expect("policies lock poisoned")
        .iter()
        .find(|p| p.id.as_str() == id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn create_policy(
    State(state): State<Arc<BackendState>>,
    Json(input): Json<PolicyInput>,
) -> Json<Policy> {
    let policy = Policy {
        id: PolicyId::new(state.mint("p")),
        title: input.title,
        category: input.category,
        image_url: input.image_url,
        description: input.description,
        min_age: input.min_age,
        max_age: input.max_age,
        coverage_min: input.coverage_min,
        coverage_max: input.coverage_max,
        duration_options: input.duration_options,
        base_premium_rate: input.base_premium_rate,
        purchase_count: 0,
    };
    state
        .policies
        .lock()
        .expect("policies lock poisoned")
        .push(policy.clone());
    Json(policy)
}

async fn update_policy(
    State(state): State<Arc<BackendState>>,
    Path(id): Path<String>,
    Json(input): Json<PolicyInput>,
) -> Result<Json<Policy>, StatusCode> {
    let mut policies = state.policies.lock().expect("policies lock poisoned");
    let policy = policies
        .iter_mut()
        .find(|p| p.id.as_str() == id)
        .ok_or(StatusCode::NOT_FOUND)?;

    policy.title = input.title;
    policy.category = input.category;
    policy.image_url = input.image_url;
    policy.description = input.description;
    policy.min_age = input.min_age;
    policy.max_age = input.max_age;
    policy.coverage_min = input.coverage_min;
    policy.coverage_max = input.coverage_max;
    policy.duration_options = input.duration_options;
    policy.base_premium_rate = input.base_premium_rate;

    Ok(Json(policy.clone()))
}

async fn delete_policy(
    State(state): State<Arc<BackendState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    let mut policies = state.policies.lock().expect("policies lock poisoned");
    let before = policies.len();
    policies.retain(|p| p.id.as_str() != id);
    if policies.len() == before {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(json!({ "success": true })))
}

async fn purchase_policy(
    State(state): State<Arc<BackendState>>,
    Path(id): Path<String>,
) -> Result<Json<Policy>, StatusCode> {
    let mut policies = state.policies.lock().expect("policies lock poisoned");
    let policy = policies
        .iter_mut()
        .find(|p| p.id.as_str() == id)
        .ok_or(StatusCode::NOT_FOUND)?;
    policy.purchase_count += 1;
    Ok(Json(policy.clone()))
}

// =============================================================================
// User Routes
// =============================================================================

async fn upsert_user(
    State(state): State<Arc<BackendState>>,
    Json(input): Json<UpsertUser>,
) -> Json<UserRecord> {
    let flags = state.flags_for(input.email.as_str());
    let mut users = state.users.lock().expect("users lock poisoned");

    if let Some(existing) = users.iter_mut().find(|u| u.email == input.email) {
        existing.name = input.name;
        if input.photo_url.is_some() {
            existing.photo_url = input.photo_url;
        }
        existing.flags = flags;
        return Json(existing.clone());
    }

    let record = UserRecord {
        id: UserId::new(state.mint("u")),
        name: input.name,
        email: input.email,
        photo_url: input.photo_url,
        flags,
        created_at: None,
    };
    users.push(record.clone());
    Json(record)
}

#[derive(Deserialize)]
struct EmailParam {
    email: Option<String>,
}

async fn list_users(
    State(state): State<Arc<BackendState>>,
    Query(params): Query<EmailParam>,
) -> Json<Vec<UserRecord>> {
    let users = state.users.lock().expect("users lock poisoned");
    let matching = users
        .iter()
        .filter(|u| {
            params
                .email
                .as_deref()
                .is_none_or(|email| u.email.as_str() == email)
        })
        .cloned()
        .collect();
    Json(matching)
}

async fn update_role(
    State(state): State<Arc<BackendState>>,
    Path(id): Path<String>,
    Json(update): Json<RoleUpdate>,
) -> Result<Json<UserRecord>, StatusCode> {
    let flags = RoleFlags {
        is_admin: update.is_admin,
        is_agent: update.is_agent,
    };
    let mut users = state.users.lock().expect("users lock poisoned");
    let user = users
        .iter_mut()
        .find(|u| u.id.as_str() == id)
        .ok_or(StatusCode::NOT_FOUND)?;
    user.flags = flags;
    state
        .role_flags
        .lock()
        .expect("role flags lock poisoned")
        .insert(user.email.as_str().to_string(), flags);
    Ok(Json(user.clone()))
}

#[derive(Deserialize)]
struct CheckRoleParams {
    email: String,
}

async fn check_role(
    State(state): State<Arc<BackendState>>,
    Query(params): Query<CheckRoleParams>,
) -> Result<Json<RoleFlags>, (StatusCode, Json<Value>)> {
    state.check_role_hits.fetch_add(1, Ordering::Relaxed);

    if state.check_role_failures.load(Ordering::Relaxed) > 0 {
        state.check_role_failures.fetch_sub(1, Ordering::Relaxed);
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": "role store offline" })),
        ));
    }

    Ok(Json(state.flags_for(&params.email)))
}

// =============================================================================
// Application Routes
// =============================================================================

async fn submit_application(
    State(state): State<Arc<BackendState>>,
    Json(input): Json<ApplicationInput>,
) -> Json<Application> {
    let application = Application {
        id: ApplicationId::new(state.mint("a")),
        user_name: input.user_name,
        user_email: input.user_email,
        policy_id: input.policy_id,
        policy_title: input.policy_title,
        agent_email: None,
        address: input.address,
        phone: input.phone,
        nid: input.nid,
        nominee_name: input.nominee_name,
        nominee_relation: input.nominee_relation,
        health_disclosures: input.health_disclosures,
        age: input.age,
        gender: input.gender,
        smoker: input.smoker,
        coverage: input.coverage,
        duration_years: input.duration_years,
        frequency: input.frequency,
        monthly_premium: input.monthly_premium,
        annual_premium: input.annual_premium,
        quoted: input.quoted,
        status: input.status,
        payment_status: input.payment_status,
        rejection_feedback: None,
        submitted_at: None,
    };
    state
        .applications
        .lock()
        .expect("applications lock poisoned")
        .push(application.clone());
    Json(application)
}

async fn list_applications(State(state): State<Arc<BackendState>>) -> Json<Vec<Application>> {
    Json(
        state
            .applications
            .lock()
            .expect("applications lock poisoned")
            .clone(),
    )
}

async fn get_application(
    State(state): State<Arc<BackendState>>,
    Path(id): Path<String>,
) -> Result<Json<Application>, StatusCode> {
    state
        .applications
        .lock()
        .expect("applications lock poisoned")
        .iter()
        .find(|a| a.id.as_str() == id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn applications_for_user(
    State(state): State<Arc<BackendState>>,
    Query(params): Query<CheckRoleParams>,
) -> Json<Vec<Application>> {
    let applications = state
        .applications
        .lock()
        .expect("applications lock poisoned");
    let matching = applications
        .iter()
        .filter(|a| a.user_email.as_str() == params.email)
        .cloned()
        .collect();
    Json(matching)
}

/// Active means approved and paid: coverage currently in force.
async fn active_application(
    State(state): State<Arc<BackendState>>,
    Query(params): Query<CheckRoleParams>,
) -> Result<Json<Application>, StatusCode> {
    state
        .applications
        .lock()
        .expect("applications lock poisoned")
        .iter()
        .filter(|a| a.user_email.as_str() == params.email)
        .filter(|a| a.status == ApplicationStatus::Approved)
        .filter(|a| a.payment_status == PaymentStatus::Paid)
        .next_back()
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn update_application_status(
    State(state): State<Arc<BackendState>>,
    Path(id): Path<String>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<Application>, StatusCode> {
    let mut applications = state
        .applications
        .lock()
        .expect("applications lock poisoned");
    let application = applications
        .iter_mut()
        .find(|a| a.id.as_str() == id)
        .ok_or(StatusCode::NOT_FOUND)?;
    application.status = update.status;
    if update.rejection_feedback.is_some() {
        application.rejection_feedback = update.rejection_feedback;
    }
    Ok(Json(application.clone()))
}

async fn assign_agent(
    State(state): State<Arc<BackendState>>,
    Path(id): Path<String>,
    Json(assignment): Json<AssignAgent>,
) -> Result<Json<Application>, StatusCode> {
    let mut applications = state
        .applications
        .lock()
        .expect("applications lock poisoned");
    let application = applications
        .iter_mut()
        .find(|a| a.id.as_str() == id)
        .ok_or(StatusCode::NOT_FOUND)?;
    application.agent_email = Some(assignment.agent_email);
    Ok(Json(application.clone()))
}

async fn agent_applications(
    State(state): State<Arc<BackendState>>,
    Query(params): Query<CheckRoleParams>,
) -> Json<Vec<Application>> {
    let applications = state
        .applications
        .lock()
        .expect("applications lock poisoned");
    let matching = applications
        .iter()
        .filter(|a| {
            a.agent_email
                .as_ref()
                .is_some_and(|agent| agent.as_str() == params.email)
        })
        .cloned()
        .collect();
    Json(matching)
}

// =============================================================================
// Claim Routes
// =============================================================================

async fn submit_claim(
    State(state): State<Arc<BackendState>>,
    Json(input): Json<ClaimInput>,
) -> Json<ClaimRequest> {
    let claim = ClaimRequest {
        id: ClaimId::new(state.mint("c")),
        application_id: input.application_id,
        policy_title: input.policy_title,
        user_email: input.user_email,
        reason: input.reason,
        document_url: input.document_url,
        status: ClaimStatus::Pending,
        submitted_at: None,
    };
    state
        .claims
        .lock()
        .expect("claims lock poisoned")
        .push(claim.clone());
    Json(claim)
}

async fn list_claims(
    State(state): State<Arc<BackendState>>,
    Query(params): Query<EmailParam>,
) -> Json<Vec<ClaimRequest>> {
    let claims = state.claims.lock().expect("claims lock poisoned");
    let matching = claims
        .iter()
        .filter(|c| {
            params
                .email
                .as_deref()
                .is_none_or(|email| c.user_email.as_str() == email)
        })
        .cloned()
        .collect();
    Json(matching)
}

async fn get_claim(
    State(state): State<Arc<BackendState>>,
    Path(id): Path<String>,
) -> Result<Json<ClaimRequest>, StatusCode> {
    state
        .claims
        .lock()
        .expect("claims lock poisoned")
        .iter()
        .find(|c| c.id.as_str() == id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn update_claim(
    State(state): State<Arc<BackendState>>,
    Path(id): Path<String>,
    Json(update): Json<ClaimStatusUpdate>,
) -> Result<Json<ClaimRequest>, StatusCode> {
    let mut claims = state.claims.lock().expect("claims lock poisoned");
    let claim = claims
        .iter_mut()
        .find(|c| c.id.as_str() == id)
        .ok_or(StatusCode::NOT_FOUND)?;
    claim.status = update.status;
    Ok(Json(claim.clone()))
}

// =============================================================================
// Blog Routes
// =============================================================================

async fn list_blogs(State(state): State<Arc<BackendState>>) -> Json<Vec<Blog>> {
    Json(state.blogs.lock().expect("blogs lock poisoned").clone())
}

async fn get_blog(
    State(state): State<Arc<BackendState>>,
    Path(id): Path<String>,
) -> Result<Json<Blog>, StatusCode> {
    state
        .blogs
        .lock()
        .expect("blogs lock poisoned")
        .iter()
        .find(|b| b.id.as_str() == id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn create_blog(
    State(state): State<Arc<BackendState>>,
    Json(input): Json<BlogInput>,
) -> Json<Blog> {
    let blog = Blog {
        id: BlogId::new(state.mint("b")),
        title: input.title,
        content: input.content,
        author_name: input.author_name,
        author_email: input.author_email,
        author_photo_url: input.author_photo_url,
        image_url: input.image_url,
        published_at: None,
        total_visits: 0,
    };
    state
        .blogs
        .lock()
        .expect("blogs lock poisoned")
        .push(blog.clone());
    Json(blog)
}

async fn update_blog(
    State(state): State<Arc<BackendState>>,
    Path(id): Path<String>,
    Json(input): Json<BlogInput>,
) -> Result<Json<Blog>, StatusCode> {
    let mut blogs = state.blogs.lock().expect("blogs lock poisoned");
    let blog = blogs
        .iter_mut()
        .find(|b| b.id.as_str() == id)
        .ok_or(StatusCode::NOT_FOUND)?;

    blog.title = input.title;
    blog.content = input.content;
    blog.author_name = input.author_name;
    blog.author_email = input.author_email;
    blog.author_photo_url = input.author_photo_url;
    blog.image_url = input.image_url;

    Ok(Json(blog.clone()))
}

async fn delete_blog(
    State(state): State<Arc<BackendState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    let mut blogs = state.blogs.lock().expect("blogs lock poisoned");
    let before = blogs.len();
    blogs.retain(|b| b.id.as_str() != id);
    if blogs.len() == before {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(json!({ "success": true })))
}

async fn visit_blog(
    State(state): State<Arc<BackendState>>,
    Path(id): Path<String>,
) -> Result<Json<Blog>, StatusCode> {
    let mut blogs = state.blogs.lock().expect("blogs lock poisoned");
    let blog = blogs
        .iter_mut()
        .find(|b| b.id.as_str() == id)
        .ok_or(StatusCode::NOT_FOUND)?;
    blog.total_visits += 1;
    Ok(Json(blog.clone()))
}

// =============================================================================
// Review and Newsletter Routes
// =============================================================================

async fn submit_review(
    State(state): State<Arc<BackendState>>,
    Json(input): Json<ReviewInput>,
) -> Json<Review> {
    let review = Review {
        id: ReviewId::new(state.mint("r")),
        policy_id: input.policy_id,
        policy_title: input.policy_title,
        user_name: input.user_name,
        user_email: input.user_email,
        user_photo_url: input.user_photo_url,
        rating: input.rating,
        comment: input.comment,
        submitted_at: None,
    };
    state
        .reviews
        .lock()
        .expect("reviews lock poisoned")
        .push(review.clone());
    Json(review)
}

#[derive(Deserialize)]
struct ReviewParams {
    #[serde(rename = "policyId")]
    policy_id: Option<String>,
}

async fn list_reviews(
    State(state): State<Arc<BackendState>>,
    Query(params): Query<ReviewParams>,
) -> Json<Vec<Review>> {
    let reviews = state.reviews.lock().expect("reviews lock poisoned");
    let matching = reviews
        .iter()
        .filter(|r| {
            params
                .policy_id
                .as_deref()
                .is_none_or(|policy_id| r.policy_id.as_str() == policy_id)
        })
        .cloned()
        .collect();
    Json(matching)
}

async fn subscribe_newsletter(
    State(state): State<Arc<BackendState>>,
    Json(signup): Json<NewsletterSignup>,
) -> Json<Value> {
    state
        .newsletter
        .lock()
        .expect("newsletter lock poisoned")
        .push(signup);
    Json(json!({ "success": true }))
}

// =============================================================================
// Payment Routes
// =============================================================================

async fn create_payment_intent(
    State(state): State<Arc<BackendState>>,
    Json(request): Json<PaymentIntentRequest>,
) -> Result<Json<PaymentIntentResponse>, (StatusCode, Json<Value>)> {
    if state.payment_intent_rejects.load(Ordering::Relaxed) {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "Amount below processor minimum" })),
        ));
    }

    let n = state.mint("");
    Ok(Json(PaymentIntentResponse {
        client_secret: format!("pi_mock{n}_secret_{}", request.price),
    }))
}

async fn record_payment(
    State(state): State<Arc<BackendState>>,
    Json(payment): Json<RecordPayment>,
) -> Result<Json<Transaction>, (StatusCode, Json<Value>)> {
    if state.record_payment_fails.load(Ordering::Relaxed) {
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": "ledger write failed" })),
        ));
    }

    let transaction = Transaction {
        id: TransactionId::new(state.mint("t")),
        payment_ref: payment.payment_ref,
        application_id: payment.application_id.clone(),
        policy_title: payment.policy_title,
        user_email: payment.user_email,
        amount: payment.amount,
        frequency: payment.frequency,
        status: "succeeded".to_string(),
        paid_at: None,
    };

    let mut applications = state
        .applications
        .lock()
        .expect("applications lock poisoned");
    if let Some(application) = applications
        .iter_mut()
        .find(|a| a.id == payment.application_id)
    {
        application.payment_status = PaymentStatus::Paid;
    }
    drop(applications);

    state
        .transactions
        .lock()
        .expect("transactions lock poisoned")
        .push(transaction.clone());
    Ok(Json(transaction))
}

async fn payment_history(
    State(state): State<Arc<BackendState>>,
    Query(params): Query<EmailParam>,
) -> Json<Vec<Transaction>> {
    let transactions = state
        .transactions
        .lock()
        .expect("transactions lock poisoned");
    let matching = transactions
        .iter()
        .filter(|t| {
            params
                .email
                .as_deref()
                .is_none_or(|email| t.user_email.as_str() == email)
        })
        .cloned()
        .collect();
    Json(matching)
}

// =============================================================================
// Dashboard Routes
// =============================================================================

async fn dashboard_stats(State(state): State<Arc<BackendState>>) -> Json<DashboardStats> {
    let applications = state
        .applications
        .lock()
        .expect("applications lock poisoned");
    let claims = state.claims.lock().expect("claims lock poisoned");
    let transactions = state
        .transactions
        .lock()
        .expect("transactions lock poisoned");

    let stats = DashboardStats {
        total_users: state.users.lock().expect("users lock poisoned").len() as u64,
        total_policies: state.policies.lock().expect("policies lock poisoned").len() as u64,
        total_applications: applications.len() as u64,
        pending_applications: applications
            .iter()
            .filter(|a| a.status == ApplicationStatus::Pending)
            .count() as u64,
        pending_claims: claims
            .iter()
            .filter(|c| c.status == ClaimStatus::Pending)
            .count() as u64,
        total_revenue: transactions.iter().map(|t| t.amount).sum(),
    };
    Json(stats)
}

async fn chart_data(State(state): State<Arc<BackendState>>) -> Json<Vec<ChartPoint>> {
    let transactions = state
        .transactions
        .lock()
        .expect("transactions lock poisoned");

    let mut buckets: BTreeMap<String, (u64, Decimal)> = BTreeMap::new();
    for transaction in transactions.iter() {
        let bucket = buckets
            .entry(transaction.policy_title.clone())
            .or_insert((0, Decimal::ZERO));
        bucket.0 += 1;
        bucket.1 += transaction.amount;
    }

    let points = buckets
        .into_iter()
        .map(|(label, (policies_sold, revenue))| ChartPoint {
            label,
            policies_sold,
            revenue,
        })
        .collect();
    Json(points)
}
