//! Policy backend REST API client.
//!
//! # Architecture
//!
//! - The backend is the source of truth - NO local sync, direct API calls
//! - In-memory caching via `moka` for catalog responses (5 minute TTL)
//! - Catalog mutations invalidate the cache before returning
//! - User-scoped calls carry the session's identity token as a bearer;
//!   catalog reads go out bare and are the only cached responses
//!
//! # Example
//!
//! ```rust,ignore
//! use aegis_portal::api::BackendClient;
//!
//! let client = BackendClient::new(&config.backend);
//!
//! // Get a policy (public, cached)
//! let policy = client.get_policy(&policy_id).await?;
//!
//! // Submit an application (bearer-authenticated)
//! let application = client.submit_application(&token, &input).await?;
//! ```

mod cache;
pub mod types;

pub use types::*;

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::{debug, instrument};

use aegis_core::{ApplicationId, BlogId, ClaimId, Email, PolicyId, RoleFlags, UserId};

use crate::config::BackendConfig;
use cache::CacheValue;

/// Errors that can occur when talking to the policy backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed (connection refused, DNS, timeout at the socket).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Backend rejected the request (4xx/5xx with a message body).
    #[error("Backend rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Response shape the client cannot use.
    #[error("Unexpected response: {0}")]
    Unexpected(String),
}

/// Pull a human-readable message out of a backend error body.
///
/// The backend responds with `{"error": "..."}` or `{"message": "..."}`;
/// anything else is truncated raw text.
fn extract_error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["error", "message"] {
            if let Some(msg) = value.get(key).and_then(|v| v.as_str()) {
                return msg.to_string();
            }
        }
    }
    body.chars().take(200).collect()
}

// =============================================================================
// BackendClient
// =============================================================================

/// Client for the policy backend REST API.
///
/// Provides typed access to users, policies, applications, claims, blogs,
/// reviews, payments, and dashboard data. Catalog reads are cached for
/// 5 minutes.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    client: reqwest::Client,
    base_url: String,
    cache: Cache<String, CacheValue>,
}

impl BackendClient {
    /// Create a new policy backend client.
    #[must_use]
    pub fn new(config: &BackendConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Self {
            inner: Arc::new(BackendClientInner {
                client: reqwest::Client::new(),
                base_url: config.base_url.clone(),
                cache,
            }),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.inner.base_url)
    }

    /// Send a request and decode the JSON response.
    ///
    /// Maps 404 to `NotFound` (named by `what`), 429 to `RateLimited`, and
    /// other non-success statuses to `Rejected` with the body's message.
    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<T, BackendError> {
        let response = request.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(BackendError::RateLimited(retry_after));
        }

        // Get response body as text first for better error diagnostics
        let response_text = response.text().await?;

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound(what.to_string()));
        }

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %response_text.chars().take(500).collect::<String>(),
                "Backend returned non-success status"
            );
            return Err(BackendError::Rejected {
                status: status.as_u16(),
                message: extract_error_message(&response_text),
            });
        }

        match serde_json::from_str(&response_text) {
            Ok(value) => Ok(value),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    body = %response_text.chars().take(500).collect::<String>(),
                    "Failed to parse backend response"
                );
                Err(BackendError::Parse(e))
            }
        }
    }

    /// Probe the backend with the cheapest catalog read, bypassing the cache.
    ///
    /// Readiness checks and the CLI use this to tell "portal up" apart from
    /// "backend reachable".
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn ping(&self) -> Result<(), BackendError> {
        let _: PolicyPage = self
            .send(
                self.inner
                    .client
                    .get(self.url("policies"))
                    .query(&[("page", "1"), ("limit", "1")]),
                "policies",
            )
            .await?;
        Ok(())
    }

    // =========================================================================
    // User Methods
    // =========================================================================

    /// Create or refresh a user record. Called on every sign-in, with the
    /// token the identity provider just issued.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token, user), fields(email = %user.email))]
    pub async fn upsert_user(
        &self,
        token: &SecretString,
        user: &UpsertUser,
    ) -> Result<UserRecord, BackendError> {
        self.send(
            self.inner
                .client
                .post(self.url("users"))
                .bearer_auth(token.expose_secret())
                .json(user),
            "user",
        )
        .await
    }

    /// List all user records.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn get_users(&self, token: &SecretString) -> Result<Vec<UserRecord>, BackendError> {
        self.send(
            self.inner
                .client
                .get(self.url("users"))
                .bearer_auth(token.expose_secret()),
            "users",
        )
        .await
    }

    /// Look up a single user record by email.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no record exists, or an error if the request fails.
    #[instrument(skip(self, token), fields(email = %email))]
    pub async fn get_user_by_email(
        &self,
        token: &SecretString,
        email: &Email,
    ) -> Result<UserRecord, BackendError> {
        let users: Vec<UserRecord> = self
            .send(
                self.inner
                    .client
                    .get(self.url("users"))
                    .bearer_auth(token.expose_secret())
                    .query(&[("email", email.as_str())]),
                "user",
            )
            .await?;

        users
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::NotFound(format!("user {email}")))
    }

    /// Change a user's role grants.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token), fields(user_id = %user_id))]
    pub async fn update_user_role(
        &self,
        token: &SecretString,
        user_id: &UserId,
        update: RoleUpdate,
    ) -> Result<UserRecord, BackendError> {
        self.send(
            self.inner
                .client
                .patch(self.url(&format!("users/{user_id}/role")))
                .bearer_auth(token.expose_secret())
                .json(&update),
            "user role",
        )
        .await
    }

    /// Fetch the raw role flags for an email.
    ///
    /// Missing flags come back as `false`; reduction to a single role is the
    /// caller's job.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token), fields(email = %email))]
    pub async fn check_role(
        &self,
        token: &SecretString,
        email: &Email,
    ) -> Result<RoleFlags, BackendError> {
        self.send(
            self.inner
                .client
                .get(self.url("check-role"))
                .bearer_auth(token.expose_secret())
                .query(&[("email", email.as_str())]),
            "role flags",
        )
        .await
    }

    // =========================================================================
    // Policy Methods
    // =========================================================================

    /// Get one page of the policy catalog.
    ///
    /// Pages without a search term are cached; search results always read
    /// through so new matches appear immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_policies(
        &self,
        category: Option<&str>,
        search: Option<&str>,
        page: u32,
        limit: u32,
    ) -> Result<PolicyPage, BackendError> {
        let cache_key = format!("policies:{}:{page}:{limit}", category.unwrap_or(""));

        // Check cache (only for queries without search)
        if search.is_none()
            && let Some(CacheValue::Policies(policies)) = self.inner.cache.get(&cache_key).await
        {
            debug!("Cache hit for policies");
            return Ok(policies);
        }

        let mut query: Vec<(&str, String)> =
            vec![("page", page.to_string()), ("limit", limit.to_string())];
        if let Some(category) = category {
            query.push(("category", category.to_string()));
        }
        if let Some(search) = search {
            query.push(("search", search.to_string()));
        }

        let page_data: PolicyPage = self
            .send(
                self.inner.client.get(self.url("policies")).query(&query),
                "policies",
            )
            .await?;

        // Cache if not a search query
        if search.is_none() {
            self.inner
                .cache
                .insert(cache_key, CacheValue::Policies(page_data.clone()))
                .await;
        }

        Ok(page_data)
    }

    /// Get the most-purchased policies.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_popular_policies(&self, limit: u32) -> Result<Vec<Policy>, BackendError> {
        let cache_key = format!("popular:{limit}");

        if let Some(CacheValue::Popular(policies)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for popular policies");
            return Ok(policies);
        }

        let policies: Vec<Policy> = self
            .send(
                self.inner
                    .client
                    .get(self.url("policies/popular"))
                    .query(&[("limit", limit.to_string())]),
                "popular policies",
            )
            .await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Popular(policies.clone()))
            .await;

        Ok(policies)
    }

    /// Get a policy by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the policy is not found or the API request fails.
    #[instrument(skip(self), fields(policy_id = %policy_id))]
    pub async fn get_policy(&self, policy_id: &PolicyId) -> Result<Policy, BackendError> {
        let cache_key = format!("policy:{policy_id}");

        if let Some(CacheValue::Policy(policy)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for policy");
            return Ok(*policy);
        }

        let policy: Policy = self
            .send(
                self.inner
                    .client
                    .get(self.url(&format!("policies/{policy_id}"))),
                &format!("policy {policy_id}"),
            )
            .await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Policy(Box::new(policy.clone())))
            .await;

        Ok(policy)
    }

    /// Create a new policy.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token, input), fields(title = %input.title))]
    pub async fn create_policy(
        &self,
        token: &SecretString,
        input: &PolicyInput,
    ) -> Result<Policy, BackendError> {
        let policy = self
            .send(
                self.inner
                    .client
                    .post(self.url("policies"))
                    .bearer_auth(token.expose_secret())
                    .json(input),
                "policy",
            )
            .await?;
        self.invalidate_catalog().await;
        Ok(policy)
    }

    /// Update an existing policy.
    ///
    /// # Errors
    ///
    /// Returns an error if the policy is not found or the API request fails.
    #[instrument(skip(self, token, input), fields(policy_id = %policy_id))]
    pub async fn update_policy(
        &self,
        token: &SecretString,
        policy_id: &PolicyId,
        input: &PolicyInput,
    ) -> Result<Policy, BackendError> {
        let policy = self
            .send(
                self.inner
                    .client
                    .put(self.url(&format!("policies/{policy_id}")))
                    .bearer_auth(token.expose_secret())
                    .json(input),
                &format!("policy {policy_id}"),
            )
            .await?;
        self.invalidate_catalog().await;
        Ok(policy)
    }

    /// Delete a policy.
    ///
    /// # Errors
    ///
    /// Returns an error if the policy is not found or the API request fails.
    #[instrument(skip(self, token), fields(policy_id = %policy_id))]
    pub async fn delete_policy(
        &self,
        token: &SecretString,
        policy_id: &PolicyId,
    ) -> Result<(), BackendError> {
        let _: serde_json::Value = self
            .send(
                self.inner
                    .client
                    .delete(self.url(&format!("policies/{policy_id}")))
                    .bearer_auth(token.expose_secret()),
                &format!("policy {policy_id}"),
            )
            .await?;
        self.invalidate_catalog().await;
        Ok(())
    }

    /// Bump a policy's purchase count by one.
    ///
    /// The increment happens atomically on the backend; the portal never
    /// reads, adds one, and writes back.
    ///
    /// # Errors
    ///
    /// Returns an error if the policy is not found or the API request fails.
    #[instrument(skip(self, token), fields(policy_id = %policy_id))]
    pub async fn increment_purchase_count(
        &self,
        token: &SecretString,
        policy_id: &PolicyId,
    ) -> Result<Policy, BackendError> {
        let policy = self
            .send(
                self.inner
                    .client
                    .patch(self.url(&format!("policies/{policy_id}/purchase")))
                    .bearer_auth(token.expose_secret()),
                &format!("policy {policy_id}"),
            )
            .await?;
        self.invalidate_catalog().await;
        Ok(policy)
    }

    // =========================================================================
    // Application Methods (not cached - mutable state)
    // =========================================================================

    /// Submit a new application.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token, input), fields(policy_id = %input.policy_id, email = %input.user_email))]
    pub async fn submit_application(
        &self,
        token: &SecretString,
        input: &ApplicationInput,
    ) -> Result<Application, BackendError> {
        self.send(
            self.inner
                .client
                .post(self.url("applications"))
                .bearer_auth(token.expose_secret())
                .json(input),
            "application",
        )
        .await
    }

    /// List every application.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn get_applications(
        &self,
        token: &SecretString,
    ) -> Result<Vec<Application>, BackendError> {
        self.send(
            self.inner
                .client
                .get(self.url("applications"))
                .bearer_auth(token.expose_secret()),
            "applications",
        )
        .await
    }

    /// Get an application by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the application is not found or the request fails.
    #[instrument(skip(self, token), fields(application_id = %application_id))]
    pub async fn get_application(
        &self,
        token: &SecretString,
        application_id: &ApplicationId,
    ) -> Result<Application, BackendError> {
        self.send(
            self.inner
                .client
                .get(self.url(&format!("applications/{application_id}")))
                .bearer_auth(token.expose_secret()),
            &format!("application {application_id}"),
        )
        .await
    }

    /// List one user's applications.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token), fields(email = %email))]
    pub async fn get_applications_for_user(
        &self,
        token: &SecretString,
        email: &Email,
    ) -> Result<Vec<Application>, BackendError> {
        self.send(
            self.inner
                .client
                .get(self.url("applications/user"))
                .bearer_auth(token.expose_secret())
                .query(&[("email", email.as_str())]),
            "applications",
        )
        .await
    }

    /// Find a user's active (approved) application, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails. A missing record is `None`,
    /// not an error.
    #[instrument(skip(self, token), fields(email = %email))]
    pub async fn get_active_application(
        &self,
        token: &SecretString,
        email: &Email,
    ) -> Result<Option<Application>, BackendError> {
        let result = self
            .send(
                self.inner
                    .client
                    .get(self.url("applications/active-by-email"))
                    .bearer_auth(token.expose_secret())
                    .query(&[("email", email.as_str())]),
                "active application",
            )
            .await;

        match result {
            Ok(application) => Ok(Some(application)),
            Err(BackendError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Record a review decision on an application.
    ///
    /// # Errors
    ///
    /// Returns an error if the application is not found or the request fails.
    #[instrument(skip(self, token, update), fields(application_id = %application_id, status = %update.status))]
    pub async fn update_application_status(
        &self,
        token: &SecretString,
        application_id: &ApplicationId,
        update: &StatusUpdate,
    ) -> Result<Application, BackendError> {
        self.send(
            self.inner
                .client
                .patch(self.url(&format!("applications/{application_id}/status")))
                .bearer_auth(token.expose_secret())
                .json(update),
            &format!("application {application_id}"),
        )
        .await
    }

    /// Assign an agent to an application.
    ///
    /// # Errors
    ///
    /// Returns an error if the application is not found or the request fails.
    #[instrument(skip(self, token), fields(application_id = %application_id, agent = %agent_email))]
    pub async fn assign_agent(
        &self,
        token: &SecretString,
        application_id: &ApplicationId,
        agent_email: &Email,
    ) -> Result<Application, BackendError> {
        self.send(
            self.inner
                .client
                .patch(self.url(&format!("applications/{application_id}/assign")))
                .bearer_auth(token.expose_secret())
                .json(&AssignAgent {
                    agent_email: agent_email.clone(),
                }),
            &format!("application {application_id}"),
        )
        .await
    }

    /// List the applications assigned to an agent.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token), fields(email = %email))]
    pub async fn get_agent_applications(
        &self,
        token: &SecretString,
        email: &Email,
    ) -> Result<Vec<Application>, BackendError> {
        self.send(
            self.inner
                .client
                .get(self.url("agent-applications"))
                .bearer_auth(token.expose_secret())
                .query(&[("email", email.as_str())]),
            "agent applications",
        )
        .await
    }

    // =========================================================================
    // Claim Methods
    // =========================================================================

    /// Submit a claim against an approved application.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token, input), fields(application_id = %input.application_id))]
    pub async fn submit_claim(
        &self,
        token: &SecretString,
        input: &ClaimInput,
    ) -> Result<ClaimRequest, BackendError> {
        self.send(
            self.inner
                .client
                .post(self.url("claim-requests"))
                .bearer_auth(token.expose_secret())
                .json(input),
            "claim",
        )
        .await
    }

    /// List claim requests, optionally filtered to one claimant.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn get_claims(
        &self,
        token: &SecretString,
        email: Option<&Email>,
    ) -> Result<Vec<ClaimRequest>, BackendError> {
        let mut request = self
            .inner
            .client
            .get(self.url("claim-requests"))
            .bearer_auth(token.expose_secret());
        if let Some(email) = email {
            request = request.query(&[("email", email.as_str())]);
        }
        self.send(request, "claims").await
    }

    /// Get a claim request by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the claim is not found or the request fails.
    #[instrument(skip(self, token), fields(claim_id = %claim_id))]
    pub async fn get_claim(
        &self,
        token: &SecretString,
        claim_id: &ClaimId,
    ) -> Result<ClaimRequest, BackendError> {
        self.send(
            self.inner
                .client
                .get(self.url(&format!("claim-requests/{claim_id}")))
                .bearer_auth(token.expose_secret()),
            &format!("claim {claim_id}"),
        )
        .await
    }

    /// Record a review decision on a claim.
    ///
    /// # Errors
    ///
    /// Returns an error if the claim is not found or the request fails.
    #[instrument(skip(self, token), fields(claim_id = %claim_id))]
    pub async fn update_claim_status(
        &self,
        token: &SecretString,
        claim_id: &ClaimId,
        update: &ClaimStatusUpdate,
    ) -> Result<ClaimRequest, BackendError> {
        self.send(
            self.inner
                .client
                .patch(self.url(&format!("claim-requests/{claim_id}")))
                .bearer_auth(token.expose_secret())
                .json(update),
            &format!("claim {claim_id}"),
        )
        .await
    }

    // =========================================================================
    // Blog Methods
    // =========================================================================

    /// List all blog articles.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_blogs(&self) -> Result<Vec<Blog>, BackendError> {
        self.send(self.inner.client.get(self.url("blogs")), "blogs")
            .await
    }

    /// Get a blog article by ID without counting a visit. Used by edit views.
    ///
    /// # Errors
    ///
    /// Returns an error if the blog is not found or the request fails.
    #[instrument(skip(self), fields(blog_id = %blog_id))]
    pub async fn get_blog(&self, blog_id: &BlogId) -> Result<Blog, BackendError> {
        self.send(
            self.inner.client.get(self.url(&format!("blogs/{blog_id}"))),
            &format!("blog {blog_id}"),
        )
        .await
    }

    /// Get a blog article and count one visit, atomically on the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the blog is not found or the request fails.
    #[instrument(skip(self), fields(blog_id = %blog_id))]
    pub async fn visit_blog(&self, blog_id: &BlogId) -> Result<Blog, BackendError> {
        self.send(
            self.inner
                .client
                .patch(self.url(&format!("blogs/{blog_id}/visit"))),
            &format!("blog {blog_id}"),
        )
        .await
    }

    /// Publish a new blog article.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token, input), fields(title = %input.title))]
    pub async fn create_blog(
        &self,
        token: &SecretString,
        input: &BlogInput,
    ) -> Result<Blog, BackendError> {
        self.send(
            self.inner
                .client
                .post(self.url("blogs"))
                .bearer_auth(token.expose_secret())
                .json(input),
            "blog",
        )
        .await
    }

    /// Update an existing blog article.
    ///
    /// # Errors
    ///
    /// Returns an error if the blog is not found or the request fails.
    #[instrument(skip(self, token, input), fields(blog_id = %blog_id))]
    pub async fn update_blog(
        &self,
        token: &SecretString,
        blog_id: &BlogId,
        input: &BlogInput,
    ) -> Result<Blog, BackendError> {
        self.send(
            self.inner
                .client
                .put(self.url(&format!("blogs/{blog_id}")))
                .bearer_auth(token.expose_secret())
                .json(input),
            &format!("blog {blog_id}"),
        )
        .await
    }

    /// Delete a blog article.
    ///
    /// # Errors
    ///
    /// Returns an error if the blog is not found or the request fails.
    #[instrument(skip(self, token), fields(blog_id = %blog_id))]
    pub async fn delete_blog(
        &self,
        token: &SecretString,
        blog_id: &BlogId,
    ) -> Result<(), BackendError> {
        let _: serde_json::Value = self
            .send(
                self.inner
                    .client
                    .delete(self.url(&format!("blogs/{blog_id}")))
                    .bearer_auth(token.expose_secret()),
                &format!("blog {blog_id}"),
            )
            .await?;
        Ok(())
    }

    // =========================================================================
    // Review Methods
    // =========================================================================

    /// Submit a policy review.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token, input), fields(policy_id = %input.policy_id, rating = input.rating))]
    pub async fn submit_review(
        &self,
        token: &SecretString,
        input: &ReviewInput,
    ) -> Result<Review, BackendError> {
        self.send(
            self.inner
                .client
                .post(self.url("reviews"))
                .bearer_auth(token.expose_secret())
                .json(input),
            "review",
        )
        .await
    }

    /// List reviews, optionally filtered to one policy.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_reviews(
        &self,
        policy_id: Option<&PolicyId>,
    ) -> Result<Vec<Review>, BackendError> {
        let mut request = self.inner.client.get(self.url("reviews"));
        if let Some(policy_id) = policy_id {
            request = request.query(&[("policyId", policy_id.as_str())]);
        }
        self.send(request, "reviews").await
    }

    // =========================================================================
    // Newsletter Methods
    // =========================================================================

    /// Record a newsletter signup.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, signup), fields(email = %signup.email))]
    pub async fn subscribe_newsletter(
        &self,
        signup: &NewsletterSignup,
    ) -> Result<(), BackendError> {
        let _: serde_json::Value = self
            .send(
                self.inner.client.post(self.url("newsletter")).json(signup),
                "newsletter signup",
            )
            .await?;
        Ok(())
    }

    // =========================================================================
    // Payment Methods
    // =========================================================================

    /// Open a payment intent with the processor.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the processor declines.
    #[instrument(skip(self, token, request))]
    pub async fn create_payment_intent(
        &self,
        token: &SecretString,
        request: &PaymentIntentRequest,
    ) -> Result<PaymentIntentResponse, BackendError> {
        self.send(
            self.inner
                .client
                .post(self.url("create-payment-intent"))
                .bearer_auth(token.expose_secret())
                .json(request),
            "payment intent",
        )
        .await
    }

    /// Record a confirmed charge and mark the application paid.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails. The caller must surface
    /// the payment reference on failure; the charge already happened.
    #[instrument(skip(self, token, payment), fields(application_id = %payment.application_id, payment_ref = %payment.payment_ref))]
    pub async fn record_payment(
        &self,
        token: &SecretString,
        payment: &RecordPayment,
    ) -> Result<Transaction, BackendError> {
        self.send(
            self.inner
                .client
                .post(self.url("payment/success"))
                .bearer_auth(token.expose_secret())
                .json(payment),
            "payment record",
        )
        .await
    }

    /// List payment history, optionally filtered to one payer.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn get_payment_history(
        &self,
        token: &SecretString,
        email: Option<&Email>,
    ) -> Result<Vec<Transaction>, BackendError> {
        let mut request = self
            .inner
            .client
            .get(self.url("payment-history/all"))
            .bearer_auth(token.expose_secret());
        if let Some(email) = email {
            request = request.query(&[("email", email.as_str())]);
        }
        self.send(request, "payment history").await
    }

    // =========================================================================
    // Dashboard Methods
    // =========================================================================

    /// Fetch aggregate counts for the admin dashboard.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn get_dashboard_stats(
        &self,
        token: &SecretString,
    ) -> Result<DashboardStats, BackendError> {
        self.send(
            self.inner
                .client
                .get(self.url("dashboard/stats"))
                .bearer_auth(token.expose_secret()),
            "dashboard stats",
        )
        .await
    }

    /// Fetch the admin earnings chart series.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn get_chart_data(
        &self,
        token: &SecretString,
    ) -> Result<Vec<ChartPoint>, BackendError> {
        self.send(
            self.inner
                .client
                .get(self.url("dashboard/chart-data"))
                .bearer_auth(token.expose_secret()),
            "dashboard chart data",
        )
        .await
    }

    // =========================================================================
    // Cache Management
    // =========================================================================

    /// Invalidate a cached policy.
    pub async fn invalidate_policy(&self, policy_id: &PolicyId) {
        let cache_key = format!("policy:{policy_id}");
        self.inner.cache.invalidate(&cache_key).await;
    }

    /// Invalidate all cached catalog data.
    ///
    /// Catalog pages are keyed by category and page number, so any policy
    /// mutation wipes everything rather than chasing individual keys.
    pub async fn invalidate_catalog(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_display() {
        let err = BackendError::NotFound("policy abc123".to_string());
        assert_eq!(err.to_string(), "Not found: policy abc123");

        let err = BackendError::Rejected {
            status: 422,
            message: "coverage out of range".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Backend rejected request (422): coverage out of range"
        );
    }

    #[test]
    fn test_rate_limited_error() {
        let err = BackendError::RateLimited(60);
        assert_eq!(err.to_string(), "Rate limited, retry after 60 seconds");
    }

    #[test]
    fn test_extract_error_message_error_key() {
        assert_eq!(
            extract_error_message(r#"{"error": "duplicate email"}"#),
            "duplicate email"
        );
    }

    #[test]
    fn test_extract_error_message_message_key() {
        assert_eq!(
            extract_error_message(r#"{"message": "invalid id"}"#),
            "invalid id"
        );
    }

    #[test]
    fn test_extract_error_message_raw_body() {
        assert_eq!(extract_error_message("Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn test_extract_error_message_truncates_long_bodies() {
        let body = "x".repeat(500);
        assert_eq!(extract_error_message(&body).len(), 200);
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        let client = BackendClient::new(&BackendConfig {
            base_url: "http://localhost:5000".to_string(),
        });
        assert_eq!(client.url("policies"), "http://localhost:5000/policies");
        assert_eq!(
            client.url("applications/a1/status"),
            "http://localhost:5000/applications/a1/status"
        );
    }
}
