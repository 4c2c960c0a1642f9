//! Integration test harness for the Aegis portal.
//!
//! Boots the real portal router in-process and points it at mock backend,
//! identity, and image host servers, all on ephemeral localhost ports. The
//! tests drive the portal over plain HTTP exactly as a browser would, with
//! cookies, forwarded-IP headers, and JSON bodies, so sessions, access
//! gates, and rate limits are exercised for real; only the external
//! services are substituted.
//!
//! # Usage
//!
//! ```rust,ignore
//! let portal = TestPortal::spawn().await;
//! portal.backend.seed_policy("Term Life Shield", "term-life");
//!
//! let maria = portal.session();
//! maria.sign_up("Maria Gomez", "maria@example.com").await;
//! let resp = maria.get("/api/policies").await;
//! assert_eq!(resp.status(), StatusCode::OK);
//! ```
//!
//! Each [`TestPortal`] is fully isolated: its own listeners, its own
//! session store, its own rate limiter state, its own mock data. Tests
//! never share state through a database.

pub mod mock_backend;
pub mod mock_identity;
pub mod mock_image_host;

pub use mock_backend::BackendHandle;
pub use mock_identity::IdentityHandle;
pub use mock_image_host::ImageHostHandle;

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use reqwest::{Client, Method, Response, StatusCode};
use secrecy::SecretString;
use serde_json::{Value, json};

use aegis_portal::config::{BackendConfig, IdentityConfig, ImageHostConfig, PortalConfig};
use aegis_portal::state::AppState;
use aegis_portal::{middleware, routes};

/// Password used for every test account. The mock identity provider accepts
/// anything the portal's own password gate lets through.
pub const TEST_PASSWORD: &str = "v9!Kq2#xT7$mW4z";

/// A portal instance listening on an ephemeral port, wired to mocks.
pub struct TestPortal {
    /// Portal base URL, e.g. `http://127.0.0.1:49231`.
    pub base_url: String,
    /// Seeds and inspects the mock policy backend.
    pub backend: BackendHandle,
    /// The mock identity provider.
    pub identity: IdentityHandle,
    /// The mock image host.
    pub image_host: ImageHostHandle,
    next_ip: AtomicUsize,
}

impl TestPortal {
    /// Start the mocks and the portal, returning once all are accepting
    /// connections.
    ///
    /// # Panics
    ///
    /// Panics if a listener cannot be bound; there is no recovering from
    /// that in a test run.
    pub async fn spawn() -> Self {
        let backend = mock_backend::spawn().await;
        let identity = mock_identity::spawn().await;
        let image_host = mock_image_host::spawn().await;

        let config = test_config(&backend.base_url, &identity.base_url, &image_host.base_url);
        let state = AppState::new(config.clone());
        let session_layer = middleware::create_session_layer(&config);

        // Same stack as the server binary, minus the Sentry and
        // request-trace layers.
        let app = axum::Router::new()
            .merge(routes::routes())
            .layer(middleware::api_rate_limiter())
            .layer(axum::middleware::from_fn(
                middleware::security_headers_middleware,
            ))
            .layer(session_layer)
            .layer(axum::middleware::from_fn(middleware::request_id_middleware))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind portal listener");
        let addr = listener.local_addr().expect("Failed to read portal address");
        tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Portal server error");
        });

        Self {
            base_url: format!("http://{addr}"),
            backend,
            identity,
            image_host,
            next_ip: AtomicUsize::new(1),
        }
    }

    /// Open a fresh browser persona with its own cookie jar and client IP.
    ///
    /// Distinct personas get distinct forwarded IPs so one actor's traffic
    /// never eats into another's rate limit quota.
    #[must_use]
    pub fn session(&self) -> PortalClient {
        let n = self.next_ip.fetch_add(1, Ordering::Relaxed);
        PortalClient {
            base_url: self.base_url.clone(),
            ip: format!("203.0.113.{}", (n % 200) + 1),
            client: Client::builder()
                .cookie_store(true)
                .redirect(reqwest::redirect::Policy::none())
                .build()
                .expect("Failed to build HTTP client"),
        }
    }
}

/// One browser persona: a cookie jar plus a stable client IP.
///
/// Redirects are never followed so tests can assert on `Location` headers.
pub struct PortalClient {
    base_url: String,
    ip: String,
    client: Client,
}

impl PortalClient {
    /// GET a portal path.
    pub async fn get(&self, path: &str) -> Response {
        self.request(Method::GET, path, None).await
    }

    /// POST a JSON body to a portal path.
    pub async fn post(&self, path: &str, body: Value) -> Response {
        self.request(Method::POST, path, Some(body)).await
    }

    /// POST with no body.
    pub async fn post_empty(&self, path: &str) -> Response {
        self.request(Method::POST, path, None).await
    }

    /// PUT a JSON body to a portal path.
    pub async fn put(&self, path: &str, body: Value) -> Response {
        self.request(Method::PUT, path, Some(body)).await
    }

    /// PATCH a JSON body to a portal path.
    pub async fn patch(&self, path: &str, body: Value) -> Response {
        self.request(Method::PATCH, path, Some(body)).await
    }

    /// DELETE a portal path.
    pub async fn delete(&self, path: &str) -> Response {
        self.request(Method::DELETE, path, None).await
    }

    /// Send a multipart form to a portal path.
    pub async fn post_multipart(&self, path: &str, form: reqwest::multipart::Form) -> Response {
        self.client
            .request(Method::POST, format!("{}{path}", self.base_url))
            .header("x-forwarded-for", &self.ip)
            .multipart(form)
            .send()
            .await
            .expect("Portal request failed")
    }

    /// Register a new account and establish a session, asserting success.
    ///
    /// Returns the `/auth` response body (`user` and `role`).
    pub async fn sign_up(&self, name: &str, email: &str) -> Value {
        let resp = self
            .post(
                "/auth/sign-up",
                json!({ "name": name, "email": email, "password": TEST_PASSWORD }),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::OK, "sign-up failed for {email}");
        resp.json().await.expect("Failed to parse sign-up response")
    }

    /// Sign in to an existing account, asserting success.
    pub async fn sign_in(&self, email: &str) -> Value {
        let resp = self
            .post(
                "/auth/sign-in",
                json!({ "email": email, "password": TEST_PASSWORD }),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::OK, "sign-in failed for {email}");
        resp.json().await.expect("Failed to parse sign-in response")
    }

    /// End the current session, asserting success.
    pub async fn sign_out(&self) {
        let resp = self.post_empty("/auth/sign-out").await;
        assert_eq!(resp.status(), StatusCode::OK, "sign-out failed");
    }

    async fn request(&self, method: Method, path: &str, body: Option<Value>) -> Response {
        let mut request = self
            .client
            .request(method, format!("{}{path}", self.base_url))
            // The rate limiter keys on the forwarded client IP.
            .header("x-forwarded-for", &self.ip);
        if let Some(body) = body {
            request = request.json(&body);
        }
        request.send().await.expect("Portal request failed")
    }
}

/// Build a portal config pointing at the mock services.
///
/// The base URL is plain HTTP so the session cookie is not marked Secure
/// and survives the test client's non-TLS connection.
fn test_config(backend_url: &str, identity_url: &str, image_host_url: &str) -> PortalConfig {
    PortalConfig {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        base_url: "http://portal.test".to_string(),
        session_secret: SecretString::from("kX9#mP2$vQ7!wR4@zT6%bN1&cJ8*fL3^"),
        backend: BackendConfig {
            base_url: backend_url.to_string(),
        },
        identity: IdentityConfig {
            base_url: identity_url.to_string(),
            api_key: SecretString::from("ik_test_4QmZ8vRw"),
        },
        image_host: ImageHostConfig {
            upload_url: format!("{image_host_url}/upload"),
            api_key: SecretString::from("ib_test_9XrT2kFp"),
        },
        payment_public_key: "pk_test_local".to_string(),
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}
