//! In-memory mock of the hosted identity provider.
//!
//! Accepts any password the portal's own password gate lets through and
//! mints an opaque token per sign-in. Google sign-in reads test tokens of
//! the form `google:{email}:{name}`. Error bodies use the provider's
//! SCREAMING_SNAKE codes so the portal's error mapping is exercised.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

#[derive(Default)]
struct IdentityState {
    /// Registered accounts, email to display name.
    accounts: Mutex<HashMap<String, String>>,
    /// Tokens minted at sign-in, token to email.
    tokens: Mutex<HashMap<String, String>>,
    /// Revocations received.
    sign_outs: AtomicUsize,
}

/// Handle for the mock identity provider.
#[derive(Clone)]
pub struct IdentityHandle {
    /// Base URL of the mock.
    pub base_url: String,
    state: Arc<IdentityState>,
}

impl IdentityHandle {
    /// Whether an account exists for this email.
    #[must_use]
    pub fn has_account(&self, email: &str) -> bool {
        self.state
            .accounts
            .lock()
            .expect("accounts lock poisoned")
            .contains_key(email)
    }

    /// The provider's current display name for an account.
    #[must_use]
    pub fn display_name(&self, email: &str) -> Option<String> {
        self.state
            .accounts
            .lock()
            .expect("accounts lock poisoned")
            .get(email)
            .cloned()
    }

    /// How many token revocations the provider has received.
    #[must_use]
    pub fn sign_out_count(&self) -> usize {
        self.state.sign_outs.load(Ordering::Relaxed)
    }
}

#[derive(Deserialize)]
struct SignUpBody {
    name: String,
    email: String,
}

#[derive(Deserialize)]
struct SignInBody {
    email: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenBody {
    id_token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateProfileBody {
    id_token: String,
    display_name: String,
}

/// Bind the mock on an ephemeral port and serve it in the background.
///
/// # Panics
///
/// Panics if the listener cannot be bound.
pub async fn spawn() -> IdentityHandle {
    let state = Arc::new(IdentityState::default());

    let app = Router::new()
        .route("/signup", post(sign_up))
        .route("/signin", post(sign_in))
        .route("/signin-google", post(sign_in_google))
        .route("/signout", post(sign_out))
        .route("/update-profile", post(update_profile))
        .with_state(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock identity listener");
    let addr = listener
        .local_addr()
        .expect("Failed to read mock identity address");
    tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("Mock identity server error");
    });

    IdentityHandle {
        base_url: format!("http://{addr}"),
        state,
    }
}

async fn sign_up(
    State(state): State<Arc<IdentityState>>,
    Json(body): Json<SignUpBody>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    {
        let mut accounts = state.accounts.lock().expect("accounts lock poisoned");
        if accounts.contains_key(&body.email) {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "EMAIL_EXISTS" })),
            ));
        }
        accounts.insert(body.email.clone(), body.name.clone());
    }
    Ok(Json(mint_user(&state, &body.email, Some(&body.name))))
}

async fn sign_in(
    State(state): State<Arc<IdentityState>>,
    Json(body): Json<SignInBody>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let name = {
        let accounts = state.accounts.lock().expect("accounts lock poisoned");
        accounts.get(&body.email).cloned()
    };
    let Some(name) = name else {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "EMAIL_NOT_FOUND" })),
        ));
    };
    Ok(Json(mint_user(&state, &body.email, Some(&name))))
}

async fn sign_in_google(
    State(state): State<Arc<IdentityState>>,
    Json(body): Json<TokenBody>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let mut parts = body.id_token.splitn(3, ':');
    let (Some("google"), Some(email), Some(name)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "INVALID_ID_TOKEN" })),
        ));
    };

    // Provision on first Google sign-in; an existing account keeps its name
    let name = {
        let mut accounts = state.accounts.lock().expect("accounts lock poisoned");
        accounts
            .entry(email.to_string())
            .or_insert_with(|| name.to_string())
            .clone()
    };
    Ok(Json(mint_user(&state, email, Some(&name))))
}

async fn sign_out(
    State(state): State<Arc<IdentityState>>,
    Json(body): Json<TokenBody>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    require_token(&state, &body.id_token)?;
    state.sign_outs.fetch_add(1, Ordering::Relaxed);
    Ok(Json(json!({ "success": true })))
}

async fn update_profile(
    State(state): State<Arc<IdentityState>>,
    Json(body): Json<UpdateProfileBody>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let email = require_token(&state, &body.id_token)?;
    state
        .accounts
        .lock()
        .expect("accounts lock poisoned")
        .insert(email, body.display_name);
    Ok(Json(json!({ "success": true })))
}

fn require_token(
    state: &IdentityState,
    token: &str,
) -> Result<String, (StatusCode, Json<Value>)> {
    state
        .tokens
        .lock()
        .expect("tokens lock poisoned")
        .get(token)
        .cloned()
        .ok_or((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "INVALID_ID_TOKEN" })),
        ))
}

fn mint_user(state: &IdentityState, email: &str, display_name: Option<&str>) -> Value {
    let token = format!("tok-{}", Uuid::new_v4());
    state
        .tokens
        .lock()
        .expect("tokens lock poisoned")
        .insert(token.clone(), email.to_string());
    json!({
        "email": email,
        "displayName": display_name,
        "photoUrl": null,
        "idToken": token,
    })
}
