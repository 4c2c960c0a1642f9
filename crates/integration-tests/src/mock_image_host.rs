//! In-memory mock of the image host.
//!
//! Swallows whatever multipart body arrives and hands back a hosted URL in
//! the host's `{"success": true, "data": {"url": ...}}` envelope.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};

/// Handle for the mock image host.
#[derive(Clone)]
pub struct ImageHostHandle {
    /// Base URL of the mock.
    pub base_url: String,
    uploads: Arc<AtomicUsize>,
}

impl ImageHostHandle {
    /// How many uploads the host has accepted.
    #[must_use]
    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::Relaxed)
    }
}

/// Bind the mock on an ephemeral port and serve it in the background.
///
/// # Panics
///
/// Panics if the listener cannot be bound.
pub async fn spawn() -> ImageHostHandle {
    let uploads = Arc::new(AtomicUsize::new(0));

    let app = Router::new()
        .route("/upload", post(upload))
        .with_state(Arc::clone(&uploads));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock image host listener");
    let addr = listener
        .local_addr()
        .expect("Failed to read mock image host address");
    tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("Mock image host server error");
    });

    ImageHostHandle {
        base_url: format!("http://{addr}"),
        uploads,
    }
}

async fn upload(State(uploads): State<Arc<AtomicUsize>>, _body: Bytes) -> Json<Value> {
    let n = uploads.fetch_add(1, Ordering::Relaxed) + 1;
    Json(json!({
        "success": true,
        "data": { "url": format!("https://images.test/u{n}.png") },
    }))
}
