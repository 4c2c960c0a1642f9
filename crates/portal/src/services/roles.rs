//! Memoized role resolution.
//!
//! Every gated request needs the caller's role, but the backend only needs
//! to be asked once per user per TTL window. The resolver memoizes
//! successful lookups keyed by email and coalesces concurrent lookups for
//! the same email into a single backend call.
//!
//! Failures are never cached: a user who hit a backend blip gets a fresh
//! lookup on their next request instead of five minutes of no access. And
//! a failed lookup yields an error, not a default role, so no one is ever
//! promoted by an outage.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use secrecy::SecretString;
use thiserror::Error;
use tracing::{debug, instrument};

use aegis_core::{Email, Role};

use crate::api::{BackendClient, BackendError};

/// How long a resolved role stays fresh.
const ROLE_TTL: Duration = Duration::from_secs(300);

/// Errors from role resolution.
#[derive(Debug, Error)]
pub enum RoleError {
    /// The backend lookup failed. The caller has no role, not a default one.
    #[error("role lookup failed: {0}")]
    Lookup(#[source] Arc<BackendError>),
}

/// Resolves emails to roles with memoization.
#[derive(Clone)]
pub struct RoleResolver {
    backend: BackendClient,
    cache: Cache<String, Role>,
}

impl RoleResolver {
    /// Create a new resolver backed by the given client.
    #[must_use]
    pub fn new(backend: BackendClient) -> Self {
        let cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(ROLE_TTL)
            .build();

        Self { backend, cache }
    }

    /// Resolve the role for an email, authenticating as that user.
    ///
    /// Concurrent calls for the same email share one backend fetch. A
    /// cached role is returned without any network traffic.
    ///
    /// # Errors
    ///
    /// Returns `RoleError::Lookup` if the backend call fails. The failure
    /// is not cached.
    #[instrument(skip(self, token), fields(email = %email))]
    pub async fn resolve(&self, email: &Email, token: &SecretString) -> Result<Role, RoleError> {
        self.cache
            .try_get_with(email.as_str().to_owned(), async {
                debug!("Role cache miss, querying backend");
                let flags = self.backend.check_role(token, email).await?;
                Ok(flags.reduce())
            })
            .await
            .map_err(RoleError::Lookup)
    }

    /// Drop the cached role for an email.
    ///
    /// Called on sign-out and after an admin changes the user's grants.
    pub async fn invalidate(&self, email: &Email) {
        self.cache.invalidate(email.as_str()).await;
    }
}
