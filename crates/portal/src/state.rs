//! Application state shared across handlers.

use std::sync::Arc;

use crate::api::BackendClient;
use crate::config::PortalConfig;
use crate::identity::IdentityClient;
use crate::services::roles::RoleResolver;
use crate::uploads::ImageHostClient;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the backend client and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: PortalConfig,
    backend: BackendClient,
    identity: IdentityClient,
    uploads: ImageHostClient,
    roles: RoleResolver,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Builds the external-service clients from configuration. The role
    /// resolver shares the backend client so its lookups go through the
    /// same connection pool.
    #[must_use]
    pub fn new(config: PortalConfig) -> Self {
        let backend = BackendClient::new(&config.backend);
        let identity = IdentityClient::new(&config.identity);
        let uploads = ImageHostClient::new(&config.image_host);
        let roles = RoleResolver::new(backend.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                backend,
                identity,
                uploads,
                roles,
            }),
        }
    }

    /// Get a reference to the portal configuration.
    #[must_use]
    pub fn config(&self) -> &PortalConfig {
        &self.inner.config
    }

    /// Get a reference to the policy backend client.
    #[must_use]
    pub fn backend(&self) -> &BackendClient {
        &self.inner.backend
    }

    /// Get a reference to the identity provider client.
    #[must_use]
    pub fn identity(&self) -> &IdentityClient {
        &self.inner.identity
    }

    /// Get a reference to the image host client.
    #[must_use]
    pub fn uploads(&self) -> &ImageHostClient {
        &self.inner.uploads
    }

    /// Get a reference to the role resolver.
    #[must_use]
    pub fn roles(&self) -> &RoleResolver {
        &self.inner.roles
    }
}
