//! Application state shared across handlers and middleware.

use std::sync::Arc;

use axum::extract::FromRef;

use crate::config::ServerConfig;
use crate::db::CustomerStore;
use crate::middleware::{GateExemptions, RequestStats};
use crate::routes;
use crate::services::{CsrfGuard, TokenService};

/// Everything the security middleware needs, built once at startup.
///
/// Cheaply cloneable via `Arc`; extracted from [`AppState`] with `FromRef`
/// so the middleware does not depend on the store type.
#[derive(Clone, Debug)]
pub struct SecurityState {
    inner: Arc<SecurityInner>,
}

#[derive(Debug)]
struct SecurityInner {
    tokens: TokenService,
    csrf: CsrfGuard,
    exemptions: GateExemptions,
    session_cookie: String,
    secure_cookies: bool,
}

impl SecurityState {
    /// Derive keys and the exemption list from configuration.
    #[must_use]
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            inner: Arc::new(SecurityInner {
                tokens: TokenService::new(&config.security),
                csrf: CsrfGuard,
                exemptions: routes::gate_exemptions(&config.routes),
                session_cookie: config.security.cookie_name.clone(),
                secure_cookies: config.security.secure_cookies,
            }),
        }
    }

    /// Session token signer/verifier.
    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.inner.tokens
    }

    /// Anti-forgery token issuer/validator.
    #[must_use]
    pub fn csrf(&self) -> &CsrfGuard {
        &self.inner.csrf
    }

    /// Routes that bypass the authorization gate.
    #[must_use]
    pub fn exemptions(&self) -> &GateExemptions {
        &self.inner.exemptions
    }

    /// Name of the session cookie.
    #[must_use]
    pub fn session_cookie(&self) -> &str {
        &self.inner.session_cookie
    }

    /// Whether cookies carry the `Secure` attribute.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.inner.secure_cookies
    }
}

/// Application state: configuration, security services, request counters
/// and the customer store.
pub struct AppState<S> {
    inner: Arc<AppStateInner<S>>,
}

struct AppStateInner<S> {
    config: ServerConfig,
    security: SecurityState,
    stats: RequestStats,
    store: S,
}

// Manual impl: cloning the `Arc` must not require `S: Clone`.
impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: CustomerStore> AppState<S> {
    /// Create the application state.
    #[must_use]
    pub fn new(config: ServerConfig, store: S) -> Self {
        let security = SecurityState::new(&config);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                security,
                stats: RequestStats::new(),
                store,
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the security services.
    #[must_use]
    pub fn security(&self) -> &SecurityState {
        &self.inner.security
    }

    /// Get a reference to the request counters.
    #[must_use]
    pub fn stats(&self) -> &RequestStats {
        &self.inner.stats
    }

    /// Get a reference to the customer store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.inner.store
    }
}

impl<S: CustomerStore> FromRef<AppState<S>> for SecurityState {
    fn from_ref(state: &AppState<S>) -> Self {
        state.inner.security.clone()
    }
}

impl<S: CustomerStore> FromRef<AppState<S>> for RequestStats {
    fn from_ref(state: &AppState<S>) -> Self {
        state.inner.stats.clone()
    }
}
