//! Authorization gate.
//!
//! The single allow/deny checkpoint. A request passes when the session
//! middleware attached a verified identity, or when its route is listed in
//! [`GateExemptions`]. Everything else, unknown paths included, gets
//! `401 {"message": "User Unauthorized"}`.

use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::session::RequestIdentity;
use crate::error::AppError;
use crate::state::SecurityState;

/// Outcome of the gate for a non-exempt request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allow,
    Deny,
}

/// Admit exactly the requests that carry a verified identity.
#[must_use]
pub const fn admit(identity: &RequestIdentity) -> Admission {
    if identity.is_authenticated() {
        Admission::Allow
    } else {
        Admission::Deny
    }
}

/// A route that runs without passing the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExemptRoute {
    pub method: Method,
    pub path: String,
}

impl ExemptRoute {
    /// Exempt `GET path` (and the implied `HEAD`).
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
        }
    }

    fn matches(&self, method: &Method, path: &str) -> bool {
        let method_matches =
            self.method == *method || (self.method == Method::GET && *method == Method::HEAD);
        method_matches && self.path == path
    }
}

/// The declared list of gate-exempt routes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GateExemptions(Vec<ExemptRoute>);

impl GateExemptions {
    #[must_use]
    pub const fn new(routes: Vec<ExemptRoute>) -> Self {
        Self(routes)
    }

    /// Whether `method path` bypasses the gate. Paths compare exactly.
    #[must_use]
    pub fn is_exempt(&self, method: &Method, path: &str) -> bool {
        self.0.iter().any(|route| route.matches(method, path))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExemptRoute> {
        self.0.iter()
    }
}

/// Reject requests without a verified identity unless their route is exempt.
pub async fn authorization_gate(
    State(security): State<SecurityState>,
    request: Request,
    next: Next,
) -> Response {
    if security
        .exemptions()
        .is_exempt(request.method(), request.uri().path())
    {
        return next.run(request).await;
    }

    let admission = match request.extensions().get::<RequestIdentity>() {
        Some(identity) => admit(identity),
        None => {
            tracing::error!(
                path = %request.uri().path(),
                "Identity not resolved before the authorization gate"
            );
            Admission::Deny
        }
    };

    match admission {
        Admission::Allow => next.run(request).await,
        Admission::Deny => {
            tracing::debug!(
                method = %request.method(),
                path = %request.uri().path(),
                "Request denied by authorization gate"
            );
            AppError::Unauthorized.into_response()
        }
    }
}
