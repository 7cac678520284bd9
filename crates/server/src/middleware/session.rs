//! Session cookie verification.
//!
//! Runs on every request, before the authorization gate. Each request moves
//! through `NoCookie -> CookiePresent -> {Verified, Rejected}` and leaves with
//! exactly one [`RequestIdentity`] in its extensions. A rejected token is not
//! an error here: the request continues anonymously and the gate makes the
//! single allow/deny decision.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use custgate_core::IdentityClaims;
use tracing::Span;

use crate::error::set_sentry_user;
use crate::services::TokenService;
use crate::state::SecurityState;

/// The identity resolved for the current request.
///
/// `None` covers a missing cookie and every kind of failed verification
/// alike; callers cannot tell them apart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestIdentity(Option<IdentityClaims>);

impl RequestIdentity {
    /// A request without a usable session.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self(None)
    }

    /// A request whose session token verified.
    #[must_use]
    pub const fn verified(claims: IdentityClaims) -> Self {
        Self(Some(claims))
    }

    /// The verified claims, if any.
    #[must_use]
    pub const fn claims(&self) -> Option<&IdentityClaims> {
        self.0.as_ref()
    }

    /// Whether a session token verified.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.0.is_some()
    }

    /// Take the claims out.
    #[must_use]
    pub fn into_claims(self) -> Option<IdentityClaims> {
        self.0
    }
}

/// Resolve the identity carried by a session cookie value.
#[must_use]
pub fn identify(tokens: &TokenService, session_cookie: Option<&str>) -> RequestIdentity {
    let Some(token) = session_cookie else {
        tracing::trace!("No session cookie");
        return RequestIdentity::anonymous();
    };

    match tokens.verify(token) {
        Ok(claims) => RequestIdentity::verified(claims),
        Err(reason) => {
            tracing::debug!(%reason, "Session token rejected");
            RequestIdentity::anonymous()
        }
    }
}

/// Attach a [`RequestIdentity`] to every request. Never rejects, never
/// writes cookies.
pub async fn resolve_identity(
    State(security): State<SecurityState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let cookie = jar.get(security.session_cookie()).map(|c| c.value());
    let identity = identify(security.tokens(), cookie);

    if let Some(claims) = identity.claims() {
        Span::current().record("subject_id", claims.subject_id.as_str());
        set_sentry_user(&claims.subject_id, Some(&claims.subject_email));
    }

    request.extensions_mut().insert(identity);
    next.run(request).await
}
