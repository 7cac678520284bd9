//! Identity extractors for route handlers.
//!
//! Both read the [`RequestIdentity`] that `resolve_identity` attached; neither
//! touches cookies or tokens itself.

use axum::{extract::FromRequestParts, http::request::Parts};
use custgate_core::IdentityClaims;

use super::session::RequestIdentity;
use crate::error::AppError;

/// Extractor that requires a verified session.
///
/// Behind the authorization gate this never rejects; it exists so handlers
/// state their requirement in their signature.
///
/// # Example
///
/// ```rust,ignore
/// async fn whoami(Authenticated(claims): Authenticated) -> String {
///     claims.subject_name
/// }
/// ```
pub struct Authenticated(pub IdentityClaims);

impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestIdentity>()
            .and_then(RequestIdentity::claims)
            .cloned()
            .map(Self)
            .ok_or(AppError::Unauthorized)
    }
}

/// Extractor that optionally gets the verified identity.
///
/// Used by gate-exempt handlers, which run for anonymous callers too.
pub struct CurrentIdentity(pub Option<IdentityClaims>);

impl<S> FromRequestParts<S> for CurrentIdentity
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let claims = parts
            .extensions
            .get::<RequestIdentity>()
            .and_then(RequestIdentity::claims)
            .cloned();

        Ok(Self(claims))
    }
}
