//! Session issuance.
//!
//! `registerToken` is gate-exempt: it mints a session for a fixed identity
//! without checking any credentials. It is the bootstrap path that gets a
//! client its first session cookie, and the only place cookies are written.

use axum::{Json, extract::State};
use axum_extra::extract::{
    CookieJar,
    cookie::{Cookie, SameSite},
};
use custgate_core::IdentityClaims;
use serde_json::{Value, json};

use crate::error::{AppError, Result};
use crate::middleware::CurrentIdentity;
use crate::services::csrf::{CSRF_SECRET_COOKIE, CSRF_TOKEN_COOKIE};
use crate::services::{CsrfSecret, CsrfToken, SESSION_TTL, SessionToken};
use crate::state::SecurityState;

/// Subject id of the identity minted by `registerToken`.
pub const BOOTSTRAP_SUBJECT_ID: &str = "@johndoe";
/// Display name of the bootstrap identity.
pub const BOOTSTRAP_SUBJECT_NAME: &str = "John Doe";
/// Email of the bootstrap identity.
pub const BOOTSTRAP_SUBJECT_EMAIL: &str = "johndoe@mail.com";

/// The identity every issued session carries.
#[must_use]
pub fn bootstrap_identity() -> IdentityClaims {
    IdentityClaims::new(
        BOOTSTRAP_SUBJECT_ID,
        BOOTSTRAP_SUBJECT_NAME,
        BOOTSTRAP_SUBJECT_EMAIL,
    )
}

/// `GET {auth}/registerToken`: set the session and CSRF cookies.
///
/// A still-valid `_csrf` secret is kept so tokens already handed to other
/// tabs keep working; otherwise a new one is generated.
///
/// # Errors
///
/// Returns `AppError::Token` if the session token cannot be signed, or
/// `AppError::Internal` if the CSRF token cannot be derived.
pub async fn register_token(
    State(security): State<SecurityState>,
    CurrentIdentity(current): CurrentIdentity,
    jar: CookieJar,
) -> Result<(CookieJar, Json<Value>)> {
    let identity = bootstrap_identity();
    let token = security.tokens().issue(&identity)?;

    let secret = jar
        .get(CSRF_SECRET_COOKIE)
        .and_then(|c| CsrfSecret::from_cookie(c.value()))
        .unwrap_or_else(|| security.csrf().issue_secret());
    let csrf_token = security
        .csrf()
        .issue_token(&secret)
        .map_err(|e| AppError::Internal(format!("CSRF token derivation failed: {e}")))?;

    tracing::info!(
        subject_id = %identity.subject_id,
        replaced_session = current.is_some(),
        expires_at = %token.expires_at(),
        "Session token issued"
    );

    let secure = security.secure_cookies();
    let jar = jar
        .add(session_cookie(security.session_cookie(), token, secure))
        .add(csrf_secret_cookie(&secret, secure))
        .add(csrf_token_cookie(&csrf_token, secure));

    Ok((jar, Json(json!({ "message": "User login successful" }))))
}

fn session_cookie(name: &str, token: SessionToken, secure: bool) -> Cookie<'static> {
    Cookie::build((name.to_owned(), token.into_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::seconds(SESSION_TTL.num_seconds()))
        .build()
}

// No Max-Age: the secret lives for the browser session.
fn csrf_secret_cookie(secret: &CsrfSecret, secure: bool) -> Cookie<'static> {
    Cookie::build((CSRF_SECRET_COOKIE, secret.as_str().to_owned()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .path("/")
        .build()
}

// Readable by scripts so the client can echo it in a header.
fn csrf_token_cookie(token: &CsrfToken, secure: bool) -> Cookie<'static> {
    Cookie::build((CSRF_TOKEN_COOKIE, token.as_str().to_owned()))
        .http_only(false)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .build()
}
