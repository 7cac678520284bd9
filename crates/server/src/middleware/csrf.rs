//! Anti-forgery check for state-changing requests.
//!
//! Runs after the authorization gate. Safe methods pass untouched; anything
//! else must present a token derived from the `_csrf` secret cookie, or it is
//! answered with `403` before the handler runs.
//!
//! The token is looked up in the `_csrf` form field, then the `_csrf` query
//! parameter, then the [`CSRF_TOKEN_HEADERS`] in order. Form bodies are
//! buffered up to [`MAX_FORM_BYTES`] and handed on intact.

use axum::{
    body::{Body, Bytes},
    extract::{Form, FromRequest, Query, Request, State},
    http::{HeaderMap, Method, header::CONTENT_TYPE},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use crate::error::AppError;
use crate::services::csrf::{CSRF_SECRET_COOKIE, CSRF_TOKEN_HEADERS, CsrfSecret};
use crate::state::SecurityState;

/// Largest urlencoded body buffered to look for a `_csrf` field.
pub const MAX_FORM_BYTES: usize = 64 * 1024;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

#[derive(Debug, Deserialize)]
struct CsrfField {
    #[serde(rename = "_csrf")]
    token: Option<String>,
}

/// Methods that never change server state and skip validation.
#[must_use]
pub fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Whether the request declares a urlencoded form body.
#[must_use]
pub fn has_form_body(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(FORM_CONTENT_TYPE))
}

/// `_csrf` from a urlencoded body. Undecodable bodies carry no token.
async fn form_token(bytes: Bytes) -> Option<String> {
    let request = Request::builder()
        .method(Method::POST)
        .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
        .body(Body::from(bytes))
        .ok()?;
    Form::<CsrfField>::from_request(request, &())
        .await
        .ok()
        .and_then(|Form(field)| field.token)
}

/// Pull `_csrf` out of a form body, returning the request with its body
/// restored.
async fn take_form_token(request: Request) -> Result<(Request, Option<String>), AppError> {
    if !has_form_body(request.headers()) {
        return Ok((request, None));
    }

    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, MAX_FORM_BYTES)
        .await
        .map_err(|e| {
            tracing::debug!(error = %e, "Could not buffer form body");
            AppError::BadRequest("Unreadable request body".to_string())
        })?;
    let token = form_token(bytes.clone()).await;
    Ok((Request::from_parts(parts, Body::from(bytes)), token))
}

/// The token echoed outside the body: `?_csrf=` first, then the headers.
fn client_token(request: &Request) -> Option<String> {
    let from_query = Query::<CsrfField>::try_from_uri(request.uri())
        .ok()
        .and_then(|Query(q)| q.token);

    from_query.or_else(|| {
        CSRF_TOKEN_HEADERS.iter().find_map(|name| {
            request
                .headers()
                .get(*name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned)
        })
    })
}

/// Reject state-changing requests whose token does not match the secret cookie.
pub async fn csrf_protection(
    State(security): State<SecurityState>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    if is_safe_method(request.method()) {
        return next.run(request).await;
    }

    let (request, body_token) = match take_form_token(request).await {
        Ok(taken) => taken,
        Err(e) => return e.into_response(),
    };

    let secret = jar
        .get(CSRF_SECRET_COOKIE)
        .and_then(|c| CsrfSecret::from_cookie(c.value()));
    let token = body_token.or_else(|| client_token(&request));

    match security.csrf().validate(secret.as_ref(), token.as_deref()) {
        Ok(()) => next.run(request).await,
        Err(reason) => {
            tracing::warn!(
                %reason,
                method = %request.method(),
                path = %request.uri().path(),
                "CSRF validation failed"
            );
            AppError::Csrf(reason).into_response()
        }
    }
}
