//! Router assembly.
//!
//! Kept separate from `main` so tests drive exactly the router the binary
//! serves. Sentry layers are added by the binary on top.

use std::time::Duration;

use axum::{
    Router,
    extract::Request,
    http::Response,
    middleware::{from_fn, from_fn_with_state},
};
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultOnResponse, OnResponse, TraceLayer},
};
use tracing::Span;

use crate::db::CustomerStore;
use crate::middleware::{
    authorization_gate, csrf_protection, record_stats, request_id_middleware, resolve_identity,
    security_headers_middleware,
};
use crate::routes;
use crate::state::AppState;

/// Build the application router with the full middleware pipeline.
///
/// Layers listed last run first. A request passes, in order: tracing,
/// request id, CORS, compression, security headers, stats, session, gate,
/// CSRF.
pub fn build_router<S: CustomerStore>(state: AppState<S>) -> Router {
    let security = state.security().clone();
    let stats = state.stats().clone();

    routes::routes(&state.config().routes)
        .layer(from_fn_with_state(security.clone(), csrf_protection))
        .layer(from_fn_with_state(security.clone(), authorization_gate))
        .layer(from_fn_with_state(security, resolve_identity))
        .layer(from_fn_with_state(stats, record_stats))
        .layer(from_fn(security_headers_middleware))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        subject_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &Response<_>, latency: Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}
