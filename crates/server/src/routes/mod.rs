//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                              - Health check (exempt)
//! GET    /stats                               - Request counters and latency (exempt)
//!
//! # Auth (mounted at AUTH_PREFIX, default /auth)
//! GET    {auth}/registerToken                 - Mint a session and CSRF cookies (exempt)
//!
//! # Customers (mounted at CUSTOMER_PREFIX, default /customer)
//! GET    {customer}/getCustomer               - List customers
//! POST   {customer}/addCustomer               - Create a customer (CSRF)
//! DELETE {customer}/deleteCustomer/{id}       - Delete a customer (CSRF)
//! ```
//!
//! Anything else falls through to a JSON 404, after the gate.

pub mod auth;
pub mod customers;

use axum::{
    Json, Router,
    extract::State,
    routing::{delete, get, post},
};

use crate::config::RoutePrefixes;
use crate::db::CustomerStore;
use crate::error::AppError;
use crate::middleware::{ExemptRoute, GateExemptions, RequestStats, StatsSnapshot};
use crate::state::AppState;

/// Path of the session issuance route under the auth prefix.
pub const REGISTER_TOKEN_PATH: &str = "/registerToken";

/// Path of the health check.
pub const HEALTH_PATH: &str = "/health";

/// Path of the request statistics endpoint.
pub const STATS_PATH: &str = "/stats";

/// Routes the authorization gate lets through without a session.
#[must_use]
pub fn gate_exemptions(prefixes: &RoutePrefixes) -> GateExemptions {
    GateExemptions::new(vec![
        ExemptRoute::get(format!("{}{REGISTER_TOKEN_PATH}", prefixes.auth)),
        ExemptRoute::get(HEALTH_PATH),
        ExemptRoute::get(STATS_PATH),
    ])
}

/// Create the auth routes router.
pub fn auth_routes<S: CustomerStore>() -> Router<AppState<S>> {
    Router::new().route(REGISTER_TOKEN_PATH, get(auth::register_token))
}

/// Create the customer routes router.
pub fn customer_routes<S: CustomerStore>() -> Router<AppState<S>> {
    Router::new()
        .route("/getCustomer", get(customers::get_customer::<S>))
        .route("/addCustomer", post(customers::add_customer::<S>))
        .route("/deleteCustomer/{id}", delete(customers::delete_customer::<S>))
}

/// Create all routes.
pub fn routes<S: CustomerStore>(prefixes: &RoutePrefixes) -> Router<AppState<S>> {
    Router::new()
        .route(HEALTH_PATH, get(health))
        .route(STATS_PATH, get(stats))
        .nest(&prefixes.auth, auth_routes())
        .nest(&prefixes.customer, customer_routes())
        .fallback(not_found)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Request counters since startup.
async fn stats(State(stats): State<RequestStats>) -> Json<StatsSnapshot> {
    Json(stats.snapshot())
}

async fn not_found() -> AppError {
    AppError::NotFound
}
