//! Customer persistence.
//!
//! The request pipeline treats persistence as an opaque collaborator: every
//! operation answers with a [`StoreResponse`] (`status` + JSON `body`) that
//! route handlers relay to the client untouched. Stores are responsible for
//! their own validation and error reporting.
//!
//! Two implementations:
//!
//! - [`PgCustomerStore`] - `PostgreSQL` table `customer`
//! - [`MemoryCustomerStore`] - process-local, used when no `DATABASE_URL` is set
//!
//! # Migrations
//!
//! Migrations live in `crates/server/migrations/` and are embedded into the
//! binary. Run them via:
//! ```bash
//! custgate migrate
//! ```

pub mod customers;
pub mod memory;

use std::future::Future;
use std::time::Duration;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use custgate_core::{Customer, Email, NewCustomer};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::{Value, json};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use customers::PgCustomerStore;
pub use memory::MemoryCustomerStore;

/// Longest accepted customer name, in characters.
pub const MAX_NAME_LENGTH: usize = 200;

/// Longest accepted phone number, in characters.
pub const MAX_PHONE_LENGTH: usize = 40;

/// Errors raised inside a store before they are turned into a response.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored row could not be turned back into a domain value.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Result of a persistence operation, relayed verbatim to the client.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl StoreResponse {
    /// Serialize `body` under `status`.
    pub fn json(status: StatusCode, body: &impl Serialize) -> Self {
        match serde_json::to_value(body) {
            Ok(body) => Self { status, body },
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize store response");
                Self::internal_error()
            }
        }
    }

    /// `{"message": ...}` under `status`.
    #[must_use]
    pub fn message(status: StatusCode, message: &str) -> Self {
        Self {
            status,
            body: json!({ "message": message }),
        }
    }

    /// Generic 500; details stay in the logs.
    #[must_use]
    pub fn internal_error() -> Self {
        Self::message(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }
}

impl From<RepositoryError> for StoreResponse {
    fn from(err: RepositoryError) -> Self {
        tracing::error!(error = %err, "Customer store operation failed");
        Self::internal_error()
    }
}

impl IntoResponse for StoreResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Customer persistence as seen by the route handlers.
///
/// Implementations decide status codes and bodies for every outcome,
/// including failures.
pub trait CustomerStore: Send + Sync + 'static {
    /// All customers, oldest first.
    fn list(&self) -> impl Future<Output = StoreResponse> + Send;

    /// Validate and insert a new customer.
    fn add(&self, customer: NewCustomer) -> impl Future<Output = StoreResponse> + Send;

    /// Remove a customer by the raw id from the request path.
    fn delete(&self, id: &str) -> impl Future<Output = StoreResponse> + Send;
}

/// Turn a request body into a customer record, or the 400 describing why not.
///
/// # Errors
///
/// Returns a `400 Bad Request` [`StoreResponse`] naming the offending field.
pub fn prepare_customer(new: NewCustomer) -> Result<Customer, StoreResponse> {
    let name = new.name.trim();
    if name.is_empty() {
        return Err(bad_request("Customer name is required"));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(bad_request("Customer name is too long"));
    }

    let email = Email::parse(&new.email)
        .map_err(|e| bad_request(&format!("Invalid customer email: {e}")))?;

    let phone = new.phone.trim();
    if phone.chars().count() > MAX_PHONE_LENGTH {
        return Err(bad_request("Customer phone is too long"));
    }

    Ok(Customer::create(name.to_owned(), email, phone.to_owned()))
}

fn bad_request(message: &str) -> StoreResponse {
    StoreResponse::message(StatusCode::BAD_REQUEST, message)
}

fn deleted() -> StoreResponse {
    StoreResponse::message(StatusCode::OK, "Customer deleted")
}

fn not_found() -> StoreResponse {
    StoreResponse::message(StatusCode::NOT_FOUND, "Customer not found")
}

fn invalid_id(raw: &str) -> StoreResponse {
    bad_request(&format!("'{raw}' is not a valid customer id"))
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Apply the embedded migrations.
///
/// # Errors
///
/// Returns `MigrateError` if a migration fails or the history is inconsistent.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
