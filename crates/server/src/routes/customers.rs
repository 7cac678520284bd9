//! Customer route handlers.
//!
//! Handlers only run for verified, CSRF-checked requests. They pass the
//! request to the [`CustomerStore`] and relay its status and body untouched.

use axum::{
    Form, Json,
    extract::{FromRequest, Path, Request, State},
};
use custgate_core::NewCustomer;

use crate::db::{CustomerStore, StoreResponse};
use crate::error::AppError;
use crate::middleware::{Authenticated, has_form_body};
use crate::state::AppState;

/// A customer body sent as JSON or as a urlencoded form.
#[derive(Debug)]
pub struct CustomerPayload(pub NewCustomer);

impl<S: Send + Sync> FromRequest<S> for CustomerPayload {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, AppError> {
        let parsed = if has_form_body(req.headers()) {
            Form::<NewCustomer>::from_request(req, state)
                .await
                .map(|Form(customer)| customer)
                .map_err(|rejection| rejection.body_text())
        } else {
            Json::<NewCustomer>::from_request(req, state)
                .await
                .map(|Json(customer)| customer)
                .map_err(|rejection| rejection.body_text())
        };

        parsed.map(Self).map_err(|detail| {
            tracing::debug!(error = %detail, "Rejected customer payload");
            AppError::BadRequest(detail)
        })
    }
}

/// `GET {customer}/getCustomer`
pub async fn get_customer<S: CustomerStore>(
    State(state): State<AppState<S>>,
    Authenticated(identity): Authenticated,
) -> StoreResponse {
    tracing::debug!(subject_id = %identity.subject_id, "Listing customers");
    state.store().list().await
}

/// `POST {customer}/addCustomer` with a `{name, email, phone}` body, JSON
/// or urlencoded.
///
/// A body that is neither is answered with `400` by [`CustomerPayload`].
/// Field validation is the store's job.
pub async fn add_customer<S: CustomerStore>(
    State(state): State<AppState<S>>,
    Authenticated(identity): Authenticated,
    CustomerPayload(customer): CustomerPayload,
) -> StoreResponse {
    let response = state.store().add(customer).await;
    tracing::info!(
        subject_id = %identity.subject_id,
        status = response.status.as_u16(),
        "Add customer"
    );
    response
}

/// `DELETE {customer}/deleteCustomer/{id}`
///
/// The raw path segment goes to the store, which decides what a malformed
/// id means.
pub async fn delete_customer<S: CustomerStore>(
    State(state): State<AppState<S>>,
    Authenticated(identity): Authenticated,
    Path(id): Path<String>,
) -> StoreResponse {
    let response = state.store().delete(&id).await;
    tracing::info!(
        subject_id = %identity.subject_id,
        customer_id = %id,
        status = response.status.as_u16(),
        "Delete customer"
    );
    response
}
