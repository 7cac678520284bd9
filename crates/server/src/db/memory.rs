//! Process-local customer store.
//!
//! Same status semantics as [`super::PgCustomerStore`]; contents are lost on
//! restart.

use axum::http::StatusCode;
use custgate_core::{Customer, CustomerId, NewCustomer};
use tokio::sync::RwLock;

use super::{CustomerStore, StoreResponse, deleted, invalid_id, not_found, prepare_customer};

/// Customers held in insertion order behind an async lock.
#[derive(Debug, Default)]
pub struct MemoryCustomerStore {
    customers: RwLock<Vec<Customer>>,
}

impl MemoryCustomerStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored customers.
    pub async fn len(&self) -> usize {
        self.customers.read().await.len()
    }

    /// Whether the store holds no customers.
    pub async fn is_empty(&self) -> bool {
        self.customers.read().await.is_empty()
    }
}

impl CustomerStore for MemoryCustomerStore {
    async fn list(&self) -> StoreResponse {
        let customers = self.customers.read().await;
        StoreResponse::json(StatusCode::OK, &*customers)
    }

    async fn add(&self, customer: NewCustomer) -> StoreResponse {
        let customer = match prepare_customer(customer) {
            Ok(customer) => customer,
            Err(rejection) => return rejection,
        };

        let response = StoreResponse::json(StatusCode::CREATED, &customer);
        tracing::info!(customer_id = %customer.id, "Customer created");
        self.customers.write().await.push(customer);
        response
    }

    async fn delete(&self, id: &str) -> StoreResponse {
        let Ok(customer_id) = id.parse::<CustomerId>() else {
            return invalid_id(id);
        };

        let mut customers = self.customers.write().await;
        let before = customers.len();
        customers.retain(|c| c.id != customer_id);

        if customers.len() == before {
            not_found()
        } else {
            tracing::info!(customer_id = %customer_id, "Customer deleted");
            deleted()
        }
    }
}
