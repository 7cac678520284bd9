//! `PostgreSQL`-backed customer store.

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use custgate_core::{Customer, CustomerId, Email, NewCustomer};
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    CustomerStore, RepositoryError, StoreResponse, deleted, invalid_id, not_found,
    prepare_customer,
};

/// Customer repository over a connection pool.
#[derive(Debug, Clone)]
pub struct PgCustomerStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct CustomerRow {
    id: Uuid,
    name: String,
    email: String,
    phone: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<CustomerRow> for Customer {
    type Error = RepositoryError;

    fn try_from(row: CustomerRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email for customer {}: {e}", row.id))
        })?;

        Ok(Self {
            id: CustomerId::from_uuid(row.id),
            name: row.name,
            email,
            phone: row.phone,
            created_at: row.created_at,
        })
    }
}

impl PgCustomerStore {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_all(&self) -> Result<Vec<Customer>, RepositoryError> {
        let rows = sqlx::query_as::<_, CustomerRow>(
            r"
            SELECT id, name, email, phone, created_at
            FROM customer
            ORDER BY created_at, id
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Customer::try_from).collect()
    }

    async fn insert(&self, customer: &Customer) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO customer (id, name, email, phone, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(customer.id)
        .bind(&customer.name)
        .bind(customer.email.as_str())
        .bind(&customer.phone)
        .bind(customer.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove(&self, id: CustomerId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM customer WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

impl CustomerStore for PgCustomerStore {
    async fn list(&self) -> StoreResponse {
        match self.fetch_all().await {
            Ok(customers) => StoreResponse::json(StatusCode::OK, &customers),
            Err(e) => e.into(),
        }
    }

    async fn add(&self, customer: NewCustomer) -> StoreResponse {
        let customer = match prepare_customer(customer) {
            Ok(customer) => customer,
            Err(rejection) => return rejection,
        };

        match self.insert(&customer).await {
            Ok(()) => {
                tracing::info!(customer_id = %customer.id, "Customer created");
                StoreResponse::json(StatusCode::CREATED, &customer)
            }
            Err(e) => e.into(),
        }
    }

    async fn delete(&self, id: &str) -> StoreResponse {
        let Ok(customer_id) = id.parse::<CustomerId>() else {
            return invalid_id(id);
        };

        match self.remove(customer_id).await {
            Ok(true) => {
                tracing::info!(customer_id = %customer_id, "Customer deleted");
                deleted()
            }
            Ok(false) => not_found(),
            Err(e) => e.into(),
        }
    }
}
