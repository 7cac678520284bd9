//! Customer records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::email::Email;
use super::id::CustomerId;

/// A stored customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub email: Email,
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

/// Request body for creating a customer.
///
/// Fields are raw strings: the store decides what is acceptable and answers
/// with its own status code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCustomer {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

impl Customer {
    /// Materialize a new customer with a generated id, stamped now.
    #[must_use]
    pub fn create(name: String, email: Email, phone: String) -> Self {
        Self {
            id: CustomerId::generate(),
            name,
            email,
            phone,
            created_at: Utc::now(),
        }
    }
}
