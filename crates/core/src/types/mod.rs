//! Domain types for custgate.

pub mod customer;
pub mod email;
pub mod id;
pub mod identity;

pub use customer::{Customer, NewCustomer};
pub use email::{Email, EmailError};
pub use id::{CustomerId, CustomerIdError};
pub use identity::IdentityClaims;
