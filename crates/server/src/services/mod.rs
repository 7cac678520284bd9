//! Stateless security services used by the request pipeline.
//!
//! - [`token`] - session token signing and verification
//! - [`csrf`] - anti-forgery token issuance and validation

pub mod csrf;
pub mod token;

pub use csrf::{CsrfError, CsrfGuard, CsrfSecret, CsrfToken};
pub use token::{InvalidTokenError, SESSION_TTL, SessionToken, TokenError, TokenService};
