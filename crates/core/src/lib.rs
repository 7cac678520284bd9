//! custgate core - shared domain types.
//!
//! Used by:
//! - `server` - the HTTP service (session pipeline and customer routes)
//! - `cli` - migrations and token tooling
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no HTTP.
//! Database encoding for the newtypes is available behind the `postgres`
//! feature.
//!
//! # Modules
//!
//! - [`types`] - Customer records, identity claims, and validated newtypes

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
