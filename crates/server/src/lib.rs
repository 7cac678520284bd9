//! custgate server library.
//!
//! A customer API where every request passes one pipeline: the session
//! cookie is verified, an authorization gate admits verified identities,
//! and state-changing requests must carry a CSRF token. Exposed as a library
//! so the router can be tested and reused.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use app::build_router;
