//! Live-server integration tests for custgate.
//!
//! # Running Tests
//!
//! ```bash
//! # Start a server (in-memory store is fine)
//! JWT_SECRET=$(custgate secret) COOKIE_NAME=authCookie cargo run -p custgate-server
//!
//! # Run the ignored tests against it
//! cargo test -p custgate-integration-tests -- --ignored
//! ```
//!
//! `CUSTGATE_BASE_URL` overrides the default `http://localhost:8080`.

use reqwest::{Client, StatusCode};

/// Header the client echoes the anti-forgery token in.
pub const CSRF_HEADER: &str = "x-xsrf-token";

/// Base URL of the server under test.
#[must_use]
pub fn base_url() -> String {
    std::env::var("CUSTGATE_BASE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string())
}

/// Absolute URL for `path`.
#[must_use]
pub fn url(path: &str) -> String {
    format!("{}{path}", base_url().trim_end_matches('/'))
}

/// A client that keeps cookies between requests, like a browser.
///
/// # Panics
///
/// Panics if the HTTP client cannot be built.
#[must_use]
pub fn browser() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// Obtain a session and return the anti-forgery token to echo.
///
/// # Panics
///
/// Panics if the server does not answer 200 with an `xsrf-token` cookie.
pub async fn register(client: &Client) -> String {
    let resp = client
        .get(url("/auth/registerToken"))
        .send()
        .await
        .expect("Failed to reach registerToken");
    assert_eq!(resp.status(), StatusCode::OK);

    resp.cookies()
        .find(|c| c.name() == "xsrf-token")
        .map(|c| c.value().to_owned())
        .expect("registerToken did not set xsrf-token")
}
