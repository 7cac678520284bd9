//! Shared fixtures for router-level tests.

#![allow(dead_code, clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::{
    Router,
    body::Body,
    http::{Response, header},
};
use axum_extra::extract::cookie::Cookie;
use custgate_core::NewCustomer;
use custgate_server::{
    build_router,
    config::{RoutePrefixes, SecurityConfig, ServerConfig},
    db::{CustomerStore, MemoryCustomerStore, StoreResponse},
    services::TokenService,
    state::AppState,
};
use secrecy::SecretString;
use serde_json::Value;

pub const COOKIE_NAME: &str = "authCookie";
pub const JWT_SECRET: &str = "R0ut3r-T3st-Sign1ng-K3y-9f8e7d6c5b4a";

pub fn security_config(secret: &str) -> SecurityConfig {
    SecurityConfig {
        jwt_secret: SecretString::from(secret),
        cookie_name: COOKIE_NAME.to_owned(),
        secure_cookies: false,
    }
}

pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        base_url: "http://localhost:8080".to_owned(),
        routes: RoutePrefixes::default(),
        security: security_config(JWT_SECRET),
        database_url: None,
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// A token service sharing the router's signing secret.
pub fn tokens() -> TokenService {
    TokenService::new(&security_config(JWT_SECRET))
}

/// Counts every store call so tests can prove a handler never ran.
#[derive(Clone, Default)]
pub struct RecordingStore {
    inner: Arc<MemoryCustomerStore>,
    calls: Arc<AtomicUsize>,
}

impl RecordingStore {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl CustomerStore for RecordingStore {
    async fn list(&self) -> StoreResponse {
        self.record();
        self.inner.list().await
    }

    async fn add(&self, customer: NewCustomer) -> StoreResponse {
        self.record();
        self.inner.add(customer).await
    }

    async fn delete(&self, id: &str) -> StoreResponse {
        self.record();
        self.inner.delete(id).await
    }
}

/// The router under test plus a handle on its store.
pub fn app() -> (Router, RecordingStore) {
    let store = RecordingStore::default();
    let router = build_router(AppState::new(test_config(), store.clone()));
    (router, store)
}

/// Every `Set-Cookie` on a response, parsed.
pub fn set_cookies(response: &Response<Body>) -> Vec<Cookie<'static>> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| Cookie::parse(v.to_str().unwrap().to_owned()).unwrap())
        .collect()
}

pub fn find_cookie<'a>(cookies: &'a [Cookie<'static>], name: &str) -> &'a Cookie<'static> {
    cookies
        .iter()
        .find(|c| c.name() == name)
        .unwrap_or_else(|| panic!("missing cookie {name}"))
}

/// A `Cookie` request header value.
pub fn cookie_header(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("; ")
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
