//! End-to-end tests of the request pipeline: session issuance, the
//! authorization gate, and CSRF protection in front of the customer store.

#![allow(clippy::unwrap_used)]

mod common;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use chrono::{Duration, Utc};
use custgate_server::{
    config::SecurityConfig,
    routes::auth::bootstrap_identity,
    services::{CsrfGuard, SESSION_TTL, TokenService},
};
use secrecy::SecretString;
use serde_json::json;
use tower::ServiceExt as _;

use common::{COOKIE_NAME, app, body_json, cookie_header, find_cookie, set_cookies, tokens};

/// Cookies handed out by `registerToken`.
struct Session {
    token: String,
    csrf_secret: String,
    csrf_token: String,
}

impl Session {
    fn cookies(&self) -> String {
        cookie_header(&[
            (COOKIE_NAME, &self.token),
            ("_csrf", &self.csrf_secret),
            ("xsrf-token", &self.csrf_token),
        ])
    }
}

async fn register(app: &Router) -> Session {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/auth/registerToken")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookies = set_cookies(&response);
    Session {
        token: find_cookie(&cookies, COOKIE_NAME).value().to_owned(),
        csrf_secret: find_cookie(&cookies, "_csrf").value().to_owned(),
        csrf_token: find_cookie(&cookies, "xsrf-token").value().to_owned(),
    }
}

fn get(uri: &str, cookies: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookies) = cookies {
        builder = builder.header(header::COOKIE, cookies);
    }
    builder.body(Body::empty()).unwrap()
}

fn add_customer(cookies: &str, csrf: Option<&str>, body: &serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/customer/addCustomer")
        .header(header::COOKIE, cookies)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = csrf {
        builder = builder.header("x-xsrf-token", token);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn ann() -> serde_json::Value {
    json!({ "name": "Ann Lee", "email": "ann@shop.net", "phone": "555-0100" })
}

#[tokio::test]
async fn register_token_sets_session_and_csrf_cookies() {
    let (app, _) = app();

    let response = app
        .oneshot(get("/auth/registerToken", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookies = set_cookies(&response);
    let session = find_cookie(&cookies, COOKIE_NAME);
    assert_eq!(session.max_age(), Some(time::Duration::seconds(1800)));
    assert_eq!(session.http_only(), Some(true));
    assert_eq!(session.path(), Some("/"));

    let secret = find_cookie(&cookies, "_csrf");
    let token = find_cookie(&cookies, "xsrf-token");
    assert_eq!(secret.http_only(), Some(true));
    assert_ne!(token.value(), secret.value());

    let claims = tokens().verify(session.value()).unwrap();
    assert_eq!(claims, bootstrap_identity());

    assert_eq!(
        body_json(response).await,
        json!({ "message": "User login successful" })
    );
}

#[tokio::test]
async fn register_token_reuses_existing_csrf_secret() {
    let (app, _) = app();
    let first = register(&app).await;

    let response = app
        .oneshot(get(
            "/auth/registerToken",
            Some(&cookie_header(&[("_csrf", &first.csrf_secret)])),
        ))
        .await
        .unwrap();

    let cookies = set_cookies(&response);
    assert_eq!(find_cookie(&cookies, "_csrf").value(), first.csrf_secret);
    assert_ne!(find_cookie(&cookies, "xsrf-token").value(), first.csrf_token);
}

#[tokio::test]
async fn session_cookie_admits_get_customer() {
    let (app, store) = app();
    let session = register(&app).await;

    let response = app
        .oneshot(get("/customer/getCustomer", Some(&session.cookies())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!([]));
    assert_eq!(store.calls(), 1);
}

#[tokio::test]
async fn missing_session_cookie_is_unauthorized() {
    let (app, store) = app();

    let response = app
        .oneshot(get("/customer/getCustomer", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await,
        json!({ "message": "User Unauthorized" })
    );
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn token_signed_with_foreign_secret_is_unauthorized() {
    let (app, store) = app();
    let foreign = TokenService::new(&SecurityConfig {
        jwt_secret: SecretString::from("F0re1gn-K3y-Not-The-Server-0123456"),
        cookie_name: COOKIE_NAME.to_owned(),
        secure_cookies: false,
    });
    let token = foreign.issue(&bootstrap_identity()).unwrap();

    let response = app
        .oneshot(get(
            "/customer/getCustomer",
            Some(&cookie_header(&[(COOKIE_NAME, token.as_str())])),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn expired_session_delete_is_unauthorized() {
    let (app, store) = app();
    let guard = CsrfGuard;
    let secret = guard.issue_secret();
    let csrf = guard.issue_token(&secret).unwrap();
    let expired = tokens()
        .issue_at(
            &bootstrap_identity(),
            Utc::now() - SESSION_TTL - Duration::minutes(1),
        )
        .unwrap();

    let request = Request::builder()
        .method(Method::DELETE)
        .uri("/customer/deleteCustomer/42")
        .header(
            header::COOKIE,
            cookie_header(&[(COOKIE_NAME, expired.as_str()), ("_csrf", secret.as_str())]),
        )
        .header("x-csrf-token", csrf.as_str())
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await,
        json!({ "message": "User Unauthorized" })
    );
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn unknown_routes_are_gated() {
    let (app, _) = app();

    let anonymous = app
        .clone()
        .oneshot(get("/customer/doesNotExist", None))
        .await
        .unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let session = register(&app).await;
    let verified = app
        .oneshot(get("/customer/doesNotExist", Some(&session.cookies())))
        .await
        .unwrap();
    assert_eq!(verified.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn add_customer_without_csrf_token_is_rejected_before_store() {
    let (app, store) = app();
    let session = register(&app).await;

    let response = app
        .oneshot(add_customer(&session.cookies(), None, &ann()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        body_json(response).await,
        json!({ "message": "Invalid CSRF token" })
    );
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn add_customer_with_mismatched_csrf_token_is_rejected() {
    let (app, store) = app();
    let session = register(&app).await;

    let guard = CsrfGuard;
    let other = guard.issue_token(&guard.issue_secret()).unwrap();

    let response = app
        .oneshot(add_customer(&session.cookies(), Some(other.as_str()), &ann()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn add_customer_with_csrf_token_reaches_store() {
    let (app, store) = app();
    let session = register(&app).await;

    let response = app
        .clone()
        .oneshot(add_customer(
            &session.cookies(),
            Some(&session.csrf_token),
            &ann(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["name"], "Ann Lee");
    assert_eq!(created["email"], "ann@shop.net");

    let listed = app
        .oneshot(get("/customer/getCustomer", Some(&session.cookies())))
        .await
        .unwrap();
    let listed = body_json(listed).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(store.calls(), 2);
}

#[tokio::test]
async fn store_rejections_are_relayed_verbatim() {
    let (app, _) = app();
    let session = register(&app).await;

    let response = app
        .clone()
        .oneshot(add_customer(
            &session.cookies(),
            Some(&session.csrf_token),
            &json!({ "name": "Ann", "email": "not-an-email" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let request = Request::builder()
        .method(Method::DELETE)
        .uri("/customer/deleteCustomer/42")
        .header(header::COOKIE, session.cookies())
        .header("csrf-token", &session.csrf_token)
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({ "message": "'42' is not a valid customer id" })
    );
}

#[tokio::test]
async fn delete_customer_accepts_csrf_query_parameter() {
    let (app, _) = app();
    let session = register(&app).await;

    let created = app
        .clone()
        .oneshot(add_customer(
            &session.cookies(),
            Some(&session.csrf_token),
            &ann(),
        ))
        .await
        .unwrap();
    let id = body_json(created).await["id"].as_str().unwrap().to_owned();

    let request = Request::builder()
        .method(Method::DELETE)
        .uri(format!(
            "/customer/deleteCustomer/{id}?_csrf={}",
            session.csrf_token
        ))
        .header(header::COOKIE, session.cookies())
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({ "message": "Customer deleted" })
    );
}

#[tokio::test]
async fn malformed_json_body_is_bad_request() {
    let (app, store) = app();
    let session = register(&app).await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/customer/addCustomer")
        .header(header::COOKIE, session.cookies())
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-xsrf-token", &session.csrf_token)
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn health_is_exempt_and_carries_request_id() {
    let (app, _) = app();

    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "req-123")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "req-123");
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert_eq!(response.headers()["x-frame-options"], "DENY");
}

fn add_customer_form(cookies: &str, body: String) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/customer/addCustomer")
        .header(header::COOKIE, cookies)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn unauthenticated_mutation_without_csrf_is_unauthorized() {
    let (app, store) = app();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/customer/addCustomer")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(ann().to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await,
        json!({ "message": "User Unauthorized" })
    );
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn form_post_with_csrf_field_reaches_store() {
    let (app, store) = app();
    let session = register(&app).await;

    let body = format!(
        "name=Ann&email=ann%40shop.net&phone=555&_csrf={}",
        session.csrf_token
    );
    let response = app
        .oneshot(add_customer_form(&session.cookies(), body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["name"], "Ann");
    assert_eq!(created["email"], "ann@shop.net");
    assert_eq!(created["phone"], "555");
    assert_eq!(store.calls(), 1);
}

#[tokio::test]
async fn form_post_with_csrf_header_reaches_store() {
    let (app, store) = app();
    let session = register(&app).await;

    let mut request = add_customer_form(
        &session.cookies(),
        "name=Ann&email=ann%40shop.net&phone=555".to_owned(),
    );
    request
        .headers_mut()
        .insert("x-xsrf-token", session.csrf_token.parse().unwrap());
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["email"], "ann@shop.net");
    assert_eq!(store.calls(), 1);
}

#[tokio::test]
async fn form_csrf_field_takes_precedence_over_header() {
    let (app, store) = app();
    let session = register(&app).await;

    let mut request = add_customer_form(
        &session.cookies(),
        "name=Ann&email=ann%40shop.net&_csrf=abcdefgh-AAAA".to_owned(),
    );
    request
        .headers_mut()
        .insert("x-xsrf-token", session.csrf_token.parse().unwrap());
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn trace_requests_need_a_csrf_token() {
    let (app, store) = app();
    let session = register(&app).await;

    let request = Request::builder()
        .method(Method::TRACE)
        .uri("/customer/getCustomer")
        .header(header::COOKIE, session.cookies())
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn responses_carry_response_time() {
    let (app, _) = app();

    let health = app.clone().oneshot(get("/health", None)).await.unwrap();
    let value = health.headers()["x-response-time"].to_str().unwrap();
    assert!(value.ends_with("ms"), "{value}");

    let denied = app
        .oneshot(get("/customer/getCustomer", None))
        .await
        .unwrap();
    assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);
    assert!(denied.headers().contains_key("x-response-time"));
}

#[tokio::test]
async fn stats_are_exempt_and_count_per_route() {
    let (app, _) = app();

    app.clone().oneshot(get("/health", None)).await.unwrap();
    app.clone().oneshot(get("/health", None)).await.unwrap();
    app.clone()
        .oneshot(get("/customer/getCustomer", None))
        .await
        .unwrap();

    let response = app.oneshot(get("/stats", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let stats = body_json(response).await;
    assert_eq!(stats["count"], 3);
    assert_eq!(stats["statusCodes"]["200"], 2);
    assert_eq!(stats["statusCodes"]["401"], 1);
    assert_eq!(stats["endpoints"]["GET /health"]["count"], 2);
    assert_eq!(
        stats["endpoints"]["GET /customer/getCustomer"]["statusCodes"]["401"],
        1
    );
    assert!(stats["uptimeSecs"].is_u64());
}
