//! Shared fixtures for the integration suites: a fully wired service over
//! an in-memory SQLite database, and a small JSON client for the router.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use rf_api::AppState;
use rf_auth_simple::{SimpleAuthProvider, DEFAULT_TOKEN_TTL_HOURS};
use rf_core::guard::ContentPolicy;
use rf_core::models::User;
use rf_core::service::{ForumService, Ports};
use rf_db_sqlite::SqliteForumRepo;
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;

pub const PASSWORD: &str = "correct-horse";

/// A service backed by a fresh private database.
pub async fn service() -> ForumService {
    let repo = Arc::new(
        SqliteForumRepo::new("sqlite::memory:")
            .await
            .expect("in-memory database"),
    );
    let auth = Arc::new(SimpleAuthProvider::new(
        &SecretString::from("integration-secret".to_string()),
        DEFAULT_TOKEN_TTL_HOURS,
    ));
    ForumService::new(Ports::from_backend(repo, auth), ContentPolicy::default())
}

/// Registers `username` and returns the stored account.
pub async fn member(service: &ForumService, username: &str) -> User {
    service.register(username, PASSWORD).await.expect("register");
    let token = service.login(username, PASSWORD).await.expect("login");
    service.authenticate(&token).await.expect("authenticate")
}

pub async fn app() -> Router {
    rf_api::router(AppState::new(service().await))
}

/// Sends one request and decodes the JSON body (`Null` when empty).
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => request.body(Body::empty()),
    }
    .expect("request");

    let response = app.clone().oneshot(request).await.expect("infallible router");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, json)
}

/// Registers through the API and returns a bearer token.
pub async fn sign_up(app: &Router, username: &str) -> String {
    let credentials = serde_json::json!({ "username": username, "password": PASSWORD });
    let (status, _) = send(app, Method::POST, "/register", None, Some(credentials.clone())).await;
    assert_eq!(status, StatusCode::CREATED, "register {username}");
    let (status, body) = send(app, Method::POST, "/login", None, Some(credentials)).await;
    assert_eq!(status, StatusCode::OK, "login {username}");
    body["token"].as_str().expect("token").to_string()
}
