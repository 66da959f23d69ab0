// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use agrigrow::config::{Config, Environment};
use agrigrow::db::AccountDb;
use agrigrow::routes::create_router;
use agrigrow::AppState;
use axum::{
    body::Body,
    http::{header, Method, Request, Response},
    Router,
};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceExt;

/// Create a test app with an empty in-memory store (development mode).
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (Router, Arc<AppState>) {
    create_test_app_with(Config::test_default(), AccountDb::new())
}

/// Same as [`create_test_app`] in production mode.
#[allow(dead_code)]
pub fn create_production_app() -> (Router, Arc<AppState>) {
    let config = Config {
        environment: Environment::Production,
        ..Config::test_default()
    };
    create_test_app_with(config, AccountDb::new())
}

#[allow(dead_code)]
pub fn create_test_app_with(config: Config, db: AccountDb) -> (Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(config, db).expect("Failed to build app state"));
    (create_router(state.clone()), state)
}

/// Serve `router` on an ephemeral loopback port.
#[allow(dead_code)]
pub async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// Start the full server; returns the API base URL (`http://addr/api`).
#[allow(dead_code)]
pub async fn spawn_app() -> (String, Arc<AppState>) {
    let (router, state) = create_test_app();
    let addr = serve(router).await;
    (format!("http://{}/api", addr), state)
}

#[allow(dead_code)]
pub fn json_request(method: Method, uri: &str, body: &Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[allow(dead_code)]
pub fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

#[allow(dead_code)]
pub async fn read_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

#[allow(dead_code)]
pub async fn read_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&read_bytes(response).await).unwrap()
}

/// Sign up `email` with a valid password; returns the auth response body.
#[allow(dead_code)]
pub async fn signup(app: &Router, email: &str) -> Value {
    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/auth/signup",
            &serde_json::json!({"email": email, "password": "pass1234", "name": "A"}),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), 201, "signup of {} failed", email);
    read_json(response).await
}
