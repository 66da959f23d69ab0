// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! End-to-end session lifecycle through the router.

use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

mod common;
use common::{create_test_app, get_request, json_request, read_json, signup};

#[tokio::test]
async fn test_signup_login_me_refresh_scenario() {
    let (app, state) = create_test_app();

    // Signup
    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/auth/signup",
            &json!({"email": "a@x.com", "password": "pass1234", "name": "A"}),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = read_json(response).await;
    let token = created["token"].as_str().unwrap().to_string();
    let refresh_token = created["refreshToken"].as_str().unwrap().to_string();
    assert!(!token.is_empty());
    assert!(!refresh_token.is_empty());
    assert_eq!(created["user"]["email"], "a@x.com");
    assert_eq!(created["user"]["role"], "farmer");
    assert!(created["user"].get("passwordHash").is_none());
    assert!(created["user"].get("password").is_none());

    // Token decodes to the created identity
    let claims = state.tokens.verify_access(&token).unwrap();
    assert_eq!(claims.sub.to_string(), created["user"]["id"].as_str().unwrap());

    // Login
    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/auth/login",
            &json!({"email": "a@x.com", "password": "pass1234"}),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let logged_in = read_json(response).await;
    assert_eq!(logged_in["user"]["email"], "a@x.com");
    assert_eq!(logged_in["user"]["id"], created["user"]["id"]);

    // Me
    let response = app
        .clone()
        .oneshot(get_request("/api/auth/me", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await, created["user"]);

    // Refresh
    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/auth/refresh",
            &json!({"refreshToken": refresh_token}),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let refreshed = read_json(response).await;
    let new_token = refreshed["token"].as_str().unwrap();
    assert_ne!(new_token, token);
    assert!(refreshed.get("refreshToken").is_none());

    // Old and new access tokens are both valid
    for t in [token.as_str(), new_token] {
        let response = app
            .clone()
            .oneshot(get_request("/api/auth/me", Some(t)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn test_login_normalizes_email() {
    let (app, _) = create_test_app();
    signup(&app, "Farmer@Example.com").await;

    let response = app
        .oneshot(json_request(
            Method::POST,
            "/api/auth/login",
            &json!({"email": "  FARMER@example.COM ", "password": "pass1234"}),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["user"]["email"], "farmer@example.com");
}

#[tokio::test]
async fn test_refresh_errors() {
    let (app, _) = create_test_app();
    let created = signup(&app, "a@x.com").await;

    let cases = [
        (json!({}), StatusCode::BAD_REQUEST, "TOKEN_REQUIRED"),
        (json!({"refreshToken": ""}), StatusCode::BAD_REQUEST, "TOKEN_REQUIRED"),
        (
            json!({"refreshToken": "garbage"}),
            StatusCode::UNAUTHORIZED,
            "INVALID_TOKEN",
        ),
        // An access token is not a refresh token
        (
            json!({"refreshToken": created["token"]}),
            StatusCode::UNAUTHORIZED,
            "INVALID_TOKEN",
        ),
    ];

    for (body, status, code) in cases {
        let response = app
            .clone()
            .oneshot(json_request(Method::POST, "/api/auth/refresh", &body, None))
            .await
            .unwrap();
        assert_eq!(response.status(), status, "body {}", body);
        assert_eq!(read_json(response).await["code"], code);
    }
}

#[tokio::test]
async fn test_refresh_after_account_removed() {
    let (app, state) = create_test_app();
    let created = signup(&app, "a@x.com").await;
    let id = created["user"]["id"].as_str().unwrap().parse().unwrap();
    state.db.remove(id).await.unwrap();

    let response = app
        .oneshot(json_request(
            Method::POST,
            "/api/auth/refresh",
            &json!({"refreshToken": created["refreshToken"]}),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(read_json(response).await["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn test_logout_is_protected_and_acknowledged() {
    let (app, _) = create_test_app();
    let created = signup(&app, "a@x.com").await;

    let response = app
        .clone()
        .oneshot(json_request(Method::POST, "/api/auth/logout", &json!({}), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(json_request(
            Method::POST,
            "/api/auth/logout",
            &json!({}),
            created["token"].as_str(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
