// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client session manager against a live server.

use agrigrow::client::{ApiClient, SessionExpiredHook, SessionManager, SessionTokens, SessionView};
use agrigrow::models::{LocationUpdate, ProfileUpdate, UserProfile};
use agrigrow::AppState;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

mod common;
use common::spawn_app;

fn manager(base: &str, tokens: SessionTokens) -> SessionManager {
    SessionManager::new(ApiClient::new(base, tokens).unwrap())
}

/// An access token for `user` that expired an hour ago.
fn expired_access_token(state: &AppState, user: &UserProfile) -> String {
    let now = chrono::Utc::now().timestamp();
    encode(
        &Header::new(Algorithm::HS256),
        &json!({
            "sub": user.id,
            "email": user.email,
            "role": "farmer",
            "kind": "access",
            "jti": uuid::Uuid::new_v4(),
            "iat": now - 7200,
            "exp": now - 3600,
        }),
        &EncodingKey::from_secret(&state.config.jwt_secret),
    )
    .unwrap()
}

#[tokio::test]
async fn test_sign_up_establishes_session() {
    let (base, _) = spawn_app().await;
    let tokens = SessionTokens::in_memory();
    let session = manager(&base, tokens.clone());

    let user = session.sign_up("a@x.com", "pass1234", "A").await.unwrap();

    assert_eq!(user.email, "a@x.com");
    assert_eq!(session.current_user(), Some(user));
    assert!(tokens.access().is_some());
    assert!(tokens.refresh().is_some());
}

#[tokio::test]
async fn test_initialize_restores_stored_session() {
    let (base, _) = spawn_app().await;
    let tokens = SessionTokens::in_memory();
    let user = manager(&base, tokens.clone())
        .sign_up("a@x.com", "pass1234", "A")
        .await
        .unwrap();

    // A new manager sharing the persisted tokens starts out loading.
    let session = manager(&base, tokens);
    assert_eq!(session.state().view(), SessionView::Loading);

    tokio::join!(session.initialize(), session.initialize());

    assert_eq!(session.state().view(), SessionView::SignedIn(user));
}

#[tokio::test]
async fn test_initialize_with_rejected_tokens_signs_out() {
    let (base, _) = spawn_app().await;
    let tokens = SessionTokens::in_memory();
    tokens.store_pair("garbage", "also-garbage");

    let session = manager(&base, tokens.clone());
    session.initialize().await;

    assert_eq!(session.state().view(), SessionView::SignedOut);
    assert!(tokens.access().is_none());
    assert!(tokens.refresh().is_none());
}

#[tokio::test]
async fn test_initialize_refreshes_expired_access_token() {
    let (base, state) = spawn_app().await;
    let tokens = SessionTokens::in_memory();
    let user = manager(&base, tokens.clone())
        .sign_up("a@x.com", "pass1234", "A")
        .await
        .unwrap();

    let expired = expired_access_token(&state, &user);
    tokens.set_access(&expired);

    let session = manager(&base, tokens.clone());
    session.initialize().await;

    assert_eq!(session.state().view(), SessionView::SignedIn(user));
    assert_ne!(tokens.access().as_deref(), Some(expired.as_str()));
}

#[tokio::test]
async fn test_update_profile_replaces_current_user() {
    let (base, _) = spawn_app().await;
    let session = manager(&base, SessionTokens::in_memory());
    session.sign_up("a@x.com", "pass1234", "A").await.unwrap();

    let mut rx = session.subscribe();
    let updated = session
        .update_profile(&ProfileUpdate {
            name: Some("Grace".to_string()),
            location: Some(LocationUpdate {
                city: Some("Kisumu".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(updated.name, "Grace");
    assert_eq!(updated.email, "a@x.com");
    rx.changed().await.unwrap();
    assert_eq!(rx.borrow().current_user.as_ref(), Some(&updated));
}

#[tokio::test]
async fn test_failed_login_leaves_session_untouched() {
    let (base, _) = spawn_app().await;
    let tokens = SessionTokens::in_memory();
    let session = manager(&base, tokens.clone());
    session.sign_up("a@x.com", "pass1234", "A").await.unwrap();
    let before = session.current_user();

    let err = session.login("a@x.com", "wrong1234").await.unwrap_err();

    assert_eq!(err.code, "INVALID_CREDENTIALS");
    assert_eq!(err.status, Some(401));
    assert_eq!(session.current_user(), before);
    assert!(tokens.access().is_some());
}

#[tokio::test]
async fn test_logout_clears_everything() {
    let (base, _) = spawn_app().await;
    let tokens = SessionTokens::in_memory();
    let session = manager(&base, tokens.clone());
    session.sign_up("a@x.com", "pass1234", "A").await.unwrap();
    session.initialize().await;

    session.logout().await;

    assert_eq!(session.state().view(), SessionView::SignedOut);
    assert!(tokens.access().is_none());
    assert!(tokens.refresh().is_none());

    // Signing back in works after logout.
    let user = session.login("a@x.com", "pass1234").await.unwrap();
    assert_eq!(session.state().view(), SessionView::SignedIn(user));
}

#[tokio::test]
async fn test_failed_refresh_signs_out() {
    let (base, state) = spawn_app().await;
    let tokens = SessionTokens::in_memory();

    let expiries = Arc::new(AtomicUsize::new(0));
    let counter = expiries.clone();
    let hook: SessionExpiredHook = Arc::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let api = ApiClient::new(&base, tokens.clone())
        .unwrap()
        .with_session_expired_hook(hook);
    let session = SessionManager::new(api);

    let user = session.sign_up("a@x.com", "pass1234", "A").await.unwrap();
    session.initialize().await;
    assert_eq!(session.state().view(), SessionView::SignedIn(user.clone()));

    // Access token expired and the account is gone, so refresh fails too.
    tokens.set_access(&expired_access_token(&state, &user));
    state.db.remove(user.id).await.unwrap();
    let mut rx = session.subscribe();

    let err = session
        .update_profile(&ProfileUpdate {
            name: Some("B".to_string()),
            ..Default::default()
        })
        .await
        .unwrap_err();

    assert_eq!(err.code, "INVALID_TOKEN");
    assert!(tokens.access().is_none());
    assert!(tokens.refresh().is_none());
    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow_and_update().view(), SessionView::SignedOut);
    assert_eq!(session.state().view(), SessionView::SignedOut);
    assert_eq!(expiries.load(Ordering::SeqCst), 1);
}

/// `/auth/me` is slow and always rejects; `/auth/login` always succeeds.
async fn start_slow_session_server() -> String {
    async fn me() -> Response {
        tokio::time::sleep(Duration::from_millis(200)).await;
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Invalid or expired token", "code": "INVALID_TOKEN"})),
        )
            .into_response()
    }

    async fn refresh() -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Invalid or expired token", "code": "INVALID_TOKEN"})),
        )
            .into_response()
    }

    async fn login() -> Response {
        Json(json!({
            "user": {
                "id": uuid::Uuid::new_v4(),
                "email": "a@x.com",
                "name": "A",
                "role": "farmer",
                "dateJoined": "2026-01-01T00:00:00Z",
            },
            "token": "t-new",
            "refreshToken": "r-new",
        }))
        .into_response()
    }

    let router = Router::new()
        .route("/auth/me", get(me))
        .route("/auth/refresh", post(refresh))
        .route("/auth/login", post(login));
    let addr = common::serve(router).await;
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_login_during_initialize_is_kept() {
    let base = start_slow_session_server().await;
    let tokens = SessionTokens::in_memory();
    tokens.store_pair("t-stale", "r-stale");
    let session = manager(&base, tokens.clone());

    let ((), user) = tokio::join!(session.initialize(), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        session.login("a@x.com", "pass1234").await.unwrap()
    });

    assert_eq!(session.state().view(), SessionView::SignedIn(user));
    assert_eq!(tokens.access().as_deref(), Some("t-new"));
    assert_eq!(tokens.refresh().as_deref(), Some("r-new"));
}
