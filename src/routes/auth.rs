// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session lifecycle routes: signup, login, refresh, profile and logout.

use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, patch, post},
    Extension, Json, Router,
};
use axum_extra::extract::WithRejection;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::middleware::auth::{require_auth, AuthUser};
use crate::models::{
    AuthResponse, LoginRequest, ProfileUpdate, RefreshRequest, RefreshResponse, SignupRequest,
    UserProfile,
};
use crate::AppState;

pub fn routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let public = Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh));

    let protected = Router::new()
        .route("/auth/me", get(me))
        .route("/auth/profile", patch(update_profile))
        .route("/auth/logout", post(logout))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    public.merge(protected)
}

/// Create an account; 201 with the profile and a token pair.
async fn signup(
    State(state): State<Arc<AppState>>,
    WithRejection(Json(request), _): WithRejection<Json<SignupRequest>, AppError>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let response = state.accounts.signup(request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn login(
    State(state): State<Arc<AppState>>,
    WithRejection(Json(request), _): WithRejection<Json<LoginRequest>, AppError>,
) -> Result<Json<AuthResponse>> {
    Ok(Json(state.accounts.login(request).await?))
}

async fn refresh(
    State(state): State<Arc<AppState>>,
    WithRejection(Json(request), _): WithRejection<Json<RefreshRequest>, AppError>,
) -> Result<Json<RefreshResponse>> {
    Ok(Json(state.accounts.refresh(request.refresh_token).await?))
}

/// Get the caller's profile.
async fn me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserProfile>> {
    Ok(Json(state.accounts.profile(user.account_id).await?))
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Json(update), _): WithRejection<Json<ProfileUpdate>, AppError>,
) -> Result<Json<UserProfile>> {
    Ok(Json(
        state
            .accounts
            .update_profile(user.account_id, update)
            .await?,
    ))
}

/// Tokens are stateless; logout is acknowledged and logged only.
async fn logout(Extension(user): Extension<AuthUser>) -> StatusCode {
    tracing::info!(account_id = %user.account_id, "Logout");
    StatusCode::NO_CONTENT
}
