// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route handlers.

pub mod auth;

use crate::middleware::{diagnostics::expose_error_diagnostics, security::add_security_headers};
use crate::AppState;
use axum::extract::State;
use axum::http::{header, Method};
use axum::{middleware, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "frontend/src/generated/")
)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the account store is unreachable
    pub status: String,
    pub environment: String,
    pub storage_connected: bool,
    pub timestamp: DateTime<Utc>,
}

/// Health check response
async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let storage_connected = state.db.is_connected();
    Json(HealthResponse {
        status: if storage_connected { "ok" } else { "degraded" }.to_string(),
        environment: state.config.environment.to_string(),
        storage_connected,
        timestamp: Utc::now(),
    })
}

fn cors_layer(origins: Vec<String>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &axum::http::HeaderValue, _request_parts: &axum::http::request::Parts| {
                let origin_str = origin.to_str().unwrap_or("");
                origins.iter().any(|allowed| allowed == origin_str)
            },
        ))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Build the complete router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/health", get(health_check))
        .merge(auth::routes(state.clone()));

    let mut router = Router::new()
        .route("/health", get(health_check))
        .nest("/api", api);

    // Innermost, so the re-rendered body still gets the outer headers.
    if state.config.environment.is_development() {
        router = router.layer(middleware::from_fn(expose_error_diagnostics));
    }

    router
        .layer(middleware::from_fn(add_security_headers))
        .layer(cors_layer(state.config.cors_origins.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
