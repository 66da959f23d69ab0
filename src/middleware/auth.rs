// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bearer-token authentication and role gating.

use crate::error::AppError;
use crate::models::Role;
use crate::AppState;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use uuid::Uuid;

/// Authenticated caller extracted from a verified access token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub account_id: Uuid,
    pub email: String,
    pub role: Role,
}

/// Extract the token from an `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AppError::NoToken)?
        .to_str()
        .map_err(|_| AppError::InvalidTokenFormat)?;

    match value.trim().split_once(' ') {
        Some((scheme, token))
            if scheme.eq_ignore_ascii_case("bearer")
                && !token.trim().is_empty()
                && !token.trim().contains(char::is_whitespace) =>
        {
            Ok(token.trim())
        }
        _ => Err(AppError::InvalidTokenFormat),
    }
}

/// Middleware that requires a valid access token.
///
/// On success the request carries an [`AuthUser`] extension.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())?;

    let claims = state.tokens.verify_access(token).map_err(|reason| {
        tracing::debug!(reason = %reason, "Rejected access token");
        AppError::InvalidToken(reason)
    })?;

    request.extensions_mut().insert(AuthUser {
        account_id: claims.sub,
        email: claims.email,
        role: claims.role,
    });

    Ok(next.run(request).await)
}

// =============================================================================
// RequireRoleLayer
// =============================================================================

/// Layer rejecting callers whose role is not in an allow-set.
///
/// Must sit inside [`require_auth`]; a request without an [`AuthUser`]
/// is treated as unauthenticated.
#[derive(Clone)]
pub struct RequireRoleLayer {
    allowed: Arc<Vec<Role>>,
}

impl RequireRoleLayer {
    pub fn any_of(roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            allowed: Arc::new(roles.into_iter().collect()),
        }
    }
}

impl<S> Layer<S> for RequireRoleLayer {
    type Service = RequireRole<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequireRole {
            inner,
            allowed: self.allowed.clone(),
        }
    }
}

/// Service produced by [`RequireRoleLayer`].
#[derive(Clone)]
pub struct RequireRole<S> {
    inner: S,
    allowed: Arc<Vec<Role>>,
}

impl<S> Service<Request<Body>> for RequireRole<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let allowed = self.allowed.clone();
        // Take the instance that was driven to readiness.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let role = match req.extensions().get::<AuthUser>() {
                Some(user) => user.role,
                None => return Ok(AppError::NoToken.into_response()),
            };

            if !allowed.contains(&role) {
                tracing::warn!(role = %role, "Role not permitted for route");
                return Ok(AppError::Forbidden {
                    required: allowed.to_vec(),
                    actual: role,
                }
                .into_response());
            }

            inner.call(req).await
        })
    }
}
