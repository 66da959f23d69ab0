// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP client with bearer-token injection and refresh-once retry.
//!
//! Every request carries the stored access token. A 401 on a request that
//! was sent with a token and has not been retried triggers one refresh through `/auth/refresh`, then
//! the request is replayed once. Concurrent requests that hit 401 together
//! share a single refresh: the guard is re-checked after it is acquired and
//! a token that changed in the meantime is reused.

use crate::client::error::ApiError;
use crate::client::storage::SessionTokens;
use crate::models::RefreshResponse;
use reqwest::{Method, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Called once the session can no longer be refreshed; the UI should go
/// to its sign-in view.
pub type SessionExpiredHook = Arc<dyn Fn() + Send + Sync>;

/// One outgoing call.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the base URL, e.g. `/auth/me`
    pub path: String,
    pub body: Option<Value>,
    /// Set once the request has been replayed after a refresh
    pub retried: bool,
    /// Credential endpoints: no bearer token, never refreshed
    pub anonymous: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            retried: false,
            anonymous: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    /// Attach a JSON body.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::request_setup(format!("Invalid request body: {}", e)))?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn anonymous(mut self) -> Self {
        self.anonymous = true;
        self
    }
}

/// Session-aware API client. Cheap to clone; clones share tokens and the
/// refresh guard.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    tokens: SessionTokens,
    refresh_guard: Arc<Mutex<()>>,
    on_session_expired: Option<SessionExpiredHook>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, tokens: SessionTokens) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ApiError::request_setup(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
            refresh_guard: Arc::new(Mutex::new(())),
            on_session_expired: None,
        })
    }

    pub fn with_session_expired_hook(mut self, hook: SessionExpiredHook) -> Self {
        self.on_session_expired = Some(hook);
        self
    }

    pub(crate) fn session_expired_hook(&self) -> Option<SessionExpiredHook> {
        self.on_session_expired.clone()
    }

    pub fn tokens(&self) -> &SessionTokens {
        &self.tokens
    }

    /// Send a request and decode its JSON response.
    pub async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let response = self.dispatch(request).await?;
        decode_json(response).await
    }

    /// Send a request whose response body is ignored.
    pub async fn send_empty(&self, request: ApiRequest) -> Result<(), ApiError> {
        let response = self.dispatch(request).await?;
        check_status(response).await.map(|_| ())
    }

    /// Transmit, and on the first 401 refresh and replay once.
    async fn dispatch(&self, mut request: ApiRequest) -> Result<Response, ApiError> {
        loop {
            let sent_token = if request.anonymous {
                None
            } else {
                self.tokens.access()
            };

            let response = self.transmit(&request, sent_token.as_deref()).await?;
            if response.status() != StatusCode::UNAUTHORIZED || request.anonymous {
                return Ok(response);
            }
            if request.retried {
                tracing::debug!(path = %request.path, "Replayed request still unauthorized");
                return Ok(response);
            }
            if sent_token.is_none() {
                tracing::debug!(path = %request.path, "Unauthorized without a session");
                return Ok(response);
            }

            request.retried = true;
            self.refresh_access_token(sent_token.as_deref()).await?;
        }
    }

    async fn transmit(&self, request: &ApiRequest, token: Option<&str>) -> Result<Response, ApiError> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self.http.request(request.method.clone(), &url);
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        builder.send().await.map_err(ApiError::transport)
    }

    /// Obtain a fresh access token, unless another request already has.
    ///
    /// `stale` is the token the failing request was sent with.
    async fn refresh_access_token(&self, stale: Option<&str>) -> Result<(), ApiError> {
        let _guard = self.refresh_guard.lock().await;

        // Double-check after acquiring the guard.
        if let Some(current) = self.tokens.access() {
            if Some(current.as_str()) != stale {
                tracing::debug!("Access token already refreshed by a concurrent request");
                return Ok(());
            }
        }

        let Some(refresh_token) = self.tokens.refresh() else {
            self.expire_session();
            return Err(ApiError::no_refresh_token());
        };

        match self.request_refresh(&refresh_token).await {
            Ok(token) => {
                self.tokens.set_access(&token);
                tracing::debug!("Access token refreshed");
                Ok(())
            }
            Err(err) => {
                tracing::info!(code = %err.code, "Token refresh failed; ending session");
                self.expire_session();
                Err(err)
            }
        }
    }

    /// Call the refresh endpoint directly, outside the retry loop.
    async fn request_refresh(&self, refresh_token: &str) -> Result<String, ApiError> {
        let request = ApiRequest::post("/auth/refresh")
            .anonymous()
            .json(&json!({ "refreshToken": refresh_token }))?;
        let response = self.transmit(&request, None).await?;
        let body: RefreshResponse = decode_json(response).await?;
        Ok(body.token)
    }

    fn expire_session(&self) {
        self.tokens.clear();
        if let Some(hook) = &self.on_session_expired {
            hook();
        }
    }
}

/// Turn a non-success response into an [`ApiError`].
async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.bytes().await.unwrap_or_default();
    Err(ApiError::from_response(status, &body))
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let response = check_status(response).await?;
    let status = response.status();
    response
        .json()
        .await
        .map_err(|e| ApiError::decode(e, status))
}
