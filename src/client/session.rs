// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client session manager.
//!
//! Owns the "current user" and is its only writer. Observers subscribe to a
//! watch channel and render from [`SessionState::view`], which keeps the
//! startup rehydration distinct from a signed-out session.

use crate::client::api::{ApiClient, ApiRequest, SessionExpiredHook};
use crate::client::error::ApiError;
use crate::models::{AuthResponse, LoginRequest, ProfileUpdate, SignupRequest, UserProfile};
use std::sync::Arc;
use tokio::sync::{watch, OnceCell};

/// Snapshot of the client session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub current_user: Option<UserProfile>,
    /// True until the stored session has been rehydrated
    pub loading: bool,
}

/// What the UI should show for a [`SessionState`].
#[derive(Debug, Clone, PartialEq)]
pub enum SessionView {
    /// Neutral placeholder; never the sign-in screen
    Loading,
    SignedOut,
    SignedIn(UserProfile),
}

impl SessionState {
    pub fn view(&self) -> SessionView {
        match (&self.current_user, self.loading) {
            (Some(user), _) => SessionView::SignedIn(user.clone()),
            (None, true) => SessionView::Loading,
            (None, false) => SessionView::SignedOut,
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            current_user: None,
            loading: true,
        }
    }
}

pub struct SessionManager {
    api: ApiClient,
    state: Arc<watch::Sender<SessionState>>,
    initialized: OnceCell<()>,
}

impl SessionManager {
    /// Wrap `api`. When the client gives up on refreshing, the current user
    /// is dropped before any hook already installed on `api` runs.
    pub fn new(api: ApiClient) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        let state = Arc::new(state);

        let previous = api.session_expired_hook();
        let expired_state = Arc::clone(&state);
        let hook: SessionExpiredHook = Arc::new(move || {
            expired_state.send_modify(|state| {
                state.current_user = None;
                state.loading = false;
            });
            if let Some(previous) = &previous {
                previous();
            }
        });

        Self {
            api: api.with_session_expired_hook(hook),
            state,
            initialized: OnceCell::new(),
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        self.state.borrow().current_user.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Rehydrate the session from stored tokens. Runs once; later calls
    /// wait for the first to finish and return.
    ///
    /// A sign-in, sign-out or expiry that lands while the stored session is
    /// being checked takes precedence over the rehydrated result.
    pub async fn initialize(&self) {
        self.initialized
            .get_or_init(|| async {
                let observer = self.state.subscribe();
                let restored = self.load_stored_session().await;
                let superseded = observer.has_changed().unwrap_or(false);

                let user = match restored {
                    Ok(user) => user,
                    Err(err) if superseded => {
                        tracing::debug!(code = %err.code, "Stale session check ignored");
                        None
                    }
                    Err(err) => {
                        tracing::info!(code = %err.code, "Stored session rejected; clearing tokens");
                        self.api.tokens().clear();
                        None
                    }
                };

                self.state.send_modify(|state| {
                    if !superseded {
                        state.current_user = user;
                    }
                    state.loading = false;
                });
            })
            .await;
    }

    async fn load_stored_session(&self) -> Result<Option<UserProfile>, ApiError> {
        if self.api.tokens().access().is_none() {
            return Ok(None);
        }
        let user: UserProfile = self.api.send(ApiRequest::get("/auth/me")).await?;
        tracing::debug!(account_id = %user.id, "Session restored");
        Ok(Some(user))
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<UserProfile, ApiError> {
        let request = ApiRequest::post("/auth/signup")
            .anonymous()
            .json(&SignupRequest {
                email: email.to_string(),
                password: password.to_string(),
                name: name.to_string(),
            })?;
        self.establish(request).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, ApiError> {
        let request = ApiRequest::post("/auth/login")
            .anonymous()
            .json(&LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            })?;
        self.establish(request).await
    }

    /// Run a credential request and adopt the session it returns.
    async fn establish(&self, request: ApiRequest) -> Result<UserProfile, ApiError> {
        let response: AuthResponse = self.api.send(request).await?;
        self.api
            .tokens()
            .store_pair(&response.token, &response.refresh_token);
        self.set_user(Some(response.user.clone()));
        Ok(response.user)
    }

    /// Notify the server (best effort), then always drop the local session.
    pub async fn logout(&self) {
        if let Err(err) = self.api.send_empty(ApiRequest::post("/auth/logout")).await {
            tracing::debug!(code = %err.code, "Logout notification failed");
        }
        self.api.tokens().clear();
        self.set_user(None);
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile, ApiError> {
        let request = ApiRequest::patch("/auth/profile").json(update)?;
        let user: UserProfile = self.api.send(request).await?;
        self.set_user(Some(user.clone()));
        Ok(user)
    }

    fn set_user(&self, user: Option<UserProfile>) {
        self.state.send_modify(|state| state.current_user = user);
    }
}
