// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Consumer-side session handling: token storage, the refreshing API client
//! and the session manager that owns the current user.

pub mod api;
pub mod error;
pub mod session;
pub mod storage;

pub use api::{ApiClient, ApiRequest, SessionExpiredHook, DEFAULT_BASE_URL};
pub use error::ApiError;
pub use session::{SessionManager, SessionState, SessionView};
pub use storage::{FileTokenStore, MemoryTokenStore, SessionTokens, TokenStore};
