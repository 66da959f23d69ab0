// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Normalized client-side error.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error surfaced to callers of the client, regardless of where it came from.
///
/// Server error bodies keep their `message`/`code`/`details`; transport and
/// decoding failures get one of the `ERR_*` codes below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{message} ({code})")]
pub struct ApiError {
    pub message: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// HTTP status, when a response was received
    #[serde(skip)]
    pub status: Option<u16>,
}

impl ApiError {
    pub const NO_RESPONSE: &'static str = "ERR_NO_RESPONSE";
    pub const REQUEST_SETUP: &'static str = "ERR_REQUEST_SETUP";
    pub const DECODE: &'static str = "ERR_DECODE";
    pub const NO_REFRESH_TOKEN: &'static str = "NO_REFRESH_TOKEN";

    fn new(message: impl Into<String>, code: &str) -> Self {
        Self {
            message: message.into(),
            code: code.to_string(),
            details: None,
            status: None,
        }
    }

    /// Build from a non-success response body.
    pub fn from_response(status: StatusCode, body: &[u8]) -> Self {
        #[derive(Deserialize)]
        struct ServerError {
            message: Option<String>,
            code: Option<String>,
            details: Option<Value>,
        }

        let parsed = serde_json::from_slice::<ServerError>(body).ok();
        let (message, code, details) = match parsed {
            Some(e) => (e.message, e.code, e.details),
            None => (None, None, None),
        };

        Self {
            message: message.unwrap_or_else(|| "An error occurred".to_string()),
            code: code.unwrap_or_else(|| format!("ERR_{}", status.as_u16())),
            details,
            status: Some(status.as_u16()),
        }
    }

    /// Translate a `reqwest` send failure.
    pub fn transport(err: reqwest::Error) -> Self {
        if err.is_builder() {
            Self::new(err.to_string(), Self::REQUEST_SETUP)
        } else {
            tracing::debug!(error = %err, "Request failed without a response");
            Self::new("No response received from server", Self::NO_RESPONSE)
        }
    }

    pub fn request_setup(message: impl Into<String>) -> Self {
        Self::new(message, Self::REQUEST_SETUP)
    }

    pub fn decode(err: impl std::fmt::Display, status: StatusCode) -> Self {
        Self {
            status: Some(status.as_u16()),
            ..Self::new(format!("Unexpected response body: {}", err), Self::DECODE)
        }
    }

    pub fn no_refresh_token() -> Self {
        Self::new("No refresh token available", Self::NO_REFRESH_TOKEN)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == Some(StatusCode::UNAUTHORIZED.as_u16())
    }
}
