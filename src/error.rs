// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.
//!
//! Every error renders as `{ "message", "code", "details"? }`. Internal
//! context (token failure reasons, storage errors, error chains) is never
//! part of the body; it rides along as an [`ErrorDiagnostics`] response
//! extension that only the development-mode middleware exposes.

use crate::models::Role;
use crate::services::tokens::TokenError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use validator::ValidationErrors;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation failed")]
    Validation(Vec<FieldViolation>),

    #[error("Email already exists")]
    DuplicateAccount,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Refresh token is required")]
    TokenRequired,

    #[error("No token provided")]
    NoToken,

    #[error("Invalid token format")]
    InvalidTokenFormat,

    #[error("Invalid or expired token")]
    InvalidToken(#[source] TokenError),

    #[error("Access forbidden")]
    Forbidden { required: Vec<Role>, actual: Role },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// A single violated validation rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

/// JSON error response body
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub message: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldViolation>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<String>,
}

/// Internal context attached to error responses as an extension.
#[derive(Debug, Clone)]
pub struct ErrorDiagnostics {
    pub body: ErrorResponse,
    pub detail: String,
}

impl AppError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::DuplicateAccount => "EMAIL_EXISTS",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::TokenRequired => "TOKEN_REQUIRED",
            AppError::NoToken => "NO_TOKEN",
            AppError::InvalidTokenFormat => "INVALID_TOKEN_FORMAT",
            AppError::InvalidToken(_) => "INVALID_TOKEN",
            AppError::Forbidden { .. } => "FORBIDDEN",
            AppError::NotFound(_) => "USER_NOT_FOUND",
            AppError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::DuplicateAccount | AppError::TokenRequired => {
                StatusCode::BAD_REQUEST
            }
            AppError::InvalidCredentials
            | AppError::NoToken
            | AppError::InvalidTokenFormat
            | AppError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Human-readable message. Internal details never appear here.
    fn public_message(&self) -> String {
        match self {
            AppError::NotFound(_) => "User not found".to_string(),
            AppError::ServiceUnavailable(_) => "Service temporarily unavailable".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }

    /// Context only shown in development mode.
    fn diagnostic(&self) -> Option<String> {
        match self {
            AppError::InvalidToken(reason) => Some(reason.to_string()),
            AppError::Forbidden { required, actual } => Some(format!(
                "required one of [{}], caller has {}",
                required
                    .iter()
                    .map(|r| r.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
                actual
            )),
            AppError::NotFound(what) => Some(what.clone()),
            AppError::ServiceUnavailable(why) => Some(why.clone()),
            AppError::Internal(err) => Some(format!("{:?}", err)),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self {
            AppError::ServiceUnavailable(msg) => {
                tracing::error!(error = %msg, "Storage unavailable");
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
            }
            _ => {}
        }

        let details = match &self {
            AppError::Validation(violations) => Some(violations.clone()),
            _ => None,
        };

        let body = ErrorResponse {
            message: self.public_message(),
            code: self.code(),
            details,
            debug: None,
        };

        let diagnostics = self.diagnostic().map(|detail| ErrorDiagnostics {
            body: body.clone(),
            detail,
        });

        let mut response = (status, Json(body)).into_response();
        if let Some(diagnostics) = diagnostics {
            response.extensions_mut().insert(diagnostics);
        }
        response
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let mut violations: Vec<FieldViolation> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                let field = camel_case(&field);
                errs.iter().map(move |err| FieldViolation {
                    field: field.clone(),
                    message: err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value ({})", err.code)),
                })
            })
            .collect();
        violations.sort_by(|a, b| a.field.cmp(&b.field).then(a.message.cmp(&b.message)));
        AppError::Validation(violations)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(vec![FieldViolation {
            field: "body".to_string(),
            message: rejection.body_text(),
        }])
    }
}

/// `profile_image` -> `profileImage`, matching the wire field names.
fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
