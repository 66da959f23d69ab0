// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Development-mode error detail.
//!
//! [`AppError`](crate::error::AppError) attaches an [`ErrorDiagnostics`]
//! extension to responses that have internal context worth showing. This
//! middleware strips the extension and, when installed, re-renders the body
//! with a `debug` field. Only the development router installs it.

use crate::error::ErrorDiagnostics;
use axum::{
    extract::Request,
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

pub async fn expose_error_diagnostics(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;

    let Some(diagnostics) = response.extensions_mut().remove::<ErrorDiagnostics>() else {
        return response;
    };

    let mut body = diagnostics.body;
    body.debug = Some(diagnostics.detail);

    let (mut parts, _) = response.into_parts();
    let rebuilt = Json(body).into_response();
    let (rebuilt_parts, rebuilt_body) = rebuilt.into_parts();

    parts.headers.remove(header::CONTENT_LENGTH);
    if let Some(content_type) = rebuilt_parts.headers.get(header::CONTENT_TYPE) {
        parts
            .headers
            .insert(header::CONTENT_TYPE, content_type.clone());
    }

    Response::from_parts(parts, rebuilt_body)
}
