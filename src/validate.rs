use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::error::GatewayError;
use crate::AppState;

/// First stage of the secured chain: reject malformed traffic before any
/// credential or policy work happens.
///
/// Three checks, in order: required headers, Content-Type allow-list (only
/// when a body is declared), and the body size cap. The body is fully
/// buffered so the upstream proxy can replay it.
pub async fn validate_request(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    let cfg = &state.config.validation;

    for name in &cfg.required_headers {
        let present = req
            .headers()
            .get(name.as_str())
            .and_then(|v| v.to_str().ok())
            .map(|v| !v.trim().is_empty())
            .unwrap_or(false);
        if !present {
            return Err(GatewayError::MissingHeader(name.clone()));
        }
    }

    if declared_content_length(&req) > 0 {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if !is_allowed_content_type(content_type, &cfg.allowed_content_types) {
            return Err(GatewayError::UnsupportedContentType);
        }
    }

    // Buffer the body under the cap and hand downstream a rewindable copy.
    let max = cfg.max_body_bytes;
    let (parts, body) = req.into_parts();
    let bytes = axum::body::to_bytes(body, max)
        .await
        .map_err(|_| GatewayError::BodyTooLarge(max))?;
    let req = Request::from_parts(parts, Body::from(bytes));

    Ok(next.run(req).await)
}

fn declared_content_length(req: &Request) -> u64 {
    req.headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

/// Prefix match so `application/json; charset=utf-8` is admitted by an
/// `application/json` entry.
fn is_allowed_content_type(content_type: &str, allowed: &[String]) -> bool {
    if content_type.is_empty() {
        return false;
    }
    allowed.iter().any(|a| content_type.starts_with(a.as_str()))
}
