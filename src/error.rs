use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Error type for every rejection the request pipeline can produce.
///
/// Each variant maps to exactly one HTTP status so the audit layer can
/// derive the decision from the status alone.
#[derive(Error, Debug)]
pub enum GatewayError {
    // ===== Request validation =====
    #[error("missing required header: {0}")]
    MissingHeader(String),

    #[error("invalid Content-Type")]
    UnsupportedContentType,

    #[error("request body exceeds {0} bytes")]
    BodyTooLarge(usize),

    // ===== Authentication & authorization =====
    #[error("{0}")]
    Unauthorized(String),

    #[error("access denied")]
    Forbidden,

    // ===== Rate limiting =====
    #[error("rate limit exceeded")]
    RateLimited,

    // ===== Upstream =====
    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    // ===== Everything else =====
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::MissingHeader(_) | GatewayError::UnsupportedContentType => {
                StatusCode::BAD_REQUEST
            }
            GatewayError::BodyTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            GatewayError::Forbidden => StatusCode::FORBIDDEN,
            GatewayError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::Upstream(_) => StatusCode::BAD_GATEWAY,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Log with a level matching severity.
    fn log(&self) {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "request failed");
        } else if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(error = %self, "authentication failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        GatewayError::Unauthorized(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        GatewayError::Internal(msg.into())
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> axum::response::Response {
        self.log();

        let status = self.status_code();

        // Server-side failures are not described to the client.
        let message = if status.is_server_error() {
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, Json(body)).into_response()
    }
}
