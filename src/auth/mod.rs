// ============================================================================
// Authentication
// ============================================================================
//
// Two authenticators; the deployment wires exactly one into the chain:
// - apikey: X-API-Key lookup with constant-time comparison
// - bearer: RS256-signed tokens with explicit claim checks
//
// Authentication only establishes *who* the caller is. What they may do is
// decided later by the authorization stage.
//
// ============================================================================

pub mod apikey;
pub mod bearer;

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::error::GatewayError;
use crate::ratelimit::UserKey;
use crate::AppState;

pub use apikey::{ApiKeyRecord, ApiKeyStore};
pub use bearer::BearerVerifier;

/// The authenticator selected by configuration.
pub enum Authenticator {
    ApiKey(ApiKeyStore),
    Bearer(BearerVerifier),
}

/// Establish the caller's identity, or reject with 401.
///
/// Health checks pass through unauthenticated. On success the identity is
/// attached to the request, along with the user key the rate limiter
/// consults for its per-user bucket.
pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    if req.uri().path() == "/health" {
        return Ok(next.run(req).await);
    }

    let identity = match &state.authenticator {
        Authenticator::ApiKey(store) => apikey::authenticate(store, req.headers())?,
        Authenticator::Bearer(verifier) => bearer::authenticate(verifier, req.headers())?,
    };

    req.extensions_mut().insert(UserKey(identity.subject.clone()));
    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}
