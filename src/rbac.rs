// ============================================================================
// Role-Based Access Control
// ============================================================================
//
// Authorization happens after authentication: the authenticator proves *who*
// the caller is, this stage decides *what* they may do. No matching rule
// means deny. No dynamic logic, no conditions, no expressions.
//
// ============================================================================

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::error::GatewayError;
use crate::identity::Identity;
use crate::policy::Rule;
use crate::AppState;

/// Enforce the active policy set against the caller's identity.
///
/// Reads a fresh policy snapshot per request so hot reloads take effect
/// immediately. A request without an identity is denied outright.
pub async fn authorize(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    if req.uri().path() == "/health" {
        return Ok(next.run(req).await);
    }

    let identity = req
        .extensions()
        .get::<Identity>()
        .ok_or(GatewayError::Forbidden)?;

    let rules = state.policy.snapshot().await;
    if is_allowed(req.method().as_str(), req.uri().path(), &identity.roles, &rules) {
        Ok(next.run(req).await)
    } else {
        Err(GatewayError::Forbidden)
    }
}

/// A request is allowed iff some rule matches its method and path and shares
/// at least one role with the caller. Rules are scanned in declaration
/// order; a matching rule without a shared role does not end the scan.
pub fn is_allowed(method: &str, path: &str, roles: &[String], rules: &[Rule]) -> bool {
    rules.iter().any(|rule| {
        method == rule.method
            && path_matches(path, &rule.path)
            && has_allowed_role(roles, &rule.roles)
    })
}

/// Prefix match on a path-segment boundary: the character after the prefix
/// must be `/` or end-of-string, so a rule for `/api/admin` matches
/// `/api/admin` and `/api/admin/users` but not `/api/administrators`.
fn path_matches(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || prefix.ends_with('/'),
        None => false,
    }
}

fn has_allowed_role(user_roles: &[String], allowed: &[String]) -> bool {
    user_roles.iter().any(|r| allowed.contains(r))
}
