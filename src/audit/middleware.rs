use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use super::Decision;
use crate::AppState;

/// Outermost stage of the secured chain: observe the final status of every
/// request, denied or forwarded, and record exactly one audit entry for it.
///
/// The decision is derived from the status the client actually receives:
/// anything below 400 is ALLOW, everything else is DENY with the canonical
/// reason phrase for the status.
pub async fn record_decision(State(state): State<Arc<AppState>>, req: Request, next: Next) -> Response {
    let method = req.method().as_str().to_string();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    let status = response.status();
    let (decision, reason) = if status.as_u16() < 400 {
        (Decision::Allow, "all checks passed".to_string())
    } else {
        (
            Decision::Deny,
            status
                .canonical_reason()
                .unwrap_or("request denied")
                .to_string(),
        )
    };

    match decision {
        Decision::Allow => state.stats.increment_allow(),
        Decision::Deny => state.stats.increment_deny(),
    }

    state.audit.log(&method, &path, decision, &reason);

    response
}
