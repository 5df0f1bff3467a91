// ============================================================================
// Dashboard API
// ============================================================================
//
// Read-only JSON views over the gateway's state, consumed by the operator
// dashboard. Served outside the secured chain: these endpoints are not
// audited and not rate limited.
//
// ============================================================================

mod handlers;
mod stats;

use std::sync::Arc;

use axum::{routing::get, Router};

use crate::AppState;

pub use stats::StatsCollector;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stats", get(handlers::stats))
        .route("/audit", get(handlers::audit_tail))
        .route("/policies", get(handlers::policies))
        .route("/status", get(handlers::status))
}
