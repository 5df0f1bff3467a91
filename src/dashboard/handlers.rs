use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::audit::read_last_entries;
use crate::AppState;

const DEFAULT_AUDIT_LIMIT: usize = 50;
const MAX_AUDIT_LIMIT: usize = 200;

/// `GET /api/dashboard/stats`
pub async fn stats(State(state): State<Arc<AppState>>) -> Json<Value> {
    let (allow, deny, uptime_seconds) = state.stats.snapshot();
    Json(json!({
        "allow": allow,
        "deny": deny,
        "uptime_seconds": uptime_seconds,
        "audit_drops": state.audit.dropped(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    limit: Option<usize>,
}

/// Chain hashes stay out of the dashboard view; they are a verification
/// concern, not a browsing one.
#[derive(Debug, Serialize)]
struct EntryDto {
    timestamp: String,
    method: String,
    path: String,
    decision: String,
    reason: String,
}

/// `GET /api/dashboard/audit?limit=N`: last N entries, N clamped to 1..=200.
pub async fn audit_tail(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AuditQuery>,
) -> Json<Value> {
    let limit = query
        .limit
        .filter(|&n| n > 0 && n <= MAX_AUDIT_LIMIT)
        .unwrap_or(DEFAULT_AUDIT_LIMIT);

    let path = state.config.audit_log_path.clone();
    let entries = tokio::task::spawn_blocking(move || read_last_entries(&path, limit))
        .await
        .unwrap_or_default();

    let dtos: Vec<EntryDto> = entries
        .into_iter()
        .map(|e| EntryDto {
            timestamp: e.timestamp,
            method: e.method,
            path: e.path,
            decision: e.decision.as_str().to_string(),
            reason: e.reason,
        })
        .collect();

    Json(json!({ "entries": dtos }))
}

/// `GET /api/dashboard/policies`: the active rule set (empty in deny-all).
pub async fn policies(State(state): State<Arc<AppState>>) -> Json<Value> {
    let rules = state.policy.snapshot().await;
    Json(json!({ "policies": rules }))
}

/// `GET /api/dashboard/status`: limiter occupancy, no key material.
pub async fn status(State(state): State<Arc<AppState>>) -> Json<Value> {
    let (ip_buckets, user_buckets) = state.limiter.bucket_counts();
    Json(json!({
        "rate_limit": {
            "ip_buckets": ip_buckets,
            "user_buckets": user_buckets,
        }
    }))
}
