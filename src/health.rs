use axum::Json;
use serde_json::{json, Value};

/// Liveness probe. Part of the secured chain so it is audited, but the
/// authentication, authorization and rate-limit stages all pass it through.
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
