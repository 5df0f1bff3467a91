// ============================================================================
// End-to-end pipeline tests
// ============================================================================
//
// Each test spawns a fresh gateway in front of a local echo upstream and
// drives it over real HTTP, then inspects the response, the audit log, or
// the dashboard API.
//
// ============================================================================

use trustgate::audit::{read_last_entries, verify_log_integrity, Decision};

use test_utils::{client, spawn_gateway, spawn_gateway_with_policy, K_ADMIN, K_USER};

#[tokio::test]
async fn health_is_allowed_and_audited() {
    let app = spawn_gateway().await;

    let res = client()
        .get(format!("{}/health", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let entries = read_last_entries(&app.audit_path, 10);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].path, "/health");
    assert_eq!(entries[0].decision, Decision::Allow);
    assert_eq!(entries[0].reason, "all checks passed");
}

#[tokio::test]
async fn health_bypasses_authentication() {
    let app = spawn_gateway().await;

    // No API key at all, still 200.
    let res = client()
        .get(format!("{}/health", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
}

#[tokio::test]
async fn missing_api_key_is_unauthorized() {
    let app = spawn_gateway().await;

    let res = client()
        .get(format!("{}/api/public", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 401);

    let entries = read_last_entries(&app.audit_path, 10);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].decision, Decision::Deny);
    assert_eq!(entries[0].reason, "Unauthorized");
}

#[tokio::test]
async fn invalid_api_key_is_unauthorized() {
    let app = spawn_gateway().await;

    let res = client()
        .get(format!("{}/api/public", app.address))
        .header("X-API-Key", "not-a-real-key")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 401);
}

#[tokio::test]
async fn user_key_reaches_upstream_on_public_route() {
    let app = spawn_gateway().await;

    let res = client()
        .get(format!("{}/api/public", app.address))
        .header("X-API-Key", K_USER)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body = res.text().await.unwrap();
    assert_eq!(body, "upstream: GET /api/public body=0");

    let entries = read_last_entries(&app.audit_path, 10);
    assert_eq!(entries.last().unwrap().decision, Decision::Allow);
}

#[tokio::test]
async fn user_key_is_forbidden_on_admin_route() {
    let app = spawn_gateway().await;

    let res = client()
        .post(format!("{}/api/admin", app.address))
        .header("X-API-Key", K_USER)
        .header("Content-Type", "application/json")
        .body("{}")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 403);

    let entries = read_last_entries(&app.audit_path, 10);
    assert_eq!(entries.last().unwrap().decision, Decision::Deny);
    assert_eq!(entries.last().unwrap().reason, "Forbidden");
}

#[tokio::test]
async fn admin_key_is_allowed_on_admin_route() {
    let app = spawn_gateway().await;

    let res = client()
        .post(format!("{}/api/admin", app.address))
        .header("X-API-Key", K_ADMIN)
        .header("Content-Type", "application/json")
        .body("{}")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    // The buffered body is replayed to the upstream intact.
    assert_eq!(res.text().await.unwrap(), "upstream: POST /api/admin body=2");
}

#[tokio::test]
async fn prefix_rule_does_not_leak_across_segment_boundary() {
    let app = spawn_gateway().await;

    let res = client()
        .get(format!("{}/api/publicity", app.address))
        .header("X-API-Key", K_USER)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 403);

    let res = client()
        .get(format!("{}/api/public/items", app.address))
        .header("X-API-Key", K_USER)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
}

#[tokio::test]
async fn unmatched_route_is_forbidden() {
    let app = spawn_gateway().await;

    let res = client()
        .get(format!("{}/somewhere/else", app.address))
        .header("X-API-Key", K_ADMIN)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 403);
}

#[tokio::test]
async fn invalid_policy_file_denies_everything() {
    let app = spawn_gateway_with_policy("policies: [{method: '', path: api, roles: []}]").await;

    let res = client()
        .get(format!("{}/api/public", app.address))
        .header("X-API-Key", K_ADMIN)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 403);
}

#[tokio::test]
async fn rate_limit_denies_after_ip_capacity() {
    let app = spawn_gateway().await;
    let http = client();

    let mut statuses = Vec::new();
    for _ in 0..21 {
        let res = http
            .get(format!("{}/api/public", app.address))
            .header("X-API-Key", K_USER)
            .send()
            .await
            .unwrap();
        statuses.push(res.status().as_u16());
    }

    assert!(statuses[..20].iter().all(|&s| s == 200), "{:?}", statuses);
    assert_eq!(statuses[20], 429);

    let entries = read_last_entries(&app.audit_path, 50);
    assert_eq!(entries.len(), 21);
    let allows = entries.iter().filter(|e| e.decision == Decision::Allow).count();
    let denies = entries.iter().filter(|e| e.decision == Decision::Deny).count();
    assert_eq!((allows, denies), (20, 1));
    assert_eq!(entries.last().unwrap().reason, "Too Many Requests");
}

#[tokio::test]
async fn missing_user_agent_is_bad_request() {
    let app = spawn_gateway().await;

    // Plain client without a default User-Agent.
    let res = reqwest::Client::new()
        .get(format!("{}/api/public", app.address))
        .header("X-API-Key", K_USER)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);

    let entries = read_last_entries(&app.audit_path, 10);
    assert_eq!(entries.last().unwrap().decision, Decision::Deny);
    assert_eq!(entries.last().unwrap().reason, "Bad Request");
}

#[tokio::test]
async fn disallowed_content_type_is_bad_request() {
    let app = spawn_gateway().await;

    let res = client()
        .post(format!("{}/api/admin", app.address))
        .header("X-API-Key", K_ADMIN)
        .header("Content-Type", "application/xml")
        .body("<x/>")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);
}

#[tokio::test]
async fn content_type_with_charset_is_accepted() {
    let app = spawn_gateway().await;

    let res = client()
        .post(format!("{}/api/admin", app.address))
        .header("X-API-Key", K_ADMIN)
        .header("Content-Type", "application/json; charset=utf-8")
        .body("{}")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let app = spawn_gateway().await;

    let body = vec![b'a'; 2 * 1024 * 1024];
    let res = client()
        .post(format!("{}/api/admin", app.address))
        .header("X-API-Key", K_ADMIN)
        .header("Content-Type", "application/json")
        .body(body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 413);

    let entries = read_last_entries(&app.audit_path, 10);
    assert_eq!(entries.last().unwrap().decision, Decision::Deny);
}

#[tokio::test]
async fn every_request_appends_exactly_one_verified_entry() {
    let app = spawn_gateway().await;
    let http = client();

    let requests: [(&str, Option<&str>); 4] = [
        ("/health", None),
        ("/api/public", Some(K_USER)),
        ("/api/public", None),
        ("/nope", Some(K_ADMIN)),
    ];
    for (path, key) in requests {
        let mut req = http.get(format!("{}{}", app.address, path));
        if let Some(key) = key {
            req = req.header("X-API-Key", key);
        }
        req.send().await.unwrap();
    }

    let entries = read_last_entries(&app.audit_path, 50);
    assert_eq!(entries.len(), 4);
    verify_log_integrity(&app.audit_path).unwrap();
}

#[tokio::test]
async fn dashboard_stats_track_decisions() {
    let app = spawn_gateway().await;
    let http = client();

    http.get(format!("{}/api/public", app.address))
        .header("X-API-Key", K_USER)
        .send()
        .await
        .unwrap();
    http.get(format!("{}/api/public", app.address))
        .send()
        .await
        .unwrap();

    let stats: serde_json::Value = http
        .get(format!("{}/api/dashboard/stats", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(stats["allow"], 1);
    assert_eq!(stats["deny"], 1);
    assert_eq!(stats["audit_drops"], 0);
    assert!(stats["uptime_seconds"].is_u64());
}

#[tokio::test]
async fn dashboard_is_not_audited() {
    let app = spawn_gateway().await;

    client()
        .get(format!("{}/api/dashboard/stats", app.address))
        .send()
        .await
        .unwrap();

    assert!(read_last_entries(&app.audit_path, 10).is_empty());
}

#[tokio::test]
async fn dashboard_lists_active_policies() {
    let app = spawn_gateway().await;

    let body: serde_json::Value = client()
        .get(format!("{}/api/dashboard/policies", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let policies = body["policies"].as_array().unwrap();
    assert_eq!(policies.len(), 2);
    assert_eq!(policies[0]["method"], "GET");
    assert_eq!(policies[0]["path"], "/api/public");
    assert_eq!(policies[1]["roles"], serde_json::json!(["admin"]));
}

#[tokio::test]
async fn dashboard_reports_limiter_buckets() {
    let app = spawn_gateway().await;
    let http = client();

    http.get(format!("{}/api/public", app.address))
        .header("X-API-Key", K_USER)
        .send()
        .await
        .unwrap();

    let body: serde_json::Value = http
        .get(format!("{}/api/dashboard/status", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["rate_limit"]["ip_buckets"], 1);
    assert_eq!(body["rate_limit"]["user_buckets"], 1);
}

#[tokio::test]
async fn dashboard_audit_tail_respects_limit() {
    let app = spawn_gateway().await;
    let http = client();

    for _ in 0..5 {
        http.get(format!("{}/health", app.address))
            .send()
            .await
            .unwrap();
    }

    let body: serde_json::Value = http
        .get(format!("{}/api/dashboard/audit?limit=3", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["entries"].as_array().unwrap().len(), 3);

    // Out-of-range limits fall back to the default.
    let body: serde_json::Value = http
        .get(format!("{}/api/dashboard/audit?limit=9999", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["entries"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn dashboard_rejects_non_get() {
    let app = spawn_gateway().await;

    let res = client()
        .post(format!("{}/api/dashboard/stats", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 405);
}
