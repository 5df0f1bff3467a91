// ============================================================================
// trustgate - zero-trust reverse proxy
// ============================================================================
//
// Every inbound request traverses a fixed chain of checks before it may
// reach the upstream:
//
//   1. Request validation    :  reject malformed traffic early
//   2. Authentication        :  establish identity
//   3. RBAC authorization    :  role-based, policy-driven access
//   4. Rate limiting         :  abuse prevention
//   5. Reverse proxy         :  upstream forwarding
//
// The audit layer wraps the whole chain so the tamper-evident log records
// the final decision for every request, including ones denied by the very
// first stage. Default deny at every layer; the proxy is reached only if
// all checks pass.
//
// ============================================================================

pub mod audit;
pub mod auth;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod health;
pub mod identity;
pub mod policy;
pub mod proxy;
pub mod ratelimit;
pub mod rbac;
pub mod validate;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{middleware, routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::audit::AuditLogger;
use crate::auth::{ApiKeyStore, Authenticator, BearerVerifier};
use crate::config::{AuthConfig, Config};
use crate::dashboard::StatsCollector;
use crate::policy::PolicyEngine;
use crate::proxy::ProxyClient;
use crate::ratelimit::Limiter;

/// Everything the request pipeline shares. Constructed once at startup and
/// handed to every stage behind an `Arc`.
pub struct AppState {
    pub config: Config,
    pub authenticator: Authenticator,
    pub policy: Arc<PolicyEngine>,
    pub limiter: Limiter,
    pub audit: AuditLogger,
    pub stats: StatsCollector,
    pub proxy: ProxyClient,
}

impl AppState {
    /// Build all subsystems from configuration and start the policy
    /// watcher. An unreadable or invalid policy file is not fatal: the
    /// gateway starts in deny-all mode and recovers on a later reload.
    pub async fn from_config(config: Config) -> Result<Arc<Self>> {
        let authenticator = match &config.auth {
            AuthConfig::ApiKey { keys_spec } => Authenticator::ApiKey(
                ApiKeyStore::from_spec(keys_spec).context("invalid API key configuration")?,
            ),
            AuthConfig::Bearer {
                issuer,
                audience,
                public_key_pem,
            } => Authenticator::Bearer(BearerVerifier::new(
                public_key_pem,
                issuer.clone(),
                audience.clone(),
            )?),
        };

        let audit = AuditLogger::open(&config.audit_log_path).with_context(|| {
            format!(
                "failed to open audit log {}",
                config.audit_log_path.display()
            )
        })?;

        let policy = Arc::new(PolicyEngine::new());
        if let Err(e) = policy.load(&config.policy_path).await {
            tracing::warn!(
                error = %e,
                path = %config.policy_path.display(),
                "policy load failed, gateway running in deny-all mode"
            );
        }
        policy.clone().watch(
            config.policy_path.clone(),
            Duration::from_secs(config.policy_reload_secs),
        );

        let proxy = ProxyClient::new(config.upstream_url.clone(), config.request_timeout_secs);

        Ok(Arc::new(Self {
            config,
            authenticator,
            policy,
            limiter: Limiter::new(),
            audit,
            stats: StatsCollector::new(),
            proxy,
        }))
    }
}

/// Assemble the full router.
///
/// The secured chain is layered onto the proxy fallback in explicit order;
/// the dashboard API is merged alongside it and bypasses the chain
/// entirely. Middleware added last runs first, so the audit layer is added
/// last to wrap everything.
pub fn app(state: Arc<AppState>) -> Router {
    let secured = Router::new()
        .route("/health", get(health::health_check))
        .fallback(proxy::forward)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            ratelimit::enforce,
        ))
        .layer(middleware::from_fn_with_state(state.clone(), rbac::authorize))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::authenticate,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            validate::validate_request,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            audit::record_decision,
        ));

    Router::new()
        .nest("/api/dashboard", dashboard::router())
        .merge(secured)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(Duration::from_secs(
                    state.config.request_timeout_secs,
                ))),
        )
        .with_state(state)
}
