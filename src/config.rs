use std::path::PathBuf;

use anyhow::{Context, Result};

// ============================================================================
// Configuration Constants
// ============================================================================

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_UPSTREAM_URL: &str = "http://localhost:9000";
const DEFAULT_POLICY_PATH: &str = "./policies/policies.yaml";
const DEFAULT_POLICY_RELOAD_SECS: u64 = 5;
const DEFAULT_AUDIT_LOG_PATH: &str = "./audit.log";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 60;

/// Hard cap on buffered request bodies.
pub const MAX_REQUEST_BODY_BYTES: usize = 1 << 20; // 1 MiB

/// Demo key store used when API_KEYS is not set. Key material mirrors the
/// documented demo deployment; replace in any real installation.
const DEMO_API_KEYS: &str = "demo-admin=deef0admin0000000000000000000000000000000000000000000000000000=admin,\
demo-user=deef0us3r0000000000000000000000000000000000000000000000000000=user";

// ============================================================================
// Configuration Structures
// ============================================================================

/// Which authenticator the deployment wires into the chain. Exactly one is
/// active per process.
#[derive(Clone, Debug)]
pub enum AuthConfig {
    /// `X-API-Key` lookup against an in-memory store.
    /// Spec format: `id=key=role1|role2,id2=key2=role`.
    ApiKey { keys_spec: String },
    /// RS256-signed bearer tokens in the `Authorization` header.
    Bearer {
        issuer: String,
        audience: String,
        public_key_pem: String,
    },
}

/// Request validation limits.
#[derive(Clone, Debug)]
pub struct ValidationConfig {
    /// Headers that must be present and non-empty on every request.
    pub required_headers: Vec<String>,
    /// Allowed media type prefixes for requests that carry a body.
    pub allowed_content_types: Vec<String>,
    /// Maximum buffered body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            required_headers: vec!["User-Agent".to_string()],
            allowed_content_types: vec![
                "application/json".to_string(),
                "text/plain".to_string(),
            ],
            max_body_bytes: MAX_REQUEST_BODY_BYTES,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    /// Single statically configured origin requests are forwarded to.
    pub upstream_url: String,
    pub policy_path: PathBuf,
    pub policy_reload_secs: u64,
    pub audit_log_path: PathBuf,
    pub request_timeout_secs: u64,
    /// How long a keep-alive connection may sit idle before it is closed.
    pub idle_timeout_secs: u64,
    pub auth: AuthConfig,
    pub validation: ValidationConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let auth = match std::env::var("AUTH_MODE")
            .unwrap_or_else(|_| "api-key".to_string())
            .as_str()
        {
            "api-key" => AuthConfig::ApiKey {
                keys_spec: std::env::var("API_KEYS")
                    .unwrap_or_else(|_| DEMO_API_KEYS.to_string()),
            },
            "bearer" => AuthConfig::Bearer {
                issuer: std::env::var("JWT_ISSUER").context("JWT_ISSUER must be set")?,
                audience: std::env::var("JWT_AUDIENCE").context("JWT_AUDIENCE must be set")?,
                public_key_pem: load_pem(
                    &std::env::var("JWT_PUBLIC_KEY").context("JWT_PUBLIC_KEY must be set")?,
                ),
            },
            other => anyhow::bail!("invalid AUTH_MODE: {} (expected api-key or bearer)", other),
        };

        Ok(Self {
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            upstream_url: std::env::var("UPSTREAM_URL")
                .unwrap_or_else(|_| DEFAULT_UPSTREAM_URL.to_string()),
            policy_path: std::env::var("POLICY_PATH")
                .unwrap_or_else(|_| DEFAULT_POLICY_PATH.to_string())
                .into(),
            policy_reload_secs: std::env::var("POLICY_RELOAD_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_POLICY_RELOAD_SECS),
            audit_log_path: std::env::var("AUDIT_LOG_PATH")
                .unwrap_or_else(|_| DEFAULT_AUDIT_LOG_PATH.to_string())
                .into(),
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            idle_timeout_secs: std::env::var("IDLE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_IDLE_TIMEOUT_SECS),
            auth,
            validation: ValidationConfig::default(),
        })
    }
}

/// Accept either a PEM string or a path to a PEM file, the same way JWT key
/// material is commonly injected via environment or mounted secret.
fn load_pem(value: &str) -> String {
    if value.starts_with("-----BEGIN") {
        return value.to_string();
    }
    std::fs::read_to_string(value).unwrap_or_else(|e| {
        tracing::warn!(error = %e, path = %value, "failed to read PEM from file, using value as-is");
        value.to_string()
    })
}
