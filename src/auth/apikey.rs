use std::collections::HashMap;

use anyhow::{Context, Result};
use axum::http::HeaderMap;
use subtle::ConstantTimeEq;

use crate::error::GatewayError;
use crate::identity::Identity;

const API_KEY_HEADER: &str = "x-api-key";

/// One provisioned API key. Key material is held in memory only.
#[derive(Debug, Clone)]
pub struct ApiKeyRecord {
    pub id: String,
    pub key: String,
    pub roles: Vec<String>,
}

/// In-memory key store mapping raw key material to its record.
#[derive(Debug, Default)]
pub struct ApiKeyStore {
    keys: HashMap<String, ApiKeyRecord>,
}

impl ApiKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: ApiKeyRecord) {
        self.keys.insert(record.key.clone(), record);
    }

    pub fn lookup(&self, key: &str) -> Option<&ApiKeyRecord> {
        self.keys.get(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Parse a `id=key=role1|role2,...` spec, the format used by the
    /// API_KEYS environment variable.
    pub fn from_spec(spec: &str) -> Result<Self> {
        let mut store = Self::new();
        for part in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let mut fields = part.splitn(3, '=');
            let id = fields.next().context("API key entry missing id")?.trim();
            let key = fields.next().context("API key entry missing key")?.trim();
            let roles = fields.next().context("API key entry missing roles")?;
            if id.is_empty() || key.is_empty() {
                anyhow::bail!("API key entry has empty id or key: {}", part);
            }
            let roles: Vec<String> = roles
                .split('|')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(String::from)
                .collect();
            if roles.is_empty() {
                anyhow::bail!("API key entry has no roles: {}", id);
            }
            store.insert(ApiKeyRecord {
                id: id.to_string(),
                key: key.to_string(),
                roles,
            });
        }
        if store.is_empty() {
            anyhow::bail!("API key spec contains no entries");
        }
        Ok(store)
    }
}

/// Check `X-API-Key` against the store and produce the caller's identity.
///
/// The presented key is re-compared against the stored material in constant
/// time after the map lookup, so a match can never be decided by a timing
/// side channel.
pub fn authenticate(store: &ApiKeyStore, headers: &HeaderMap) -> Result<Identity, GatewayError> {
    let key = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if key.is_empty() {
        return Err(GatewayError::unauthorized("missing API key"));
    }

    let record = store
        .lookup(key)
        .ok_or_else(|| GatewayError::unauthorized("invalid API key"))?;

    if !bool::from(key.as_bytes().ct_eq(record.key.as_bytes())) {
        return Err(GatewayError::unauthorized("invalid API key"));
    }

    Ok(Identity::api_key(record.id.clone(), record.roles.clone()))
}
