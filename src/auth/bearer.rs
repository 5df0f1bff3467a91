use anyhow::{Context, Result};
use axum::http::{header::AUTHORIZATION, HeaderMap};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use crate::error::GatewayError;
use crate::identity::Identity;

/// Claims we read out of a verified token. Issuer, audience and expiry are
/// validated against the raw claim set by `jsonwebtoken` before this struct
/// is produced.
#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[serde(default)]
    roles: Option<serde_json::Value>,
}

/// Verifies RS256-signed bearer tokens against a fixed public key.
///
/// No token issuance, no key rotation, no algorithm negotiation: anything
/// that is not RS256 signed by the configured key is rejected, including
/// `alg: none`.
pub struct BearerVerifier {
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
}

impl BearerVerifier {
    pub fn new(public_key_pem: &str, issuer: String, audience: String) -> Result<Self> {
        let decoding_key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())
            .context("failed to parse bearer token public key as RSA PEM")?;
        Ok(Self {
            decoding_key,
            issuer,
            audience,
        })
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    pub fn verify(&self, token: &str) -> Result<Identity, GatewayError> {
        let header =
            decode_header(token).map_err(|_| GatewayError::unauthorized("invalid token"))?;
        if header.alg != Algorithm::RS256 {
            return Err(GatewayError::unauthorized("unexpected signing algorithm"));
        }

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);

        let data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|_| GatewayError::unauthorized("invalid token"))?;

        if data.claims.sub.is_empty() {
            return Err(GatewayError::unauthorized("token subject missing"));
        }

        Ok(Identity::bearer(
            data.claims.sub,
            extract_roles(data.claims.roles),
            self.issuer.clone(),
            self.audience.clone(),
        ))
    }
}

/// Read `Authorization: Bearer <token>` and verify it.
pub fn authenticate(
    verifier: &BearerVerifier,
    headers: &HeaderMap,
) -> Result<Identity, GatewayError> {
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| GatewayError::unauthorized("missing Authorization header"))?;

    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| GatewayError::unauthorized("invalid Authorization header format"))?;

    verifier.verify(token)
}

/// The roles claim is an array of strings; non-string elements are ignored
/// and a missing claim means no roles.
fn extract_roles(raw: Option<serde_json::Value>) -> Vec<String> {
    match raw {
        Some(serde_json::Value::Array(items)) => items
            .into_iter()
            .filter_map(|v| match v {
                serde_json::Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}
