// ============================================================================
// Audit Logging
// ============================================================================
//
// Append-only JSON-lines file with a SHA-256 hash chain: each entry commits
// to its predecessor, so deletion, modification, or reordering of persisted
// entries is detectable at verify time. Tamper-evident, not tamper-proof.
//
// Logging failures never block request handling: the gateway trades a
// detectable audit gap for availability, and counts every dropped entry.
//
// ============================================================================

mod logger;
mod middleware;
mod reader;
mod verify;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub use logger::AuditLogger;
pub use middleware::record_decision;
pub use reader::read_last_entries;
pub use verify::{verify_log_integrity, ChainError};

/// Final outcome of a request as recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Allow => "ALLOW",
            Decision::Deny => "DENY",
        }
    }
}

/// One audit record, serialized as a single JSON line.
///
/// `timestamp` is kept as the exact RFC 3339 string that was hashed, so
/// verification never depends on re-rendering a parsed time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub timestamp: String,
    pub method: String,
    pub path: String,
    pub decision: Decision,
    pub reason: String,
    pub prev_hash: String,
    pub hash: String,
}

/// SHA-256 over the field bytes in fixed order. The first entry of a file
/// uses the empty string as `prev_hash`.
pub(crate) fn compute_hash(entry: &Entry) -> String {
    let mut hasher = Sha256::new();
    hasher.update(entry.timestamp.as_bytes());
    hasher.update(entry.method.as_bytes());
    hasher.update(entry.path.as_bytes());
    hasher.update(entry.decision.as_str().as_bytes());
    hasher.update(entry.reason.as_bytes());
    hasher.update(entry.prev_hash.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> Entry {
        Entry {
            timestamp: "2026-08-02T10:00:00.000000001Z".to_string(),
            method: "GET".to_string(),
            path: "/api/public".to_string(),
            decision: Decision::Allow,
            reason: "all checks passed".to_string(),
            prev_hash: String::new(),
            hash: String::new(),
        }
    }

    #[test]
    fn hash_is_hex_sha256() {
        let h = compute_hash(&entry());
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn hash_covers_every_field() {
        let base = compute_hash(&entry());

        let mut e = entry();
        e.timestamp = "2026-08-02T10:00:00.000000002Z".to_string();
        assert_ne!(compute_hash(&e), base);

        let mut e = entry();
        e.method = "POST".to_string();
        assert_ne!(compute_hash(&e), base);

        let mut e = entry();
        e.path = "/api/admin".to_string();
        assert_ne!(compute_hash(&e), base);

        let mut e = entry();
        e.decision = Decision::Deny;
        assert_ne!(compute_hash(&e), base);

        let mut e = entry();
        e.reason = "Forbidden".to_string();
        assert_ne!(compute_hash(&e), base);

        let mut e = entry();
        e.prev_hash = "a".repeat(64);
        assert_ne!(compute_hash(&e), base);
    }

    #[test]
    fn decision_serializes_upper_case() {
        assert_eq!(serde_json::to_string(&Decision::Allow).unwrap(), "\"ALLOW\"");
        assert_eq!(serde_json::to_string(&Decision::Deny).unwrap(), "\"DENY\"");
    }
}
