use std::fs::{File, OpenOptions};
use std::io::Write;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{SecondsFormat, Utc};

use super::{compute_hash, Decision, Entry};

struct Inner {
    file: File,
    last_hash: String,
}

/// Append-only, hash-chained audit logger.
///
/// A single mutex covers serialization and the write, so entries land in
/// the file in the same total order the chain commits to. `last_hash`
/// advances only when the write succeeded; failed appends are counted and
/// otherwise swallowed.
pub struct AuditLogger {
    inner: Mutex<Inner>,
    drops: AtomicU64,
}

impl AuditLogger {
    /// Open (or create) the audit log file in append mode.
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .write(true)
            .open(path)?;
        Ok(Self {
            inner: Mutex::new(Inner {
                file,
                last_hash: String::new(),
            }),
            drops: AtomicU64::new(0),
        })
    }

    /// Append one entry. Infallible from the caller's point of view.
    pub fn log(&self, method: &str, path: &str, decision: Decision, reason: &str) {
        let outcome = catch_unwind(AssertUnwindSafe(|| self.try_log(method, path, decision, reason)));
        match outcome {
            Ok(true) => {}
            Ok(false) | Err(_) => {
                self.drops.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn try_log(&self, method: &str, path: &str, decision: Decision, reason: &str) -> bool {
        let Ok(mut inner) = self.inner.lock() else {
            return false;
        };

        let mut entry = Entry {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true),
            method: method.to_string(),
            path: path.to_string(),
            decision,
            reason: reason.to_string(),
            prev_hash: inner.last_hash.clone(),
            hash: String::new(),
        };
        entry.hash = compute_hash(&entry);

        let Ok(mut line) = serde_json::to_vec(&entry) else {
            return false;
        };
        line.push(b'\n');

        if inner.file.write_all(&line).is_err() {
            return false;
        }

        inner.last_hash = entry.hash;
        true
    }

    /// Number of entries lost to write or serialization failures.
    pub fn dropped(&self) -> u64 {
        self.drops.load(Ordering::Relaxed)
    }
}
