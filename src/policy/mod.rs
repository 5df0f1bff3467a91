// ============================================================================
// Policy Engine
// ============================================================================
//
// Policies are static data, not code: no expressions, no templates, no
// interpolation. A file must parse and validate in full before it is
// accepted, and any error at any point leaves the engine serving an empty
// rule set. Deny-all is the failure mode, never a partial or stale set.
//
// ============================================================================

mod validation;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

pub use validation::validate_rules;

/// A single authorization rule: method, path prefix, allowed roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub method: String,
    pub path: String,
    pub roles: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PolicyFile {
    policies: Vec<Rule>,
}

#[derive(Debug, Default)]
struct PolicyState {
    rules: Vec<Rule>,
    loaded: bool,
}

/// Holds the active policy set behind a reader-writer lock so request
/// threads snapshot concurrently while the reload task swaps atomically.
#[derive(Debug, Default)]
pub struct PolicyEngine {
    state: RwLock<PolicyState>,
}

impl PolicyEngine {
    /// An empty engine. Empty means deny-all.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current rules, empty unless a full file has loaded successfully.
    pub async fn snapshot(&self) -> Vec<Rule> {
        let state = self.state.read().await;
        if !state.loaded {
            return Vec::new();
        }
        state.rules.clone()
    }

    /// Load and validate a policy file, atomically replacing the active set.
    /// Any failure invalidates the engine before the error is returned.
    pub async fn load(&self, path: &Path) -> Result<()> {
        let result = self.try_load(path).await;
        if result.is_err() {
            self.invalidate().await;
        }
        result
    }

    async fn try_load(&self, path: &Path) -> Result<()> {
        let data = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read policy file {}", path.display()))?;

        let file: PolicyFile = serde_yaml::from_str(&data).context("invalid policy YAML")?;
        validate_rules(&file.policies)?;

        let mut state = self.state.write().await;
        state.rules = file.policies;
        state.loaded = true;
        Ok(())
    }

    pub async fn invalidate(&self) {
        let mut state = self.state.write().await;
        state.rules = Vec::new();
        state.loaded = false;
    }

    /// Poll the file's mtime and reload when it advances. Errors put the
    /// engine in deny-all until a later reload succeeds; each transition is
    /// logged once.
    pub fn watch(self: Arc<Self>, path: PathBuf, interval: std::time::Duration) {
        let engine = self;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            let mut last_modified: Option<SystemTime> = None;
            let mut healthy = true;

            loop {
                ticker.tick().await;

                let modified = match tokio::fs::metadata(&path).await.and_then(|m| m.modified()) {
                    Ok(m) => m,
                    Err(e) => {
                        engine.invalidate().await;
                        if healthy {
                            tracing::warn!(
                                error = %e,
                                path = %path.display(),
                                "policy file unreadable, serving deny-all"
                            );
                            healthy = false;
                        }
                        continue;
                    }
                };

                let changed = last_modified.map(|last| modified > last).unwrap_or(true);
                if !changed {
                    continue;
                }

                match engine.load(&path).await {
                    Ok(()) => {
                        last_modified = Some(modified);
                        if !healthy {
                            tracing::info!(path = %path.display(), "policy reload recovered");
                        } else {
                            tracing::info!(path = %path.display(), "policies reloaded");
                        }
                        healthy = true;
                    }
                    Err(e) => {
                        if healthy {
                            tracing::warn!(
                                error = %e,
                                path = %path.display(),
                                "policy reload failed, serving deny-all"
                            );
                            healthy = false;
                        }
                    }
                }
            }
        });
    }
}
