// ============================================================================
// Rate Limiting
// ============================================================================
//
// Token bucket per key. Every request is limited by client IP; requests
// that carry a user key are additionally limited per user. If the limiter
// itself faults, the decision falls through to one small process-wide
// fallback bucket: an internal failure must never admit unbounded traffic.
//
// ============================================================================

mod bucket;
mod clock;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};

use crate::error::GatewayError;
use crate::AppState;

pub use bucket::TokenBucket;
pub use clock::{Clock, SystemClock};

// Primary limits
pub const IP_BUCKET_CAPACITY: u32 = 20;
pub const IP_REFILL_PER_SECOND: f64 = 5.0;
pub const USER_BUCKET_CAPACITY: u32 = 40;
pub const USER_REFILL_PER_SECOND: f64 = 10.0;

// Fallback (very conservative)
const FALLBACK_CAPACITY: u32 = 2;
const FALLBACK_REFILL_PER_SECOND: f64 = 1.0;

/// Request-scoped user identifier consulted for the per-user bucket.
///
/// The limiter owns this key type; it is populated by whichever upstream
/// stage knows the caller, without the limiter depending on that stage.
#[derive(Debug, Clone)]
pub struct UserKey(pub String);

#[derive(Debug, Default)]
struct Buckets {
    ip: HashMap<String, TokenBucket>,
    user: HashMap<String, TokenBucket>,
}

pub struct Limiter {
    clock: Arc<dyn Clock>,
    buckets: Mutex<Buckets>,
    fallback: Mutex<TokenBucket>,
}

impl Limiter {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            clock,
            buckets: Mutex::new(Buckets::default()),
            fallback: Mutex::new(TokenBucket::new(
                FALLBACK_CAPACITY,
                FALLBACK_REFILL_PER_SECOND,
                now,
            )),
        }
    }

    /// Decide whether to admit a request. Never panics outward: any internal
    /// fault is converted into a charge against the fallback bucket.
    pub fn check(&self, remote: Option<SocketAddr>, user: Option<&str>) -> bool {
        match catch_unwind(AssertUnwindSafe(|| self.check_inner(remote, user))) {
            Ok(Some(allowed)) => allowed,
            Ok(None) | Err(_) => self.fallback_allow(),
        }
    }

    /// `None` signals an internal fault the caller must route to the
    /// fallback bucket.
    fn check_inner(&self, remote: Option<SocketAddr>, user: Option<&str>) -> Option<bool> {
        let ip = remote?.ip().to_string();
        let now = self.clock.now();

        let mut buckets = self.buckets.lock().ok()?;

        let ip_bucket = buckets
            .ip
            .entry(ip)
            .or_insert_with(|| TokenBucket::new(IP_BUCKET_CAPACITY, IP_REFILL_PER_SECOND, now));
        if !ip_bucket.allow(now) {
            return Some(false);
        }

        if let Some(uid) = user.filter(|u| !u.is_empty()) {
            let user_bucket = buckets.user.entry(uid.to_string()).or_insert_with(|| {
                TokenBucket::new(USER_BUCKET_CAPACITY, USER_REFILL_PER_SECOND, now)
            });
            if !user_bucket.allow(now) {
                return Some(false);
            }
        }

        Some(true)
    }

    fn fallback_allow(&self) -> bool {
        let now = self.clock.now();
        match self.fallback.lock() {
            Ok(mut bucket) => bucket.allow(now),
            Err(_) => false,
        }
    }

    /// Counts of currently tracked buckets. No key material is exposed.
    pub fn bucket_counts(&self) -> (usize, usize) {
        match self.buckets.lock() {
            Ok(buckets) => (buckets.ip.len(), buckets.user.len()),
            Err(_) => (0, 0),
        }
    }
}

impl Default for Limiter {
    fn default() -> Self {
        Self::new()
    }
}

/// Rate-limit stage of the secured chain. The IP bucket is always enforced
/// first; the user bucket only when an upstream stage attached a [`UserKey`].
pub async fn enforce(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    if req.uri().path() == "/health" {
        return Ok(next.run(req).await);
    }

    let remote = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|c| c.0);
    let user = req.extensions().get::<UserKey>().map(|u| u.0.clone());

    if state.limiter.check(remote, user.as_deref()) {
        Ok(next.run(req).await)
    } else {
        Err(GatewayError::RateLimited)
    }
}
