//! # Middleware Module
//!
//! Global rate limiting for the Stillbook HTTP API.
//!
//! The limit comes from `STILLBOOK_RATE_LIMIT` (requests per second,
//! default 100). A value of 0 disables the limiter entirely; the router
//! skips the layer in that case.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use std::num::NonZeroU32;
use std::sync::Arc;

// =============================================================================
// RATE LIMITER
// =============================================================================

/// Shared, unkeyed rate limiter applied to every request.
pub type GlobalRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// The configured requests-per-second quota, or `None` when disabled.
///
/// Unset or unparseable values fall back to the default of 100.
pub fn configured_rate_limit() -> Option<NonZeroU32> {
    let rps = std::env::var("STILLBOOK_RATE_LIMIT")
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(100);
    NonZeroU32::new(rps)
}

/// Build a global rate limiter for the given quota.
pub fn build_rate_limiter(rps: NonZeroU32) -> GlobalRateLimiter {
    Arc::new(RateLimiter::direct(Quota::per_second(rps)))
}

/// Reject requests over the global quota with 429.
pub async fn enforce_rate_limit(
    State(limiter): State<GlobalRateLimiter>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, &'static str)> {
    match limiter.check() {
        Ok(()) => Ok(next.run(request).await),
        Err(_) => {
            tracing::warn!("Rate limit exceeded");
            Err((StatusCode::TOO_MANY_REQUESTS, "Too Many Requests"))
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
