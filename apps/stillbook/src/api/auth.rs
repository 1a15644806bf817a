//! # Authentication Module
//!
//! Optional shared-key authentication for the Stillbook HTTP API.
//!
//! When `STILLBOOK_API_KEY` is set, every endpoint except `/health`
//! requires the key in the Authorization header, either as
//! `Bearer <key>` or as the raw key. When the variable is unset or
//! empty, the API is open.

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;

// =============================================================================
// KEY CONFIGURATION
// =============================================================================

/// The configured API key, if authentication is enabled.
pub fn configured_api_key() -> Option<String> {
    std::env::var("STILLBOOK_API_KEY")
        .ok()
        .filter(|k| !k.is_empty())
}

/// Constant-time key comparison.
///
/// Both sides are zero-padded to a common length before `ct_eq` so the
/// comparison touches the same number of bytes regardless of input, then
/// the real lengths are required to match.
fn keys_match(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();

    let width = provided.len().max(expected.len());
    let mut lhs = vec![0u8; width];
    let mut rhs = vec![0u8; width];
    lhs[..provided.len()].copy_from_slice(provided);
    rhs[..expected.len()].copy_from_slice(expected);

    let bytes_equal: bool = lhs.ct_eq(&rhs).into();
    bytes_equal && provided.len() == expected.len()
}

// =============================================================================
// MIDDLEWARE
// =============================================================================

/// Reject requests that do not carry the configured API key.
///
/// `/health` stays open so load balancers can probe without credentials.
pub async fn require_api_key(
    request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, &'static str)> {
    let Some(expected) = configured_api_key() else {
        return Ok(next.run(request).await);
    };

    if request.uri().path() == "/health" {
        return Ok(next.run(request).await);
    }

    let provided = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.strip_prefix("Bearer ").unwrap_or(v));

    match provided {
        Some(key) if keys_match(key, &expected) => Ok(next.run(request).await),
        Some(_) => {
            tracing::warn!(
                event = "auth_failure",
                reason = "invalid_api_key",
                "Authentication failed: invalid API key"
            );
            Err((StatusCode::UNAUTHORIZED, "Unauthorized"))
        }
        None => {
            tracing::warn!(
                event = "auth_failure",
                reason = "missing_authorization_header",
                "Missing Authorization header"
            );
            Err((StatusCode::UNAUTHORIZED, "Unauthorized"))
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
