//! # Stillbook HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `GET  /health` - Health check
//! - `GET  /status` - Ledger metrics
//! - `GET  /batches?q=` - List or search batches
//! - `POST /batches` - Create a batch
//! - `GET  /batches/{number}` - Full batch log
//! - `POST /batches/{number}/sections/{section}/slots/{index}/record` - Create a stage record
//! - `PUT  /records/{id}` - Update a stage record
//! - `DELETE /records/{id}` - Delete a stage record
//! - `POST /records/{id}/products` - Attach a product to a Totals record
//! - `DELETE /products/{id}` - Delete a product
//! - `GET  /batches/{number}/export` - Export a batch as CSV
//!
//! ## Security Configuration (Environment Variables)
//!
//! - `STILLBOOK_CORS_ORIGINS`: Comma-separated list of allowed origins, or "*" for all (default: localhost only)
//! - `STILLBOOK_RATE_LIMIT`: Requests per second (default: 100, 0 to disable)
//! - `STILLBOOK_API_KEY`: If set, requires Bearer token authentication

mod auth;
mod handlers;
mod middleware;
mod types;

// Re-exports for external use
pub use auth::configured_api_key;
pub use middleware::{build_rate_limiter, configured_rate_limit};
// Re-export handlers and types for integration tests (via `stillbook::api::*`)
#[allow(unused_imports)]
pub use handlers::{
    batch_handler, create_batch_handler, create_product_handler, create_record_handler,
    delete_product_handler, delete_record_handler, export_handler, health_handler,
    search_batches_handler, status_handler, update_record_handler,
};
#[allow(unused_imports)]
pub use types::{
    AckResponse, BatchDetail, BatchDetailResponse, BatchResponse, BatchSummary, CreateBatchRequest,
    CutsJson, HealthResponse, ProductJson, ProductRequest, ProductResponse, RecordJson,
    RecordRequest, RecordResponse, SearchResponse, SectionJson, SlotJson, StatusResponse,
};

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post, put},
};
use std::sync::Arc;
use stillbook_core::{Ledger, StillbookError};
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state containing the ledger.
#[derive(Clone)]
pub struct AppState {
    /// The ledger holding all batch state.
    pub ledger: Arc<RwLock<Ledger>>,
}

impl AppState {
    /// Create new app state with a ledger.
    #[must_use]
    pub fn new(ledger: Ledger) -> Self {
        Self {
            ledger: Arc::new(RwLock::new(ledger)),
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Localhost origins allowed when `STILLBOOK_CORS_ORIGINS` is unset.
const LOCALHOST_ORIGINS: [&str; 4] = [
    "http://localhost:3000",
    "http://localhost:8080",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:8080",
];

/// Build the CORS layer from `STILLBOOK_CORS_ORIGINS`.
///
/// `*` allows every origin; a comma-separated list allows exactly those;
/// unset (or a list with no parseable entries) restricts to localhost.
fn build_cors_layer() -> CorsLayer {
    let configured = std::env::var("STILLBOOK_CORS_ORIGINS").ok();

    if configured.as_deref() == Some("*") {
        tracing::warn!("CORS: allowing ALL origins (STILLBOOK_CORS_ORIGINS=*)");
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = match configured.as_deref() {
        Some(list) => list
            .split(',')
            .map(str::trim)
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(value) => {
                    tracing::info!("CORS: allowing origin {}", origin);
                    Some(value)
                }
                Err(e) => {
                    tracing::warn!("CORS: skipping invalid origin '{}': {}", origin, e);
                    None
                }
            })
            .collect(),
        None => Vec::new(),
    };

    let origins = if origins.is_empty() {
        tracing::info!("CORS: restricting to localhost origins");
        LOCALHOST_ORIGINS
            .iter()
            .filter_map(|o| o.parse::<HeaderValue>().ok())
            .collect()
    } else {
        origins
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. CORS - handles preflight requests
/// 2. Tracing - logs all requests
/// 3. Rate Limiting - protects against DoS (if enabled)
/// 4. Authentication - validates API key (if configured)
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer();

    // Check if rate limiting is enabled
    let rate_limiter = match configured_rate_limit() {
        Some(rps) => {
            tracing::info!("Rate limiting enabled: {} requests/second", rps);
            Some(build_rate_limiter(rps))
        }
        None => {
            tracing::info!("Rate limiting disabled");
            None
        }
    };

    // Check if authentication is enabled
    let has_auth = configured_api_key().is_some();
    if has_auth {
        tracing::info!("API key authentication enabled");
    } else {
        tracing::warn!(
            "API key authentication disabled; set STILLBOOK_API_KEY to require a key"
        );
    }

    // Build base router with routes
    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/status", get(handlers::status_handler))
        .route(
            "/batches",
            get(handlers::search_batches_handler).post(handlers::create_batch_handler),
        )
        .route("/batches/{number}", get(handlers::batch_handler))
        .route(
            "/batches/{number}/sections/{section}/slots/{index}/record",
            post(handlers::create_record_handler),
        )
        .route(
            "/records/{id}",
            put(handlers::update_record_handler).delete(handlers::delete_record_handler),
        )
        .route(
            "/records/{id}/products",
            post(handlers::create_product_handler),
        )
        .route(
            "/products/{id}",
            axum::routing::delete(handlers::delete_product_handler),
        )
        .route("/batches/{number}/export", get(handlers::export_handler));

    // Apply authentication middleware (innermost - runs last on request)
    if has_auth {
        router = router.layer(axum_middleware::from_fn(auth::require_api_key));
    }

    // Apply rate limiting middleware
    if let Some(limiter) = rate_limiter {
        router = router.layer(axum_middleware::from_fn_with_state(
            limiter,
            middleware::enforce_rate_limit,
        ));
    }

    // Apply CORS, body limit, and tracing (outermost layers)
    router
        .layer(axum::extract::DefaultBodyLimit::max(2 * 1024 * 1024))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server.
pub async fn run_server(addr: &str, ledger: Ledger) -> Result<(), StillbookError> {
    let state = AppState::new(ledger);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| StillbookError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("Stillbook HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .await
        .map_err(|e| StillbookError::IoError(format!("Server error: {}", e)))
}
