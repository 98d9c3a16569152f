//! Router configuration.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{audit, credits, health, ledger, tenants, usage};
use crate::state::AppState;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Operator (session JWT)
/// - `POST /v1/tenants` - Provision a tenant account
/// - `GET /v1/tenants/{id}/balance` - Current counters and derived balance
/// - `POST /v1/credits/mutate` - Apply a credit addition or refund
/// - `GET /v1/tenants/{id}/ledger` - Reconstructed per-event balances
/// - `GET /v1/audit` - Filtered audit ledger search
/// - `GET /v1/tenants/{id}/audit` - One tenant's audit history
///
/// ## Usage ingest (service API key)
/// - `POST /v1/usage` - Record one usage event
/// - `POST /v1/usage/batch` - Record several usage events
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    Router::new()
        // Health (public)
        .route("/health", get(health::health))
        // Tenants
        .route("/v1/tenants", post(tenants::create_tenant))
        .route("/v1/tenants/:tenant_id/balance", get(tenants::get_balance))
        // Credits
        .route("/v1/credits/mutate", post(credits::mutate_credits))
        // Reconstructed ledger
        .route(
            "/v1/tenants/:tenant_id/ledger",
            get(ledger::reconstructed_ledger),
        )
        // Audit
        .route("/v1/audit", get(audit::search_audit))
        .route("/v1/tenants/:tenant_id/audit", get(audit::tenant_audit))
        // Usage ingest (service auth)
        .route("/v1/usage", post(usage::report_usage))
        .route("/v1/usage/batch", post(usage::report_usage_batch))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
