//! Usage ingest handlers (service-to-service).
//!
//! This is the consumption system's write path: each reported call becomes
//! a usage event and bumps the tenant's `credits_used` in the same atomic
//! step. The ledger itself only ever reads the stream.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use ops_ledger_core::{TenantId, UsageEvent};
use ops_ledger_store::Store;

use crate::auth::ServiceAuth;
use crate::error::ApiError;
use crate::state::AppState;

/// Report usage request.
#[derive(Debug, Deserialize)]
pub struct ReportUsageRequest {
    /// The tenant that made the call.
    pub tenant_id: String,
    /// Credit delta for this call (0 for non-metered calls).
    pub credits_used: i64,
    /// The API endpoint that was called.
    pub endpoint: String,
    /// HTTP method (default GET).
    pub method: Option<String>,
    /// Upstream response status (default 200).
    pub status_code: Option<u16>,
    /// Call latency in milliseconds (default 0).
    pub latency_ms: Option<u64>,
}

/// Report usage response.
#[derive(Debug, Serialize)]
pub struct ReportUsageResponse {
    /// The recorded event's ID.
    pub event_id: String,
    /// The tenant's balance after the event.
    pub available_credits: i64,
}

/// Record a single usage event.
pub async fn report_usage(
    State(state): State<Arc<AppState>>,
    auth: ServiceAuth,
    Json(body): Json<ReportUsageRequest>,
) -> Result<Json<ReportUsageResponse>, ApiError> {
    let response = ingest(&state, &auth, body)?;
    Ok(Json(response))
}

/// Batch usage report request.
#[derive(Debug, Deserialize)]
pub struct ReportUsageBatchRequest {
    /// Events to record, in call order.
    pub events: Vec<ReportUsageRequest>,
}

/// Batch usage report response.
#[derive(Debug, Serialize)]
pub struct ReportUsageBatchResponse {
    /// Per-event results, in request order.
    pub results: Vec<ReportUsageResponse>,
}

/// Record several usage events in call order.
pub async fn report_usage_batch(
    State(state): State<Arc<AppState>>,
    auth: ServiceAuth,
    Json(body): Json<ReportUsageBatchRequest>,
) -> Result<Json<ReportUsageBatchResponse>, ApiError> {
    let mut results = Vec::with_capacity(body.events.len());
    for event in body.events {
        results.push(ingest(&state, &auth, event)?);
    }
    Ok(Json(ReportUsageBatchResponse { results }))
}

fn ingest(
    state: &AppState,
    auth: &ServiceAuth,
    body: ReportUsageRequest,
) -> Result<ReportUsageResponse, ApiError> {
    let tenant_id = body
        .tenant_id
        .parse::<TenantId>()
        .map_err(|_| ApiError::BadRequest("Invalid tenant ID".into()))?;

    if body.credits_used < 0 {
        return Err(ApiError::BadRequest(
            "credits_used must be non-negative".into(),
        ));
    }

    let mut event = UsageEvent::new(
        tenant_id,
        body.credits_used,
        body.endpoint,
        body.method.unwrap_or_else(|| "GET".into()),
    );
    event.status_code = body.status_code.unwrap_or(200);
    event.latency_ms = body.latency_ms.unwrap_or(0);

    let available_credits = state.store.record_usage(&event)?;

    tracing::debug!(
        tenant_id = %tenant_id,
        event_id = %event.event_id,
        credits_used = %event.credits_used,
        service = %auth.service_name,
        available = %available_credits,
        "Usage event recorded"
    );

    Ok(ReportUsageResponse {
        event_id: event.event_id.to_string(),
        available_credits,
    })
}
