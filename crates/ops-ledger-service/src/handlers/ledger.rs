//! Reconstructed usage ledger handler.
//!
//! Answers "what was this tenant's balance immediately before and after
//! each usage event" for any page of the reverse-chronological stream,
//! without per-event balances ever having been persisted.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use ops_ledger_core::{reconstruct, Pagination, TenantId, UsageEvent};
use ops_ledger_store::Store;

use crate::auth::Operator;
use crate::error::ApiError;
use crate::handlers::tenants::TenantResponse;
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: u64 = 50;
const MAX_PAGE_SIZE: u64 = 200;

/// Ledger query parameters.
#[derive(Debug, Deserialize)]
pub struct LedgerQuery {
    /// 1-based page number (default 1).
    #[serde(default = "default_page")]
    pub page: u64,
    /// Page size (default 50, max 200).
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

fn default_page() -> u64 {
    1
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

/// One usage event annotated with its reconstructed balances.
#[derive(Debug, Serialize)]
pub struct LedgerEventResponse {
    /// Event ID.
    pub event_id: String,
    /// Credit delta of this call.
    pub credits_used: i64,
    /// The API endpoint that was called.
    pub endpoint: String,
    /// HTTP method.
    pub method: String,
    /// Upstream response status.
    pub status_code: u16,
    /// Call latency in milliseconds.
    pub latency_ms: u64,
    /// Available credits immediately before the event.
    pub before_balance: i64,
    /// Available credits immediately after the event.
    pub after_balance: i64,
    /// When the call happened.
    pub created_at: String,
}

/// Reconstructed ledger response.
#[derive(Debug, Serialize)]
pub struct LedgerResponse {
    /// The requested page, newest first, each event annotated.
    pub events: Vec<LedgerEventResponse>,
    /// Pagination metadata.
    pub pagination: Pagination,
    /// The tenant snapshot the reconstruction anchored on.
    pub tenant: TenantResponse,
}

/// Reconstruct before/after balances for one page of a tenant's usage
/// stream.
pub async fn reconstructed_ledger(
    State(state): State<Arc<AppState>>,
    _operator: Operator,
    Path(tenant_id): Path<String>,
    Query(query): Query<LedgerQuery>,
) -> Result<Json<LedgerResponse>, ApiError> {
    let tenant_id = tenant_id
        .parse::<TenantId>()
        .map_err(|_| ApiError::BadRequest("Invalid tenant ID".into()))?;

    let page = query.page.max(1);
    let page_size = query.page_size.clamp(1, MAX_PAGE_SIZE);

    // One snapshot for the whole computation: events landing mid-request
    // make the answer stale, never internally inconsistent.
    let account = state
        .store
        .get_tenant(&tenant_id)?
        .ok_or_else(|| ApiError::TenantNotFound(tenant_id.to_string()))?;
    let current_balance = account.available_credits();

    let total_count = state.store.count_usage_events(&tenant_id)?;
    let pagination = Pagination::new(page, page_size, total_count);

    // Combined effect of every event strictly newer than this page.
    let skipped_sum = state.store.sum_deltas(&tenant_id, pagination.skipped())?;

    let events = state.store.list_usage_events(&tenant_id, page, page_size)?;
    let deltas: Vec<i64> = events.iter().map(|e| e.credits_used).collect();

    let spans = reconstruct::annotate_page(current_balance, skipped_sum, &deltas);
    reconstruct::verify_continuity(current_balance, skipped_sum, &spans)?;

    let events = events
        .iter()
        .zip(&spans)
        .map(|(event, span)| annotate(event, span.before_balance, span.after_balance))
        .collect();

    Ok(Json(LedgerResponse {
        events,
        pagination,
        tenant: TenantResponse::from(&account),
    }))
}

fn annotate(event: &UsageEvent, before_balance: i64, after_balance: i64) -> LedgerEventResponse {
    LedgerEventResponse {
        event_id: event.event_id.to_string(),
        credits_used: event.credits_used,
        endpoint: event.endpoint.clone(),
        method: event.method.clone(),
        status_code: event.status_code,
        latency_ms: event.latency_ms,
        before_balance,
        after_balance,
        created_at: event.created_at.to_rfc3339(),
    }
}
