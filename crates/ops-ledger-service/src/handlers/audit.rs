//! Audit ledger search handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use ops_ledger_core::{AuditEntry, OperationType, Pagination, PaymentStatus, TenantId};
use ops_ledger_store::{AuditFilter, Store};

use crate::auth::Operator;
use crate::error::ApiError;
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: u64 = 50;
const MAX_PAGE_SIZE: u64 = 200;

/// Audit search query parameters.
#[derive(Debug, Deserialize)]
pub struct AuditSearchQuery {
    /// Case-insensitive substring match over tenant name or actor.
    pub text: Option<String>,
    /// Exact operation type.
    pub operation: Option<OperationType>,
    /// Inclusive start date (`YYYY-MM-DD`).
    pub start_date: Option<String>,
    /// Inclusive end date (`YYYY-MM-DD`, covers the whole day).
    pub end_date: Option<String>,
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

/// Audit entry response.
#[derive(Debug, Serialize)]
pub struct AuditEntryResponse {
    /// Entry ID.
    pub id: String,
    /// Operator identity.
    pub actor: String,
    /// Tenant ID.
    pub tenant_id: String,
    /// Tenant display name at the time of the action.
    pub tenant_name: String,
    /// Operation classification.
    pub operation: OperationType,
    /// Requested amount.
    pub amount: i64,
    /// Available credits before.
    pub previous_balance: i64,
    /// Available credits after.
    pub new_balance: i64,
    /// Free-text reason.
    pub reason: String,
    /// Payment-tracking status.
    pub payment_status: PaymentStatus,
    /// Payment date, if tracked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_date: Option<String>,
    /// Timestamp.
    pub created_at: String,
}

impl From<&AuditEntry> for AuditEntryResponse {
    fn from(entry: &AuditEntry) -> Self {
        Self {
            id: entry.id.to_string(),
            actor: entry.actor.clone(),
            tenant_id: entry.tenant_id.to_string(),
            tenant_name: entry.tenant_name.clone(),
            operation: entry.operation,
            amount: entry.amount,
            previous_balance: entry.previous_balance,
            new_balance: entry.new_balance,
            reason: entry.reason.clone(),
            payment_status: entry.payment_status,
            payment_date: entry.payment_date.map(|d| d.to_rfc3339()),
            created_at: entry.created_at.to_rfc3339(),
        }
    }
}

/// Audit search response.
#[derive(Debug, Serialize)]
pub struct AuditSearchResponse {
    /// Matching entries, newest first.
    pub entries: Vec<AuditEntryResponse>,
    /// Pagination metadata.
    pub pagination: Pagination,
}

/// Search the audit ledger with optional filters.
pub async fn search_audit(
    State(state): State<Arc<AppState>>,
    _operator: Operator,
    Query(query): Query<AuditSearchQuery>,
) -> Result<Json<AuditSearchResponse>, ApiError> {
    let page = query.page.max(1);
    let page_size = query.page_size.clamp(1, MAX_PAGE_SIZE);

    let filter = AuditFilter {
        text: query.text.filter(|t| !t.is_empty()),
        operation: query.operation,
        start: query.start_date.as_deref().map(parse_start_date).transpose()?,
        end: query.end_date.as_deref().map(parse_end_date).transpose()?,
    };

    let (entries, total_count) = state.store.query_audit(&filter, page, page_size)?;

    Ok(Json(AuditSearchResponse {
        entries: entries.iter().map(AuditEntryResponse::from).collect(),
        pagination: Pagination::new(page, page_size, total_count),
    }))
}

/// List one tenant's audit history, newest first.
pub async fn tenant_audit(
    State(state): State<Arc<AppState>>,
    _operator: Operator,
    Path(tenant_id): Path<String>,
    Query(query): Query<AuditSearchQuery>,
) -> Result<Json<AuditSearchResponse>, ApiError> {
    let tenant_id = tenant_id
        .parse::<TenantId>()
        .map_err(|_| ApiError::BadRequest("Invalid tenant ID".into()))?;

    // Listing history for a missing tenant is a 404, not an empty page.
    state
        .store
        .get_tenant(&tenant_id)?
        .ok_or_else(|| ApiError::TenantNotFound(tenant_id.to_string()))?;

    let page = query.page.max(1);
    let page_size = query.page_size.clamp(1, MAX_PAGE_SIZE);

    let (entries, total_count) = state
        .store
        .list_audit_by_tenant(&tenant_id, page, page_size)?;

    Ok(Json(AuditSearchResponse {
        entries: entries.iter().map(AuditEntryResponse::from).collect(),
        pagination: Pagination::new(page, page_size, total_count),
    }))
}

/// Parse an inclusive start date: midnight at the start of the day.
fn parse_start_date(raw: &str) -> Result<DateTime<Utc>, ApiError> {
    let date = parse_date(raw)?;
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid start_date: {raw}")))
}

/// Parse an inclusive end date: extended to the last instant of the day.
fn parse_end_date(raw: &str) -> Result<DateTime<Utc>, ApiError> {
    let date = parse_date(raw)?;
    date.and_hms_milli_opt(23, 59, 59, 999)
        .map(|dt| dt.and_utc())
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid end_date: {raw}")))
}

fn parse_date(raw: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("Invalid date: {raw} (expected YYYY-MM-DD)")))
}
