//! Tenant provisioning and balance handlers.
//!
//! Provisioning stands in for the external tenant directory; everything
//! else in this service only reads tenants or moves their counters through
//! the mutation engine.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use ops_ledger_core::{TenantAccount, TenantId};
use ops_ledger_store::Store;

use crate::auth::Operator;
use crate::error::ApiError;
use crate::state::AppState;

/// Tenant account response.
#[derive(Debug, Serialize)]
pub struct TenantResponse {
    /// Tenant ID.
    pub tenant_id: String,
    /// Display name.
    pub name: String,
    /// Operator-adjustable ceiling.
    pub base_credit: i64,
    /// Cumulative consumption.
    pub credits_used: i64,
    /// Derived balance, recomputed on every read.
    pub available_credits: i64,
    /// Created timestamp.
    pub created_at: String,
}

impl From<&TenantAccount> for TenantResponse {
    fn from(account: &TenantAccount) -> Self {
        Self {
            tenant_id: account.tenant_id.to_string(),
            name: account.name.clone(),
            base_credit: account.base_credit,
            credits_used: account.credits_used,
            available_credits: account.available_credits(),
            created_at: account.created_at.to_rfc3339(),
        }
    }
}

/// Create tenant request.
#[derive(Debug, Deserialize)]
pub struct CreateTenantRequest {
    /// Tenant ID from the directory; generated when absent.
    pub tenant_id: Option<String>,
    /// Display name.
    pub name: String,
    /// Starting credit ceiling (default 0).
    #[serde(default)]
    pub base_credit: i64,
}

/// Provision a tenant account.
pub async fn create_tenant(
    State(state): State<Arc<AppState>>,
    operator: Operator,
    Json(body): Json<CreateTenantRequest>,
) -> Result<Json<TenantResponse>, ApiError> {
    let tenant_id = match body.tenant_id {
        Some(raw) => raw
            .parse::<TenantId>()
            .map_err(|_| ApiError::BadRequest("Invalid tenant ID".into()))?,
        None => TenantId::generate(),
    };

    if body.base_credit < 0 {
        return Err(ApiError::BadRequest("base_credit must be non-negative".into()));
    }

    if state.store.get_tenant(&tenant_id)?.is_some() {
        return Err(ApiError::BadRequest("Tenant already exists".into()));
    }

    let account = TenantAccount::new(tenant_id, body.name, body.base_credit);
    state.store.put_tenant(&account)?;

    tracing::info!(
        tenant_id = %account.tenant_id,
        name = %account.name,
        base_credit = %account.base_credit,
        actor = %operator.actor,
        "Tenant provisioned"
    );

    Ok(Json(TenantResponse::from(&account)))
}

/// Get a tenant's current balance.
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    _operator: Operator,
    Path(tenant_id): Path<String>,
) -> Result<Json<TenantResponse>, ApiError> {
    let tenant_id = tenant_id
        .parse::<TenantId>()
        .map_err(|_| ApiError::BadRequest("Invalid tenant ID".into()))?;

    let account = state
        .store
        .get_tenant(&tenant_id)?
        .ok_or_else(|| ApiError::TenantNotFound(tenant_id.to_string()))?;

    Ok(Json(TenantResponse::from(&account)))
}
