//! Credit mutation handler.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ops_ledger_core::{OperationType, PaymentStatus, TenantId};

use crate::auth::Operator;
use crate::engine::{self, MutationRequest};
use crate::error::ApiError;
use crate::handlers::tenants::TenantResponse;
use crate::state::AppState;

/// Mutate credits request.
#[derive(Debug, Deserialize)]
pub struct MutateRequest {
    /// The tenant whose balance to mutate.
    pub tenant_id: String,
    /// `credit_addition` or `refund`.
    pub operation: OperationType,
    /// Amount of credits (must be positive).
    pub amount: i64,
    /// Free-text reason for the audit trail.
    pub reason: Option<String>,
    /// Payment-tracking status for additions billed out-of-band.
    pub payment_status: Option<PaymentStatus>,
    /// When the payment landed, if tracked.
    pub payment_date: Option<DateTime<Utc>>,
}

/// Mutate credits response.
#[derive(Debug, Serialize)]
pub struct MutateResponse {
    /// Available credits before the operation.
    pub previous_balance: i64,
    /// Available credits after the operation.
    pub new_balance: i64,
    /// How much of the requested amount took effect (refunds clamp).
    pub amount_applied: i64,
    /// Whether the audit entry was written. False is a degraded success:
    /// the balance changed but the bookkeeping is incomplete.
    pub audit_recorded: bool,
    /// The audit entry's ID, when recorded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<String>,
    /// Human-readable outcome summary.
    pub message: String,
    /// The tenant after the mutation.
    pub tenant: TenantResponse,
}

/// Apply a credit addition or refund to a tenant.
pub async fn mutate_credits(
    State(state): State<Arc<AppState>>,
    operator: Operator,
    Json(body): Json<MutateRequest>,
) -> Result<Json<MutateResponse>, ApiError> {
    let tenant_id = body
        .tenant_id
        .parse::<TenantId>()
        .map_err(|_| ApiError::BadRequest("Invalid tenant ID".into()))?;

    let reason = body.reason.unwrap_or_else(|| match body.operation {
        OperationType::Refund => "Credits refunded by support".into(),
        _ => "Credits added by support".into(),
    });

    let request = MutationRequest {
        tenant_id,
        operation: body.operation,
        amount: body.amount,
        reason,
        actor: operator.actor,
        payment_status: body.payment_status,
        payment_date: body.payment_date,
    };

    let receipt = engine::mutate(
        state.store.as_ref(),
        state.config.max_mutation_retries,
        &request,
    )?;

    let message = if receipt.audit_recorded {
        match body.operation {
            OperationType::Refund => format!(
                "Refunded {} of {} requested credits to {}",
                receipt.amount_applied, body.amount, receipt.tenant.name
            ),
            _ => format!(
                "Added {} credits to {}",
                receipt.amount_applied, receipt.tenant.name
            ),
        }
    } else {
        format!(
            "Balance updated for {}, but the audit entry could not be written; \
             bookkeeping may be incomplete",
            receipt.tenant.name
        )
    };

    Ok(Json(MutateResponse {
        previous_balance: receipt.previous_balance,
        new_balance: receipt.new_balance,
        amount_applied: receipt.amount_applied,
        audit_recorded: receipt.audit_recorded,
        entry_id: receipt.entry_id.map(|id| id.to_string()),
        message,
        tenant: TenantResponse::from(&receipt.tenant),
    }))
}
