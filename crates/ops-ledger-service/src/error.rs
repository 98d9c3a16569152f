//! API error types and responses.
//!
//! Every error carries a machine-distinguishable `code` and a
//! human-readable `message`; the UI layer renders them.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use ops_ledger_core::LedgerError;
use ops_ledger_store::StoreError;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// No such tenant. Rejected before any write.
    #[error("tenant not found: {0}")]
    TenantNotFound(String),

    /// Some other resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Mutation amount was zero or negative. Rejected before any write.
    #[error("invalid amount: {0} (must be positive)")]
    InvalidAmount(i64),

    /// Mutation called with an audit-only operation classification.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Bad request - invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The atomic counter update lost its race repeatedly. The caller must
    /// re-read and recompute, never blindly resubmit the same delta.
    #[error("concurrent update conflict: {0}")]
    ConcurrentUpdateConflict(String),

    /// The reconstruction continuity invariant failed verification.
    #[error("data integrity alarm: {0}")]
    DataIntegrity(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                self.to_string(),
                None,
            ),
            Self::TenantNotFound(id) => (
                StatusCode::NOT_FOUND,
                "tenant_not_found",
                self.to_string(),
                Some(serde_json::json!({ "tenant_id": id })),
            ),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            Self::InvalidAmount(amount) => (
                StatusCode::BAD_REQUEST,
                "invalid_amount",
                self.to_string(),
                Some(serde_json::json!({ "amount": amount })),
            ),
            Self::UnsupportedOperation(_) => (
                StatusCode::BAD_REQUEST,
                "unsupported_operation",
                self.to_string(),
                None,
            ),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            Self::ConcurrentUpdateConflict(msg) => (
                StatusCode::CONFLICT,
                "concurrent_update_conflict",
                msg.clone(),
                None,
            ),
            Self::DataIntegrity(msg) => {
                tracing::error!(error = %msg, "Reconstruction integrity alarm");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "data_integrity",
                    msg.clone(),
                    None,
                )
            }
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity: "tenant", id } => Self::TenantNotFound(id),
            StoreError::NotFound { entity, id } => Self::NotFound(format!("{entity}: {id}")),
            StoreError::CounterConflict { tenant_id } => Self::ConcurrentUpdateConflict(format!(
                "counters for tenant {tenant_id} moved during update"
            )),
            StoreError::CounterOverflow { tenant_id } => Self::BadRequest(format!(
                "usage delta overflows the consumption counter for tenant {tenant_id}"
            )),
            StoreError::Database(msg) | StoreError::Serialization(msg) => Self::Internal(msg),
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InvalidAmount { amount } => Self::InvalidAmount(amount),
            LedgerError::UnsupportedOperation { operation } => {
                Self::UnsupportedOperation(operation)
            }
            LedgerError::ReconstructionInconsistent { detail } => Self::DataIntegrity(detail),
        }
    }
}
