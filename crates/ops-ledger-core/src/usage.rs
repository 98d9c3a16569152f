//! Usage events from the metered API stream.
//!
//! The ledger only reads these. Each event carries the credit delta of a
//! single API call plus the request envelope the upstream system logs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{EventId, TenantId};

/// One metered API call's consumption record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageEvent {
    /// Unique event ID (ULID; doubles as the pagination tiebreaker).
    pub event_id: EventId,

    /// The tenant that made the call.
    pub tenant_id: TenantId,

    /// Credit delta for this single call. Zero for non-metered calls.
    pub credits_used: i64,

    /// The API endpoint that was called.
    pub endpoint: String,

    /// HTTP method of the call.
    pub method: String,

    /// Upstream response status.
    pub status_code: u16,

    /// Call latency in milliseconds.
    pub latency_ms: u64,

    /// When the call happened.
    pub created_at: DateTime<Utc>,
}

impl UsageEvent {
    /// Create a new event with a fresh ULID and current timestamp.
    #[must_use]
    pub fn new(tenant_id: TenantId, credits_used: i64, endpoint: String, method: String) -> Self {
        Self {
            event_id: EventId::generate(),
            tenant_id,
            credits_used,
            endpoint,
            method,
            status_code: 200,
            latency_ms: 0,
            created_at: Utc::now(),
        }
    }
}
