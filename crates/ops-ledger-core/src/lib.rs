//! Core types and algorithms for the ops credit ledger.
//!
//! This crate provides the foundational types used throughout the credit
//! console:
//!
//! - **Identifiers**: `TenantId`, `EntryId`, `EventId`
//! - **Accounts**: `TenantAccount`, `CounterSnapshot`
//! - **Audit**: `AuditEntry`, `OperationType`, `PaymentStatus`
//! - **Usage**: `UsageEvent`
//! - **Algorithms**: the mutation rules ([`mutation`]) and the backward
//!   balance reconstruction ([`reconstruct`])
//!
//! # Credit model
//!
//! A tenant carries two raw counters: `base_credit` (the operator-adjustable
//! ceiling) and `credits_used` (cumulative consumption). The tenant-facing
//! balance is always derived:
//!
//! ```text
//! available_credits = base_credit - credits_used
//! ```
//!
//! It is recomputed on every read and never stored, so it cannot drift from
//! its two inputs. Credits are integral and carried as `i64`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod audit;
pub mod error;
pub mod ids;
pub mod mutation;
pub mod reconstruct;
pub mod tenant;
pub mod usage;

pub use audit::{AuditEntry, OperationType, PaymentStatus};
pub use error::{LedgerError, Result};
pub use ids::{EntryId, EventId, IdError, TenantId};
pub use mutation::{apply, MutationOutcome};
pub use reconstruct::{annotate_page, verify_continuity, BalanceSpan, Pagination};
pub use tenant::{CounterSnapshot, TenantAccount};
pub use usage::UsageEvent;
