//! Backward balance reconstruction over the usage stream.
//!
//! Per-event balances are never persisted. Given the current authoritative
//! balance and the deltas of a reverse-chronological page of events, the
//! before/after balance of every event on the page is recovered by undoing
//! the effect of everything newer:
//!
//! 1. `after` for the newest event on the page is
//!    `current + skipped_sum`, where `skipped_sum` is the sum of deltas of
//!    all events strictly newer than the page.
//! 2. walking newest to oldest, `before = after + delta`, and the next
//!    (older) event's `after` is this event's `before`.
//!
//! The whole computation is a pure function of
//! `(current_balance, skipped_sum, page_deltas)`, so it is unit-testable
//! without a datastore. A snapshot of the current balance taken at the
//! start of a request keeps a concurrently-moving counter from making the
//! page internally inconsistent; the answer is at worst momentarily stale.

use serde::Serialize;

use crate::{LedgerError, Result};

/// The reconstructed before/after balance of one usage event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BalanceSpan {
    /// Available credits immediately before the event.
    pub before_balance: i64,

    /// Available credits immediately after the event.
    pub after_balance: i64,
}

/// Annotate a reverse-chronological page of deltas with balance spans.
///
/// `deltas` must be ordered newest first, matching the listing order of the
/// usage stream. The returned spans are in the same order.
#[must_use]
pub fn annotate_page(current_balance: i64, skipped_sum: i64, deltas: &[i64]) -> Vec<BalanceSpan> {
    let mut after_balance = current_balance + skipped_sum;

    deltas
        .iter()
        .map(|delta| {
            let span = BalanceSpan {
                before_balance: after_balance + delta,
                after_balance,
            };
            // The next (older) event ended where this one began.
            after_balance = span.before_balance;
            span
        })
        .collect()
}

/// Verify the continuity invariant of a reconstructed page.
///
/// For adjacent spans (newer first), each newer span's `before_balance`
/// must equal the older span's `after_balance`, and the newest span's
/// `after_balance` must equal `current + skipped_sum`.
///
/// # Errors
///
/// Returns [`LedgerError::ReconstructionInconsistent`] on any violation.
/// A violation is a data-integrity alarm; callers must surface it, not
/// repair it.
pub fn verify_continuity(
    current_balance: i64,
    skipped_sum: i64,
    spans: &[BalanceSpan],
) -> Result<()> {
    if let Some(newest) = spans.first() {
        let expected = current_balance + skipped_sum;
        if newest.after_balance != expected {
            return Err(LedgerError::ReconstructionInconsistent {
                detail: format!(
                    "newest after_balance {} != snapshot balance {expected}",
                    newest.after_balance
                ),
            });
        }
    }

    for pair in spans.windows(2) {
        let (newer, older) = (pair[0], pair[1]);
        if newer.before_balance != older.after_balance {
            return Err(LedgerError::ReconstructionInconsistent {
                detail: format!(
                    "adjacent spans disagree: before_balance {} != after_balance {}",
                    newer.before_balance, older.after_balance
                ),
            });
        }
    }

    Ok(())
}

/// Pagination metadata for a windowed listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    /// 1-based page number.
    pub page: u64,

    /// Requested page size.
    pub page_size: u64,

    /// Total number of items across all pages.
    pub total_count: u64,

    /// Total number of pages (`ceil(total_count / page_size)`).
    pub total_pages: u64,
}

impl Pagination {
    /// Build pagination metadata for a window.
    #[must_use]
    pub const fn new(page: u64, page_size: u64, total_count: u64) -> Self {
        let total_pages = if page_size == 0 {
            0
        } else {
            total_count.div_ceil(page_size)
        };
        Self {
            page,
            page_size,
            total_count,
            total_pages,
        }
    }

    /// Number of items on pages strictly newer than this one.
    #[must_use]
    pub const fn skipped(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }
}
