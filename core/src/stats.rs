//! Back-office statistics: per-raffle progress and the dashboard
//! overview.
//!
//! Everything here is a derived, read-only view over the ledger and the
//! request table; nothing in this module mutates state.

use crate::error::{Result, RifaError};
use crate::pool::PoolCounts;
use crate::types::{Money, RaffleId, RaffleStatus, RequestStatus};
use crate::workflow::ReviewWorkflow;
use serde::{Deserialize, Serialize};

/// Per-status request totals for one raffle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestCounts {
    /// Claims awaiting review
    pub pending: u32,
    /// Claims accepted
    pub verified: u32,
    /// Claims refused
    pub rejected: u32,
}

/// Progress and money for one raffle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaffleStats {
    /// The raffle
    pub raffle_id: RaffleId,
    /// Title at report time
    pub title: String,
    /// Lifecycle state at report time
    pub status: RaffleStatus,
    /// Number partition totals
    pub numbers: PoolCounts,
    /// Request totals
    pub requests: RequestCounts,
    /// Confirmed numbers as a percentage of the pool, rounded down
    pub progress_percent: u8,
    /// Confirmed numbers times ticket price
    pub revenue: Money,
}

/// The whole back-office dashboard in one fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overview {
    /// Raffles ever opened
    pub total_raffles: u32,
    /// Raffles currently accepting purchases
    pub active_raffles: u32,
    /// Raffles completed with a winner
    pub completed_raffles: u32,
    /// Review backlog across all raffles
    pub pending_reviews: u32,
    /// Numbers sold across all raffles
    pub confirmed_numbers: u32,
    /// Revenue across all raffles
    pub total_revenue: Money,
    /// Per-raffle breakdown, ordered by draw date
    pub raffles: Vec<RaffleStats>,
}

/// Compute one raffle's statistics.
///
/// # Errors
///
/// - [`RifaError::RaffleNotFound`] when the ID is unknown.
/// - [`RifaError::ArithmeticOverflow`] when revenue exceeds [`u64`] cents.
pub async fn raffle_stats(workflow: &ReviewWorkflow, raffle_id: RaffleId) -> Result<RaffleStats> {
    let ledger = workflow.ledger();
    let raffle = ledger.raffle(raffle_id).await?;
    let numbers = ledger.pool_counts(raffle_id).await?;

    let requests = RequestCounts {
        pending: workflow.list_by_status(raffle_id, RequestStatus::Pending).await.len() as u32,
        verified: workflow.list_by_status(raffle_id, RequestStatus::Verified).await.len() as u32,
        rejected: workflow.list_by_status(raffle_id, RequestStatus::Rejected).await.len() as u32,
    };

    let revenue = raffle
        .price
        .checked_multiply(u64::from(numbers.confirmed))
        .ok_or(RifaError::ArithmeticOverflow)?;
    let progress_percent = if numbers.total == 0 {
        0
    } else {
        (u64::from(numbers.confirmed) * 100 / u64::from(numbers.total)) as u8
    };

    Ok(RaffleStats {
        raffle_id,
        title: raffle.title,
        status: raffle.status,
        numbers,
        requests,
        progress_percent,
        revenue,
    })
}

/// Compute the dashboard overview across every raffle.
///
/// # Errors
///
/// [`RifaError::ArithmeticOverflow`] when aggregate revenue exceeds
/// [`u64`] cents.
pub async fn overview(workflow: &ReviewWorkflow) -> Result<Overview> {
    let ledger = workflow.ledger();
    let raffles = ledger.list_raffles().await;

    let mut report = Overview {
        total_raffles: raffles.len() as u32,
        active_raffles: 0,
        completed_raffles: 0,
        pending_reviews: 0,
        confirmed_numbers: 0,
        total_revenue: Money::from_cents(0),
        raffles: Vec::with_capacity(raffles.len()),
    };

    for raffle in raffles {
        let stats = raffle_stats(workflow, raffle.id).await?;
        if stats.status.accepts_entries() {
            report.active_raffles += 1;
        }
        if matches!(stats.status, RaffleStatus::Completed) {
            report.completed_raffles += 1;
        }
        report.pending_reviews += stats.requests.pending;
        report.confirmed_numbers += stats.numbers.confirmed;
        report.total_revenue = report
            .total_revenue
            .checked_add(stats.revenue)
            .ok_or(RifaError::ArithmeticOverflow)?;
        report.raffles.push(stats);
    }
    Ok(report)
}
