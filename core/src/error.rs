//! Error types for allocation and verification operations.
//!
//! The taxonomy separates recoverable allocation conflicts (the caller
//! re-fetches availability and re-selects) from stale-view failures
//! (double clicks, outdated dashboards) and from plain input validation.
//! Collaborator failures are isolated so callers can apply the
//! fail-open/fail-closed rules that the workflow demands.

use crate::types::{RaffleId, RaffleStatus, RequestId, RequestStatus, TicketNumber};
use thiserror::Error;

/// Result type for raffle core operations.
pub type Result<T> = std::result::Result<T, RifaError>;

/// Errors that can occur in the allocation and verification core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RifaError {
    // ═══════════════════════════════════════════════════════════════════
    // Allocation Conflicts (recoverable: re-fetch availability, re-select)
    // ═══════════════════════════════════════════════════════════════════
    /// One or more requested numbers are no longer available.
    #[error("ticket numbers already taken: {}", format_numbers(taken))]
    Conflict {
        /// Every requested number that was not available
        taken: Vec<TicketNumber>,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Stale-View Errors (double submission or outdated dashboard)
    // ═══════════════════════════════════════════════════════════════════
    /// A confirm/release touched a number not held as expected.
    #[error("number {number} is in an unexpected state: {reason}")]
    InvalidState {
        /// The offending number
        number: TicketNumber,
        /// What the pool found instead
        reason: &'static str,
    },

    /// The request was already verified or rejected.
    #[error("purchase request {request_id} was already resolved to {status}")]
    AlreadyResolved {
        /// The request that was acted on twice
        request_id: RequestId,
        /// Its terminal status
        status: RequestStatus,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Lookup Errors
    // ═══════════════════════════════════════════════════════════════════
    /// No raffle with this ID is registered.
    #[error("raffle {id} not found")]
    RaffleNotFound {
        /// The unknown raffle ID
        id: RaffleId,
    },

    /// No purchase request with this ID exists.
    #[error("purchase request {id} not found")]
    RequestNotFound {
        /// The unknown request ID
        id: RequestId,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Raffle Lifecycle Errors
    // ═══════════════════════════════════════════════════════════════════
    /// The raffle is not accepting purchase submissions.
    #[error("raffle {id} is {status} and does not accept entries")]
    RaffleNotOpen {
        /// The raffle
        id: RaffleId,
        /// Its current lifecycle state
        status: RaffleStatus,
    },

    /// The raffle reached a terminal state and cannot change again.
    #[error("raffle {id} is frozen")]
    RaffleFrozen {
        /// The frozen raffle
        id: RaffleId,
    },

    /// The requested lifecycle change is not permitted.
    #[error("cannot move a raffle from {from} to {to}")]
    InvalidTransition {
        /// Current state
        from: RaffleStatus,
        /// Requested state
        to: RaffleStatus,
    },

    /// A winner was declared on a number that is not confirmed.
    #[error("winning number {number} is not a confirmed ticket")]
    WinnerNotConfirmed {
        /// The unconfirmed number
        number: TicketNumber,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Validation Errors (rejected before any ledger mutation)
    // ═══════════════════════════════════════════════════════════════════
    /// A rejection was attempted without a reason.
    #[error("a rejection requires a non-empty reason")]
    EmptyReason,

    /// A reservation was attempted with no numbers.
    #[error("no ticket numbers were selected")]
    EmptySelection,

    /// A number falls outside the raffle's pool range.
    #[error("number {number} is outside the pool range 0..{total}")]
    NumberOutOfRange {
        /// The out-of-range number
        number: TicketNumber,
        /// Pool size `T`
        total: u32,
    },

    /// The selected numbers do not match the declared ticket count.
    #[error("selected {actual} numbers for a {expected}-ticket purchase")]
    TicketCountMismatch {
        /// Declared quantity
        expected: u32,
        /// Numbers actually selected
        actual: u32,
    },

    /// The purchase claims fewer tickets than the configured minimum.
    #[error("a purchase must claim at least {minimum} numbers, got {requested}")]
    BelowMinimum {
        /// Configured floor
        minimum: u32,
        /// Declared quantity
        requested: u32,
    },

    /// Buyer identity failed validation.
    #[error("invalid buyer details: {reason}")]
    InvalidBuyer {
        /// What was wrong
        reason: String,
    },

    /// Payment metadata failed validation.
    #[error("invalid payment details: {reason}")]
    InvalidProof {
        /// What was wrong
        reason: String,
    },

    /// Raffle definition failed validation.
    #[error("invalid raffle definition: {reason}")]
    InvalidRaffle {
        /// What was wrong
        reason: String,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Collaborator Failures
    // ═══════════════════════════════════════════════════════════════════
    /// The proof store could not persist the uploaded artifact.
    ///
    /// Fails the submission closed: a reservation without proof is
    /// meaningless.
    #[error("proof storage failed: {reason}")]
    ProofStorage {
        /// Backend-reported failure
        reason: String,
    },

    /// A buyer notification could not be delivered.
    ///
    /// Callers treat this as fail-open: the ledger mutation stands.
    #[error("notification dispatch failed: {reason}")]
    Notification {
        /// Backend-reported failure
        reason: String,
    },

    /// Revenue arithmetic overflowed.
    #[error("monetary arithmetic overflowed")]
    ArithmeticOverflow,
}

impl RifaError {
    /// Whether this is an allocation conflict the buyer can recover from
    /// by re-selecting against fresh availability.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Whether the caller acted on a stale view (double submission or an
    /// outdated dashboard) rather than hitting a real fault.
    #[must_use]
    pub const fn is_stale_view(&self) -> bool {
        matches!(
            self,
            Self::InvalidState { .. } | Self::AlreadyResolved { .. }
        )
    }

    /// Whether this is an input-validation failure raised before any
    /// ledger mutation was attempted.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::EmptyReason
                | Self::EmptySelection
                | Self::NumberOutOfRange { .. }
                | Self::TicketCountMismatch { .. }
                | Self::BelowMinimum { .. }
                | Self::InvalidBuyer { .. }
                | Self::InvalidProof { .. }
                | Self::InvalidRaffle { .. }
        )
    }

    /// Whether the target of the operation does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::RaffleNotFound { .. } | Self::RequestNotFound { .. }
        )
    }
}

fn format_numbers(numbers: &[TicketNumber]) -> String {
    let rendered: Vec<String> = numbers.iter().map(ToString::to_string).collect();
    rendered.join(", ")
}
