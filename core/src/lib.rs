//! Ticket-number allocation and purchase-verification core for raffle
//! storefronts.
//!
//! A raffle exposes a finite pool of numbered tickets. Many buyers race
//! to claim overlapping numbers, a human reviewer must adjudicate every
//! claim before its numbers bind permanently, and every open page
//! (buyer grids, reviewer dashboards) has to converge on a consistent
//! view of the pool without a live push channel.
//!
//! # Architecture
//!
//! ```text
//!   buyers / reviewers / admins
//!              │ submit · verify · reject · declare_winner
//!     ┌────────▼────────┐
//!     │  ReviewWorkflow  │──→ Notifier (fail-open)
//!     │  request table   │──→ ProofStore (fail-closed)
//!     └────────┬────────┘
//!              │ reserve · confirm · release
//!     ┌────────▼────────┐
//!     │ ReservationLedger│  one NumberPool per raffle,
//!     │                  │  serialized per raffle
//!     └────────┬────────┘
//!              │ snapshot · list_by_status
//!     ┌────────▼────────┐
//!     │   StateSyncFeed  │──→ polling observers (watch channels)
//!     └─────────────────┘
//! ```
//!
//! A ticket number is `available`, `reserved` (soft hold pending
//! review), or `confirmed` (terminal). Reserving is all-or-nothing;
//! verification confirms, rejection releases. Completing or closing a
//! raffle freezes its pool. Observers poll snapshots on a fixed cadence
//! and replace their view wholesale each time.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod feed;
pub mod ledger;
#[cfg(feature = "test-utils")]
pub mod mocks;
pub mod pool;
pub mod providers;
pub mod request;
pub mod stats;
pub mod types;
pub mod workflow;

// Re-export the types most callers need.
pub use config::CoreConfig;
pub use error::{Result, RifaError};
pub use feed::{FeedCadence, PoolFeed, QueueFeed, StateSyncFeed};
pub use ledger::ReservationLedger;
pub use pool::{NumberHold, NumberPool, NumberStatus, PoolCounts, PoolSnapshot};
pub use request::PurchaseRequest;
pub use stats::{Overview, RaffleStats, RequestCounts};
pub use types::{
    ArtifactRef, BuyerInfo, DEFAULT_TICKET_PRICE, DEFAULT_TOTAL_NUMBERS, MAX_TOTAL_NUMBERS, Money,
    NewRaffle, PaymentMethod, PaymentProof, ProofUpload, Raffle, RaffleId, RaffleStatus,
    RaffleUpdate, RequestId, RequestStatus, TicketNumber,
};
pub use workflow::{NewPurchase, ReviewWorkflow, TicketLookup, WorkflowEnvironment};
