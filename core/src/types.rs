//! Core domain types for the raffle allocation and verification workflow.
//!
//! Identifiers are newtype wrappers around UUIDs so that a raffle id can
//! never be passed where a purchase-request id is expected. Monetary
//! amounts are integer cents to avoid floating-point drift in revenue
//! arithmetic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Ticket price used by the back-office form when none is given: $8.00.
pub const DEFAULT_TICKET_PRICE: Money = Money::from_cents(800);

/// Pool size used by the back-office form when none is given.
pub const DEFAULT_TOTAL_NUMBERS: u32 = 100;

/// Largest pool size the ledger will allocate for one raffle.
pub const MAX_TOTAL_NUMBERS: u32 = 10_000;

// ============================================================================
// Identifier Types
// ============================================================================

/// Unique identifier for a raffle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RaffleId(Uuid);

impl RaffleId {
    /// Create a new random raffle ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RaffleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RaffleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a purchase request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Create a new random request ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Ticket Numbers
// ============================================================================

/// A single ticket number within a raffle's pool (0 ..= T-1).
///
/// Ordered so that number sets render deterministically in queues,
/// notifications, and snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TicketNumber(u32);

impl TicketNumber {
    /// Wrap a raw number.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Get the raw number.
    #[must_use]
    pub const fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for TicketNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for TicketNumber {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

// ============================================================================
// Money
// ============================================================================

/// Money amount in cents (to avoid floating point issues).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money(u64);

impl Money {
    /// Create from cents.
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Create from whole dollars.
    ///
    /// # Panics
    ///
    /// Panics if the conversion would overflow (dollars * 100 > `u64::MAX`).
    /// Use [`Self::checked_from_dollars`] for non-panicking conversion.
    #[must_use]
    #[allow(clippy::panic)]
    pub const fn from_dollars(dollars: u64) -> Self {
        match dollars.checked_mul(100) {
            Some(cents) => Self(cents),
            None => panic!("Money::from_dollars overflow"),
        }
    }

    /// Create from whole dollars, returning `None` on overflow.
    #[must_use]
    pub const fn checked_from_dollars(dollars: u64) -> Option<Self> {
        match dollars.checked_mul(100) {
            Some(cents) => Some(Self(cents)),
            None => None,
        }
    }

    /// Get the amount in cents.
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Whether this is a zero amount.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Add two amounts, returning `None` on overflow.
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Self(cents)),
            None => None,
        }
    }

    /// Multiply by a count, returning `None` on overflow.
    #[must_use]
    pub const fn checked_multiply(self, count: u64) -> Option<Self> {
        match self.0.checked_mul(count) {
            Some(cents) => Some(Self(cents)),
            None => None,
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.0 / 100, self.0 % 100)
    }
}

// ============================================================================
// Raffle Lifecycle
// ============================================================================

/// Lifecycle state of a raffle.
///
/// Only `Active` raffles accept new purchase submissions. `Completed` and
/// `Closed` are terminal; both freeze the raffle's number pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RaffleStatus {
    /// Created but not yet published to the storefront.
    Draft,
    /// Open for purchases.
    Active,
    /// Temporarily hidden from the storefront; no new purchases.
    Inactive,
    /// A winner was declared. Terminal.
    Completed,
    /// Shut down without a winner. Terminal.
    Closed,
}

impl RaffleStatus {
    /// Whether buyers may submit new purchase requests.
    #[must_use]
    pub const fn accepts_entries(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Whether the raffle (and its pool) is permanently frozen.
    #[must_use]
    pub const fn is_frozen(&self) -> bool {
        matches!(self, Self::Completed | Self::Closed)
    }
}

impl fmt::Display for RaffleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Completed => "completed",
            Self::Closed => "closed",
        };
        write!(f, "{label}")
    }
}

/// A raffle: a time-boxed draw over a fixed pool of numbered tickets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Raffle {
    /// Unique raffle ID
    pub id: RaffleId,
    /// Display title
    pub title: String,
    /// Prize / marketing description
    pub description: String,
    /// Price per ticket number
    pub price: Money,
    /// Pool size `T`; numbers run 0 ..= T-1. Immutable after creation.
    pub total_numbers: u32,
    /// When the draw takes place
    pub draw_date: DateTime<Utc>,
    /// Current lifecycle state
    pub status: RaffleStatus,
    /// Winning number, set once by the winner declaration
    pub winning_number: Option<TicketNumber>,
    /// When the raffle was created
    pub created_at: DateTime<Utc>,
}

impl Raffle {
    /// Create a raffle in `Draft` state from validated inputs.
    #[must_use]
    pub fn new(spec: NewRaffle, now: DateTime<Utc>) -> Self {
        Self {
            id: RaffleId::new(),
            title: spec.title,
            description: spec.description,
            price: spec.price,
            total_numbers: spec.total_numbers,
            draw_date: spec.draw_date,
            status: RaffleStatus::Draft,
            winning_number: None,
            created_at: now,
        }
    }

    /// Whether `number` falls inside this raffle's pool range.
    #[must_use]
    pub const fn contains_number(&self, number: TicketNumber) -> bool {
        number.value() < self.total_numbers
    }
}

/// Inputs for opening a new raffle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRaffle {
    /// Display title
    pub title: String,
    /// Prize / marketing description
    pub description: String,
    /// Price per ticket number
    pub price: Money,
    /// Pool size `T`
    pub total_numbers: u32,
    /// When the draw takes place
    pub draw_date: DateTime<Utc>,
}

/// Partial update to a raffle's presentation fields.
///
/// The pool size is deliberately absent: resizing a pool with taken
/// numbers has no sound semantics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RaffleUpdate {
    /// New title, if changing
    pub title: Option<String>,
    /// New description, if changing
    pub description: Option<String>,
    /// New ticket price, if changing
    pub price: Option<Money>,
    /// New draw date, if changing
    pub draw_date: Option<DateTime<Utc>>,
}

impl RaffleUpdate {
    /// Whether the update changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.draw_date.is_none()
    }
}

// ============================================================================
// Buyer & Payment
// ============================================================================

/// Identity of the buyer behind a purchase request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyerInfo {
    /// Full legal name
    pub full_name: String,
    /// Contact email; notifications go here
    pub email: String,
    /// Contact phone
    pub phone: String,
}

/// How the buyer claims to have paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    /// Direct bank transfer
    BankTransfer,
    /// Phone-number-keyed instant payment
    MobilePayment,
    /// Zelle transfer
    Zelle,
    /// Cash handed over in person
    Cash,
    /// Anything else, spelled out
    Other(String),
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BankTransfer => write!(f, "bank transfer"),
            Self::MobilePayment => write!(f, "mobile payment"),
            Self::Zelle => write!(f, "zelle"),
            Self::Cash => write!(f, "cash"),
            Self::Other(label) => write!(f, "{label}"),
        }
    }
}

/// Opaque reference to a stored proof-of-payment artifact.
///
/// The core never holds the artifact bytes; it stores only the reference
/// returned by the proof store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactRef(String);

impl ArtifactRef {
    /// Wrap a raw storage reference.
    #[must_use]
    pub const fn new(reference: String) -> Self {
        Self(reference)
    }

    /// Get the raw reference.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Payment-proof metadata attached to a purchase request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentProof {
    /// Payment channel the buyer used
    pub method: PaymentMethod,
    /// Bank reference code (six digits)
    pub reference: String,
    /// Stored proof-of-payment artifact
    pub artifact: ArtifactRef,
}

/// An uploaded proof-of-payment artifact, before storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofUpload {
    /// Original file name, for the reviewer's benefit
    pub file_name: String,
    /// MIME type as reported by the uploader
    pub content_type: String,
    /// Raw artifact bytes
    pub bytes: Vec<u8>,
}

// ============================================================================
// Request Status
// ============================================================================

/// Review status of a purchase request.
///
/// `Verified` and `Rejected` are terminal; no transition leaves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    /// Awaiting reviewer adjudication; claimed numbers are reserved.
    Pending,
    /// Payment accepted; claimed numbers are confirmed forever.
    Verified,
    /// Payment refused; claimed numbers were released.
    Rejected,
}

impl RequestStatus {
    /// Whether the request has been resolved.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Verified | Self::Rejected)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Verified => "verified",
            Self::Rejected => "rejected",
        };
        write!(f, "{label}")
    }
}
