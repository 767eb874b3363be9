//! Per-raffle ticket-number pool.
//!
//! A pool is an arena of slot states indexed by ticket number: every
//! number in `0 ..= T-1` is `Available`, `Reserved` by exactly one
//! purchase request, or `Confirmed` for exactly one purchase request.
//! The arena representation makes the two structural invariants hard to
//! break: a number always has exactly one status, and a non-available
//! number always has exactly one holder.
//!
//! The pool itself is synchronous and single-owner; all locking lives in
//! the [`ReservationLedger`](crate::ledger::ReservationLedger), which
//! serializes mutations per raffle.

use crate::error::{Result, RifaError};
use crate::types::{RequestId, TicketNumber};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ============================================================================
// Pool View Types
// ============================================================================

/// Status of a single ticket number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NumberStatus {
    /// Free for any buyer to claim.
    Available,
    /// Soft hold pending review; released if the request is rejected.
    Reserved,
    /// Permanently bound to a verified purchase.
    Confirmed,
}

/// Whether a hold on a number is soft or permanent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HoldKind {
    /// Pending review; can still be released.
    Reservation,
    /// Verified; terminal.
    Confirmation,
}

/// The purchase request currently holding a non-available number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberHold {
    /// The holding request
    pub request_id: RequestId,
    /// Soft reservation or hard confirmation
    pub kind: HoldKind,
}

/// Per-status totals for a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolCounts {
    /// Pool size `T`
    pub total: u32,
    /// Numbers free to claim
    pub available: u32,
    /// Numbers held pending review
    pub reserved: u32,
    /// Numbers permanently sold
    pub confirmed: u32,
}

/// A full, point-in-time partition of a pool's numbers by status.
///
/// Snapshots are what observers poll: each one supersedes the previous
/// wholesale. `version` increases on every successful pool mutation, so
/// two snapshots taken with no intervening writes are identical,
/// including the version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    /// Pool size `T`
    pub total: u32,
    /// Mutation counter at capture time
    pub version: u64,
    /// Numbers free to claim
    pub available: BTreeSet<TicketNumber>,
    /// Numbers held pending review
    pub reserved: BTreeSet<TicketNumber>,
    /// Numbers permanently sold
    pub confirmed: BTreeSet<TicketNumber>,
}

impl PoolSnapshot {
    /// Status of one number within this snapshot.
    #[must_use]
    pub fn status_of(&self, number: TicketNumber) -> Option<NumberStatus> {
        if self.available.contains(&number) {
            Some(NumberStatus::Available)
        } else if self.reserved.contains(&number) {
            Some(NumberStatus::Reserved)
        } else if self.confirmed.contains(&number) {
            Some(NumberStatus::Confirmed)
        } else {
            None
        }
    }

    /// Whether the three sets form a true partition of `0 ..= T-1`:
    /// every number present exactly once, none out of range.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let mut union = BTreeSet::new();
        union.extend(self.available.iter().copied());
        union.extend(self.reserved.iter().copied());
        union.extend(self.confirmed.iter().copied());

        let sizes_add_up = self.available.len() + self.reserved.len() + self.confirmed.len()
            == self.total as usize;
        let covers_range = union.len() == self.total as usize
            && union.iter().all(|n| n.value() < self.total);

        sizes_add_up && covers_range
    }

    /// Per-status totals.
    #[must_use]
    pub fn counts(&self) -> PoolCounts {
        PoolCounts {
            total: self.total,
            available: self.available.len() as u32,
            reserved: self.reserved.len() as u32,
            confirmed: self.confirmed.len() as u32,
        }
    }
}

// ============================================================================
// Number Pool
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Available,
    Reserved(RequestId),
    Confirmed(RequestId),
}

/// Arena of ticket-number slots for one raffle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberPool {
    slots: Vec<Slot>,
    version: u64,
}

impl NumberPool {
    /// Create a pool with every number in `0 ..= total-1` available.
    #[must_use]
    pub fn new(total: u32) -> Self {
        Self {
            slots: vec![Slot::Available; total as usize],
            version: 0,
        }
    }

    /// Pool size `T`.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.slots.len() as u32
    }

    /// Mutation counter; bumped once per successful reserve/confirm/release.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Capture the full partition of numbers by status. Side-effect-free.
    #[must_use]
    pub fn snapshot(&self) -> PoolSnapshot {
        let mut available = BTreeSet::new();
        let mut reserved = BTreeSet::new();
        let mut confirmed = BTreeSet::new();

        for (index, slot) in self.slots.iter().enumerate() {
            let number = TicketNumber::new(index as u32);
            match slot {
                Slot::Available => available.insert(number),
                Slot::Reserved(_) => reserved.insert(number),
                Slot::Confirmed(_) => confirmed.insert(number),
            };
        }

        PoolSnapshot {
            total: self.total(),
            version: self.version,
            available,
            reserved,
            confirmed,
        }
    }

    /// The hold on `number`, or `None` when it is available.
    ///
    /// # Errors
    ///
    /// Returns [`RifaError::NumberOutOfRange`] when `number >= T`.
    pub fn hold(&self, number: TicketNumber) -> Result<Option<NumberHold>> {
        match self.slot(number)? {
            Slot::Available => Ok(None),
            Slot::Reserved(request_id) => Ok(Some(NumberHold {
                request_id,
                kind: HoldKind::Reservation,
            })),
            Slot::Confirmed(request_id) => Ok(Some(NumberHold {
                request_id,
                kind: HoldKind::Confirmation,
            })),
        }
    }

    /// Per-status totals without materializing the full sets.
    #[must_use]
    pub fn counts(&self) -> PoolCounts {
        let mut counts = PoolCounts {
            total: self.total(),
            available: 0,
            reserved: 0,
            confirmed: 0,
        };
        for slot in &self.slots {
            match slot {
                Slot::Available => counts.available += 1,
                Slot::Reserved(_) => counts.reserved += 1,
                Slot::Confirmed(_) => counts.confirmed += 1,
            }
        }
        counts
    }

    /// Atomically reserve `numbers` for `request_id`.
    ///
    /// All-or-nothing: if ANY requested number is not currently
    /// available, nothing is reserved and the error lists every taken
    /// number, so the buyer can be shown exactly what changed under
    /// them. A partial reservation would silently bind the buyer to
    /// different numbers than they selected, which is never acceptable.
    ///
    /// # Errors
    ///
    /// - [`RifaError::EmptySelection`] when `numbers` is empty.
    /// - [`RifaError::NumberOutOfRange`] when any number is `>= T`.
    /// - [`RifaError::Conflict`] when any number is reserved or confirmed.
    pub fn reserve(&mut self, numbers: &BTreeSet<TicketNumber>, request_id: RequestId) -> Result<()> {
        self.check_selection(numbers)?;

        let taken: Vec<TicketNumber> = numbers
            .iter()
            .copied()
            .filter(|number| !matches!(self.slots[number.value() as usize], Slot::Available))
            .collect();
        if !taken.is_empty() {
            return Err(RifaError::Conflict { taken });
        }

        for number in numbers {
            self.slots[number.value() as usize] = Slot::Reserved(request_id);
        }
        self.version += 1;
        Ok(())
    }

    /// Move `numbers` from reserved to confirmed. Terminal.
    ///
    /// # Errors
    ///
    /// - [`RifaError::EmptySelection`] / [`RifaError::NumberOutOfRange`]
    ///   as for [`Self::reserve`].
    /// - [`RifaError::InvalidState`] unless every number is reserved
    ///   under exactly `request_id`.
    pub fn confirm(&mut self, numbers: &BTreeSet<TicketNumber>, request_id: RequestId) -> Result<()> {
        self.check_selection(numbers)?;
        self.check_held_by(numbers, request_id)?;

        for number in numbers {
            self.slots[number.value() as usize] = Slot::Confirmed(request_id);
        }
        self.version += 1;
        Ok(())
    }

    /// Return `numbers` from reserved to available.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Self::confirm`]; in particular, confirmed
    /// numbers can never be released.
    pub fn release(&mut self, numbers: &BTreeSet<TicketNumber>, request_id: RequestId) -> Result<()> {
        self.check_selection(numbers)?;
        self.check_held_by(numbers, request_id)?;

        for number in numbers {
            self.slots[number.value() as usize] = Slot::Available;
        }
        self.version += 1;
        Ok(())
    }

    fn check_selection(&self, numbers: &BTreeSet<TicketNumber>) -> Result<()> {
        if numbers.is_empty() {
            return Err(RifaError::EmptySelection);
        }
        for number in numbers {
            self.slot(*number)?;
        }
        Ok(())
    }

    fn check_held_by(&self, numbers: &BTreeSet<TicketNumber>, request_id: RequestId) -> Result<()> {
        for number in numbers {
            let reason = match self.slots[number.value() as usize] {
                Slot::Reserved(holder) if holder == request_id => continue,
                Slot::Reserved(_) => "reserved by another request",
                Slot::Confirmed(holder) if holder == request_id => "already confirmed",
                Slot::Confirmed(_) => "confirmed for another request",
                Slot::Available => "not reserved",
            };
            return Err(RifaError::InvalidState {
                number: *number,
                reason,
            });
        }
        Ok(())
    }

    fn slot(&self, number: TicketNumber) -> Result<Slot> {
        self.slots
            .get(number.value() as usize)
            .copied()
            .ok_or(RifaError::NumberOutOfRange {
                number,
                total: self.total(),
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn numbers(values: &[u32]) -> BTreeSet<TicketNumber> {
        values.iter().copied().map(TicketNumber::new).collect()
    }

    #[test]
    fn fresh_pool_is_fully_available() {
        let pool = NumberPool::new(10);
        let snapshot = pool.snapshot();
        assert_eq!(snapshot.available.len(), 10);
        assert!(snapshot.reserved.is_empty());
        assert!(snapshot.confirmed.is_empty());
        assert!(snapshot.is_consistent());
        assert_eq!(snapshot.version, 0);
    }

    #[test]
    fn reserve_is_all_or_nothing() {
        let mut pool = NumberPool::new(10);
        let other = RequestId::new();
        pool.reserve(&numbers(&[6]), other).unwrap();

        let request = RequestId::new();
        let err = pool.reserve(&numbers(&[3, 4, 6]), request).unwrap_err();
        assert_eq!(
            err,
            RifaError::Conflict {
                taken: vec![TicketNumber::new(6)]
            }
        );

        // Nothing was partially reserved.
        let snapshot = pool.snapshot();
        assert_eq!(snapshot.status_of(TicketNumber::new(3)), Some(NumberStatus::Available));
        assert_eq!(snapshot.status_of(TicketNumber::new(4)), Some(NumberStatus::Available));
        assert_eq!(snapshot.status_of(TicketNumber::new(6)), Some(NumberStatus::Reserved));
    }

    #[test]
    fn conflict_reports_every_taken_number() {
        let mut pool = NumberPool::new(10);
        let first = RequestId::new();
        pool.reserve(&numbers(&[1, 2]), first).unwrap();

        let err = pool.reserve(&numbers(&[1, 2, 3]), RequestId::new()).unwrap_err();
        assert_eq!(
            err,
            RifaError::Conflict {
                taken: vec![TicketNumber::new(1), TicketNumber::new(2)]
            }
        );
    }

    #[test]
    fn empty_selection_is_rejected() {
        let mut pool = NumberPool::new(10);
        let err = pool.reserve(&BTreeSet::new(), RequestId::new()).unwrap_err();
        assert_eq!(err, RifaError::EmptySelection);
    }

    #[test]
    fn out_of_range_numbers_are_rejected_before_any_mutation() {
        let mut pool = NumberPool::new(10);
        let err = pool.reserve(&numbers(&[5, 10]), RequestId::new()).unwrap_err();
        assert_eq!(
            err,
            RifaError::NumberOutOfRange {
                number: TicketNumber::new(10),
                total: 10
            }
        );
        assert_eq!(pool.snapshot().available.len(), 10);
        assert_eq!(pool.version(), 0);
    }

    #[test]
    fn confirm_requires_reservation_by_the_same_request() {
        let mut pool = NumberPool::new(10);
        let owner = RequestId::new();
        pool.reserve(&numbers(&[2, 3]), owner).unwrap();

        let stranger = RequestId::new();
        let err = pool.confirm(&numbers(&[2, 3]), stranger).unwrap_err();
        assert_eq!(
            err,
            RifaError::InvalidState {
                number: TicketNumber::new(2),
                reason: "reserved by another request"
            }
        );

        pool.confirm(&numbers(&[2, 3]), owner).unwrap();
        let snapshot = pool.snapshot();
        assert_eq!(snapshot.status_of(TicketNumber::new(2)), Some(NumberStatus::Confirmed));
        assert_eq!(snapshot.status_of(TicketNumber::new(3)), Some(NumberStatus::Confirmed));
    }

    #[test]
    fn confirmed_numbers_can_never_be_released() {
        let mut pool = NumberPool::new(10);
        let owner = RequestId::new();
        pool.reserve(&numbers(&[7, 8]), owner).unwrap();
        pool.confirm(&numbers(&[7, 8]), owner).unwrap();

        let err = pool.release(&numbers(&[7, 8]), owner).unwrap_err();
        assert_eq!(
            err,
            RifaError::InvalidState {
                number: TicketNumber::new(7),
                reason: "already confirmed"
            }
        );
    }

    #[test]
    fn release_returns_exactly_the_held_numbers() {
        let mut pool = NumberPool::new(10);
        let rejected = RequestId::new();
        let bystander = RequestId::new();
        pool.reserve(&numbers(&[7, 8]), rejected).unwrap();
        pool.reserve(&numbers(&[1]), bystander).unwrap();

        pool.release(&numbers(&[7, 8]), rejected).unwrap();

        let snapshot = pool.snapshot();
        assert_eq!(snapshot.status_of(TicketNumber::new(7)), Some(NumberStatus::Available));
        assert_eq!(snapshot.status_of(TicketNumber::new(8)), Some(NumberStatus::Available));
        // The bystander's reservation is untouched.
        assert_eq!(snapshot.status_of(TicketNumber::new(1)), Some(NumberStatus::Reserved));
    }

    #[test]
    fn confirm_on_available_numbers_is_invalid() {
        let mut pool = NumberPool::new(10);
        let err = pool.confirm(&numbers(&[0]), RequestId::new()).unwrap_err();
        assert_eq!(
            err,
            RifaError::InvalidState {
                number: TicketNumber::new(0),
                reason: "not reserved"
            }
        );
    }

    #[test]
    fn snapshot_is_idempotent_without_writes() {
        let mut pool = NumberPool::new(10);
        pool.reserve(&numbers(&[4]), RequestId::new()).unwrap();

        let first = pool.snapshot();
        let second = pool.snapshot();
        assert_eq!(first, second);
        assert_eq!(first.version, second.version);
    }

    #[test]
    fn version_bumps_only_on_successful_mutation() {
        let mut pool = NumberPool::new(10);
        assert_eq!(pool.version(), 0);

        pool.reserve(&numbers(&[4]), RequestId::new()).unwrap();
        assert_eq!(pool.version(), 1);

        // Failed operations leave the version untouched.
        let _ = pool.reserve(&numbers(&[4]), RequestId::new()).unwrap_err();
        assert_eq!(pool.version(), 1);
    }

    #[test]
    fn hold_reports_holder_and_kind() {
        let mut pool = NumberPool::new(10);
        let owner = RequestId::new();
        pool.reserve(&numbers(&[5]), owner).unwrap();

        assert_eq!(
            pool.hold(TicketNumber::new(5)).unwrap(),
            Some(NumberHold {
                request_id: owner,
                kind: HoldKind::Reservation
            })
        );
        assert_eq!(pool.hold(TicketNumber::new(6)).unwrap(), None);

        pool.confirm(&numbers(&[5]), owner).unwrap();
        assert_eq!(
            pool.hold(TicketNumber::new(5)).unwrap(),
            Some(NumberHold {
                request_id: owner,
                kind: HoldKind::Confirmation
            })
        );

        let err = pool.hold(TicketNumber::new(10)).unwrap_err();
        assert!(matches!(err, RifaError::NumberOutOfRange { .. }));
    }

    #[test]
    fn counts_track_the_partition() {
        let mut pool = NumberPool::new(10);
        let a = RequestId::new();
        let b = RequestId::new();
        pool.reserve(&numbers(&[0, 1, 2]), a).unwrap();
        pool.reserve(&numbers(&[3, 4]), b).unwrap();
        pool.confirm(&numbers(&[0, 1, 2]), a).unwrap();

        let counts = pool.counts();
        assert_eq!(counts.total, 10);
        assert_eq!(counts.available, 5);
        assert_eq!(counts.reserved, 2);
        assert_eq!(counts.confirmed, 3);
    }

    proptest! {
        /// Random interleavings of reserve/confirm/release, valid or not,
        /// never break the partition: every number keeps exactly one
        /// status, non-available numbers keep exactly one holder, and the
        /// sets agree with the per-number holds.
        #[test]
        fn partition_survives_random_interleavings(
            ops in proptest::collection::vec(
                (
                    0u8..3,
                    proptest::collection::btree_set(0u32..20, 1..6),
                    0usize..4,
                ),
                1..40,
            )
        ) {
            let mut pool = NumberPool::new(20);
            let requests: Vec<RequestId> = (0..4).map(|_| RequestId::new()).collect();

            for (kind, raw_numbers, holder) in ops {
                let selection: BTreeSet<TicketNumber> =
                    raw_numbers.into_iter().map(TicketNumber::new).collect();
                let request_id = requests[holder];
                let _ = match kind {
                    0 => pool.reserve(&selection, request_id),
                    1 => pool.confirm(&selection, request_id),
                    _ => pool.release(&selection, request_id),
                };

                let snapshot = pool.snapshot();
                prop_assert!(snapshot.is_consistent());

                for value in 0..20 {
                    let number = TicketNumber::new(value);
                    let hold = pool.hold(number).unwrap();
                    match snapshot.status_of(number).unwrap() {
                        NumberStatus::Available => prop_assert!(hold.is_none()),
                        NumberStatus::Reserved => {
                            prop_assert_eq!(hold.map(|h| h.kind), Some(HoldKind::Reservation));
                        }
                        NumberStatus::Confirmed => {
                            prop_assert_eq!(hold.map(|h| h.kind), Some(HoldKind::Confirmation));
                        }
                    }
                }
            }
        }
    }
}
