//! The reservation ledger: authoritative owner of raffles and their
//! number pools.
//!
//! Every raffle lives behind its own lock, so `reserve`/`confirm`/
//! `release` are serialized per raffle (check-then-act is atomic) while
//! operations on different raffles proceed in parallel and reads run
//! concurrently with each other. All number mutation in the system goes
//! through this type; nothing else touches a [`NumberPool`] directly.

use crate::error::{Result, RifaError};
use crate::pool::{HoldKind, NumberPool, PoolCounts, PoolSnapshot};
use crate::types::{
    MAX_TOTAL_NUMBERS, NewRaffle, Raffle, RaffleId, RaffleStatus, RaffleUpdate, RequestId,
    TicketNumber,
};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Debug)]
struct RaffleEntry {
    raffle: Raffle,
    pool: NumberPool,
}

/// Authoritative, transactionally-guarded map from ticket numbers to
/// their holders, one pool per raffle.
#[derive(Debug, Default)]
pub struct ReservationLedger {
    raffles: RwLock<HashMap<RaffleId, Arc<RwLock<RaffleEntry>>>>,
}

impl ReservationLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Raffle Lifecycle
    // ========================================================================

    /// Register a new raffle (in `Draft`) together with its number pool.
    ///
    /// # Errors
    ///
    /// [`RifaError::InvalidRaffle`] when the title is blank, the pool is
    /// empty, or the ticket price is zero.
    pub async fn open_raffle(&self, spec: NewRaffle, now: DateTime<Utc>) -> Result<Raffle> {
        validate_new_raffle(&spec)?;

        let raffle = Raffle::new(spec, now);
        let entry = RaffleEntry {
            raffle: raffle.clone(),
            pool: NumberPool::new(raffle.total_numbers),
        };
        self.raffles
            .write()
            .await
            .insert(raffle.id, Arc::new(RwLock::new(entry)));

        metrics::counter!("ledger.raffles_opened").increment(1);
        info!(
            raffle_id = %raffle.id,
            title = %raffle.title,
            total_numbers = raffle.total_numbers,
            "raffle opened"
        );
        Ok(raffle)
    }

    /// Fetch one raffle by ID.
    ///
    /// # Errors
    ///
    /// [`RifaError::RaffleNotFound`] when the ID is unknown.
    pub async fn raffle(&self, raffle_id: RaffleId) -> Result<Raffle> {
        let entry = self.entry(raffle_id).await?;
        let guard = entry.read().await;
        Ok(guard.raffle.clone())
    }

    /// All raffles, ordered by draw date.
    pub async fn list_raffles(&self) -> Vec<Raffle> {
        let handles: Vec<Arc<RwLock<RaffleEntry>>> =
            self.raffles.read().await.values().cloned().collect();

        let mut raffles = Vec::with_capacity(handles.len());
        for handle in handles {
            raffles.push(handle.read().await.raffle.clone());
        }
        raffles.sort_by(|a, b| a.draw_date.cmp(&b.draw_date).then(a.title.cmp(&b.title)));
        raffles
    }

    /// Raffles currently open for purchases, ordered by draw date. This
    /// is the storefront catalog view.
    pub async fn active_raffles(&self) -> Vec<Raffle> {
        let mut raffles = self.list_raffles().await;
        raffles.retain(|raffle| raffle.status.accepts_entries());
        raffles
    }

    /// Move a raffle between `Draft`, `Active`, `Inactive`, and `Closed`.
    ///
    /// `Completed` is reachable only through [`Self::record_winner`], and
    /// a raffle cannot return to `Draft` once created.
    ///
    /// # Errors
    ///
    /// - [`RifaError::RaffleNotFound`] when the ID is unknown.
    /// - [`RifaError::RaffleFrozen`] when the raffle is already terminal.
    /// - [`RifaError::InvalidTransition`] for `Draft`/`Completed` targets.
    pub async fn set_raffle_status(
        &self,
        raffle_id: RaffleId,
        status: RaffleStatus,
    ) -> Result<Raffle> {
        let entry = self.entry(raffle_id).await?;
        let mut guard = entry.write().await;

        if guard.raffle.status.is_frozen() {
            return Err(RifaError::RaffleFrozen { id: raffle_id });
        }
        if matches!(status, RaffleStatus::Draft | RaffleStatus::Completed) {
            return Err(RifaError::InvalidTransition {
                from: guard.raffle.status,
                to: status,
            });
        }

        let from = guard.raffle.status;
        guard.raffle.status = status;
        info!(raffle_id = %raffle_id, %from, to = %status, "raffle status changed");
        Ok(guard.raffle.clone())
    }

    /// Edit a raffle's presentation fields. The pool size is fixed for
    /// the raffle's lifetime.
    ///
    /// # Errors
    ///
    /// - [`RifaError::RaffleNotFound`] when the ID is unknown.
    /// - [`RifaError::RaffleFrozen`] when the raffle is terminal.
    /// - [`RifaError::InvalidRaffle`] for a blank title or zero price.
    pub async fn update_raffle(&self, raffle_id: RaffleId, update: RaffleUpdate) -> Result<Raffle> {
        let entry = self.entry(raffle_id).await?;
        let mut guard = entry.write().await;

        if guard.raffle.status.is_frozen() {
            return Err(RifaError::RaffleFrozen { id: raffle_id });
        }
        if let Some(title) = &update.title {
            if title.trim().is_empty() {
                return Err(RifaError::InvalidRaffle {
                    reason: "title must not be blank".to_string(),
                });
            }
        }
        if let Some(price) = update.price {
            if price.is_zero() {
                return Err(RifaError::InvalidRaffle {
                    reason: "ticket price must be positive".to_string(),
                });
            }
        }

        if let Some(title) = update.title {
            guard.raffle.title = title;
        }
        if let Some(description) = update.description {
            guard.raffle.description = description;
        }
        if let Some(price) = update.price {
            guard.raffle.price = price;
        }
        if let Some(draw_date) = update.draw_date {
            guard.raffle.draw_date = draw_date;
        }

        info!(raffle_id = %raffle_id, "raffle updated");
        Ok(guard.raffle.clone())
    }

    /// Record the drawn winner and complete the raffle, freezing its
    /// pool. Returns the completed raffle and the request holding the
    /// winning number.
    ///
    /// # Errors
    ///
    /// - [`RifaError::RaffleNotFound`] when the ID is unknown.
    /// - [`RifaError::RaffleFrozen`] when the raffle is already terminal.
    /// - [`RifaError::NumberOutOfRange`] when the number is `>= T`.
    /// - [`RifaError::WinnerNotConfirmed`] unless the number is confirmed.
    pub async fn record_winner(
        &self,
        raffle_id: RaffleId,
        number: TicketNumber,
    ) -> Result<(Raffle, RequestId)> {
        let entry = self.entry(raffle_id).await?;
        let mut guard = entry.write().await;

        if guard.raffle.status.is_frozen() {
            return Err(RifaError::RaffleFrozen { id: raffle_id });
        }
        let holder = match guard.pool.hold(number)? {
            Some(hold) if matches!(hold.kind, HoldKind::Confirmation) => hold.request_id,
            _ => return Err(RifaError::WinnerNotConfirmed { number }),
        };

        guard.raffle.winning_number = Some(number);
        guard.raffle.status = RaffleStatus::Completed;

        metrics::counter!("ledger.winners_recorded").increment(1);
        info!(
            raffle_id = %raffle_id,
            number = %number,
            request_id = %holder,
            "winner recorded, raffle completed"
        );
        Ok((guard.raffle.clone(), holder))
    }

    // ========================================================================
    // Number Allocation
    // ========================================================================

    /// Atomically reserve `numbers` for `request_id`.
    ///
    /// Holds the raffle's write lock across the availability check and
    /// the mutation, so two overlapping reservations can never both
    /// succeed.
    ///
    /// # Errors
    ///
    /// - [`RifaError::RaffleNotFound`] when the raffle is unknown.
    /// - [`RifaError::RaffleNotOpen`] unless the raffle is `Active`.
    /// - Everything [`NumberPool::reserve`] raises.
    pub async fn reserve(
        &self,
        raffle_id: RaffleId,
        numbers: &BTreeSet<TicketNumber>,
        request_id: RequestId,
    ) -> Result<()> {
        let entry = self.entry(raffle_id).await?;
        let mut guard = entry.write().await;

        if !guard.raffle.status.accepts_entries() {
            return Err(RifaError::RaffleNotOpen {
                id: raffle_id,
                status: guard.raffle.status,
            });
        }

        match guard.pool.reserve(numbers, request_id) {
            Ok(()) => {
                metrics::counter!("ledger.reservations").increment(1);
                info!(
                    raffle_id = %raffle_id,
                    request_id = %request_id,
                    count = numbers.len(),
                    "numbers reserved"
                );
                Ok(())
            }
            Err(err) => {
                if err.is_conflict() {
                    metrics::counter!("ledger.conflicts").increment(1);
                    debug!(
                        raffle_id = %raffle_id,
                        request_id = %request_id,
                        %err,
                        "reservation conflict"
                    );
                }
                Err(err)
            }
        }
    }

    /// Permanently confirm `numbers` held by `request_id`.
    ///
    /// # Errors
    ///
    /// - [`RifaError::RaffleNotFound`] / [`RifaError::RaffleFrozen`].
    /// - Everything [`NumberPool::confirm`] raises.
    pub async fn confirm(
        &self,
        raffle_id: RaffleId,
        numbers: &BTreeSet<TicketNumber>,
        request_id: RequestId,
    ) -> Result<()> {
        let entry = self.entry(raffle_id).await?;
        let mut guard = entry.write().await;

        if guard.raffle.status.is_frozen() {
            return Err(RifaError::RaffleFrozen { id: raffle_id });
        }

        guard.pool.confirm(numbers, request_id)?;
        metrics::counter!("ledger.confirmations").increment(1);
        info!(
            raffle_id = %raffle_id,
            request_id = %request_id,
            count = numbers.len(),
            "numbers confirmed"
        );
        Ok(())
    }

    /// Return `numbers` held by `request_id` to availability.
    ///
    /// # Errors
    ///
    /// - [`RifaError::RaffleNotFound`] / [`RifaError::RaffleFrozen`].
    /// - Everything [`NumberPool::release`] raises.
    pub async fn release(
        &self,
        raffle_id: RaffleId,
        numbers: &BTreeSet<TicketNumber>,
        request_id: RequestId,
    ) -> Result<()> {
        let entry = self.entry(raffle_id).await?;
        let mut guard = entry.write().await;

        if guard.raffle.status.is_frozen() {
            return Err(RifaError::RaffleFrozen { id: raffle_id });
        }

        guard.pool.release(numbers, request_id)?;
        metrics::counter!("ledger.releases").increment(1);
        info!(
            raffle_id = %raffle_id,
            request_id = %request_id,
            count = numbers.len(),
            "numbers released"
        );
        Ok(())
    }

    // ========================================================================
    // Read Path
    // ========================================================================

    /// Capture the raffle's full number partition. Side-effect-free and
    /// concurrent with other reads.
    ///
    /// # Errors
    ///
    /// [`RifaError::RaffleNotFound`] when the ID is unknown.
    pub async fn snapshot(&self, raffle_id: RaffleId) -> Result<PoolSnapshot> {
        let entry = self.entry(raffle_id).await?;
        let guard = entry.read().await;
        Ok(guard.pool.snapshot())
    }

    /// Per-status totals for one raffle's pool.
    ///
    /// # Errors
    ///
    /// [`RifaError::RaffleNotFound`] when the ID is unknown.
    pub async fn pool_counts(&self, raffle_id: RaffleId) -> Result<PoolCounts> {
        let entry = self.entry(raffle_id).await?;
        let guard = entry.read().await;
        Ok(guard.pool.counts())
    }

    async fn entry(&self, raffle_id: RaffleId) -> Result<Arc<RwLock<RaffleEntry>>> {
        self.raffles
            .read()
            .await
            .get(&raffle_id)
            .cloned()
            .ok_or(RifaError::RaffleNotFound { id: raffle_id })
    }
}

fn validate_new_raffle(spec: &NewRaffle) -> Result<()> {
    if spec.title.trim().is_empty() {
        return Err(RifaError::InvalidRaffle {
            reason: "title must not be blank".to_string(),
        });
    }
    if spec.total_numbers == 0 {
        return Err(RifaError::InvalidRaffle {
            reason: "pool must contain at least one number".to_string(),
        });
    }
    if spec.total_numbers > MAX_TOTAL_NUMBERS {
        return Err(RifaError::InvalidRaffle {
            reason: format!("pool size is capped at {MAX_TOTAL_NUMBERS} numbers"),
        });
    }
    if spec.price.is_zero() {
        return Err(RifaError::InvalidRaffle {
            reason: "ticket price must be positive".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::Money;

    fn spec(total: u32) -> NewRaffle {
        NewRaffle {
            title: "Moto 2025".to_string(),
            description: "A motorcycle".to_string(),
            price: Money::from_dollars(8),
            total_numbers: total,
            draw_date: Utc::now(),
        }
    }

    fn numbers(values: &[u32]) -> BTreeSet<TicketNumber> {
        values.iter().copied().map(TicketNumber::new).collect()
    }

    async fn active_raffle(ledger: &ReservationLedger, total: u32) -> Raffle {
        let raffle = ledger.open_raffle(spec(total), Utc::now()).await.unwrap();
        ledger
            .set_raffle_status(raffle.id, RaffleStatus::Active)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn open_raffle_registers_a_fully_available_pool() {
        let ledger = ReservationLedger::new();
        let raffle = ledger.open_raffle(spec(10), Utc::now()).await.unwrap();

        assert_eq!(raffle.status, RaffleStatus::Draft);
        let snapshot = ledger.snapshot(raffle.id).await.unwrap();
        assert_eq!(snapshot.total, 10);
        assert_eq!(snapshot.available.len(), 10);
        assert!(snapshot.is_consistent());
    }

    #[tokio::test]
    async fn open_raffle_validates_its_inputs() {
        let ledger = ReservationLedger::new();

        let blank = NewRaffle {
            title: "  ".to_string(),
            ..spec(10)
        };
        assert!(matches!(
            ledger.open_raffle(blank, Utc::now()).await.unwrap_err(),
            RifaError::InvalidRaffle { .. }
        ));

        let empty_pool = NewRaffle {
            total_numbers: 0,
            ..spec(10)
        };
        assert!(matches!(
            ledger.open_raffle(empty_pool, Utc::now()).await.unwrap_err(),
            RifaError::InvalidRaffle { .. }
        ));

        let free = NewRaffle {
            price: Money::from_cents(0),
            ..spec(10)
        };
        assert!(matches!(
            ledger.open_raffle(free, Utc::now()).await.unwrap_err(),
            RifaError::InvalidRaffle { .. }
        ));
    }

    /// A pool request past the cap is refused before any arena is
    /// allocated; the cap itself is accepted.
    #[tokio::test]
    async fn open_raffle_caps_the_pool_size() {
        let ledger = ReservationLedger::new();

        let oversized = NewRaffle {
            total_numbers: MAX_TOTAL_NUMBERS + 1,
            ..spec(10)
        };
        assert!(matches!(
            ledger.open_raffle(oversized, Utc::now()).await.unwrap_err(),
            RifaError::InvalidRaffle { .. }
        ));

        let at_cap = NewRaffle {
            total_numbers: MAX_TOTAL_NUMBERS,
            ..spec(10)
        };
        let raffle = ledger.open_raffle(at_cap, Utc::now()).await.unwrap();
        assert_eq!(raffle.total_numbers, MAX_TOTAL_NUMBERS);
    }

    #[tokio::test]
    async fn draft_raffles_refuse_reservations() {
        let ledger = ReservationLedger::new();
        let raffle = ledger.open_raffle(spec(10), Utc::now()).await.unwrap();

        let err = ledger
            .reserve(raffle.id, &numbers(&[1]), RequestId::new())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RifaError::RaffleNotOpen {
                id: raffle.id,
                status: RaffleStatus::Draft
            }
        );
    }

    #[tokio::test]
    async fn reserve_confirm_release_round_trip() {
        let ledger = ReservationLedger::new();
        let raffle = active_raffle(&ledger, 10).await;

        let verified = RequestId::new();
        let rejected = RequestId::new();
        ledger.reserve(raffle.id, &numbers(&[1, 2]), verified).await.unwrap();
        ledger.reserve(raffle.id, &numbers(&[5]), rejected).await.unwrap();

        ledger.confirm(raffle.id, &numbers(&[1, 2]), verified).await.unwrap();
        ledger.release(raffle.id, &numbers(&[5]), rejected).await.unwrap();

        let snapshot = ledger.snapshot(raffle.id).await.unwrap();
        assert_eq!(snapshot.confirmed, numbers(&[1, 2]));
        assert!(snapshot.available.contains(&TicketNumber::new(5)));
        assert!(snapshot.reserved.is_empty());
    }

    #[tokio::test]
    async fn unknown_raffles_are_reported() {
        let ledger = ReservationLedger::new();
        let ghost = RaffleId::new();

        assert_eq!(
            ledger.snapshot(ghost).await.unwrap_err(),
            RifaError::RaffleNotFound { id: ghost }
        );
        assert_eq!(
            ledger
                .reserve(ghost, &numbers(&[0]), RequestId::new())
                .await
                .unwrap_err(),
            RifaError::RaffleNotFound { id: ghost }
        );
    }

    #[tokio::test]
    async fn closing_freezes_the_pool() {
        let ledger = ReservationLedger::new();
        let raffle = active_raffle(&ledger, 10).await;
        let request = RequestId::new();
        ledger.reserve(raffle.id, &numbers(&[3]), request).await.unwrap();

        ledger
            .set_raffle_status(raffle.id, RaffleStatus::Closed)
            .await
            .unwrap();

        let err = ledger
            .reserve(raffle.id, &numbers(&[4]), RequestId::new())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RifaError::RaffleNotOpen {
                id: raffle.id,
                status: RaffleStatus::Closed
            }
        );
        assert_eq!(
            ledger
                .confirm(raffle.id, &numbers(&[3]), request)
                .await
                .unwrap_err(),
            RifaError::RaffleFrozen { id: raffle.id }
        );
        assert_eq!(
            ledger
                .release(raffle.id, &numbers(&[3]), request)
                .await
                .unwrap_err(),
            RifaError::RaffleFrozen { id: raffle.id }
        );

        // Snapshots still work on frozen pools.
        let snapshot = ledger.snapshot(raffle.id).await.unwrap();
        assert!(snapshot.reserved.contains(&TicketNumber::new(3)));
    }

    #[tokio::test]
    async fn status_transitions_are_guarded() {
        let ledger = ReservationLedger::new();
        let raffle = ledger.open_raffle(spec(10), Utc::now()).await.unwrap();

        // Draft -> Active -> Inactive -> Active is the normal toggling.
        ledger.set_raffle_status(raffle.id, RaffleStatus::Active).await.unwrap();
        ledger.set_raffle_status(raffle.id, RaffleStatus::Inactive).await.unwrap();
        ledger.set_raffle_status(raffle.id, RaffleStatus::Active).await.unwrap();

        // Completed is reserved for the winner path; Draft is one-way.
        assert!(matches!(
            ledger
                .set_raffle_status(raffle.id, RaffleStatus::Completed)
                .await
                .unwrap_err(),
            RifaError::InvalidTransition { .. }
        ));
        assert!(matches!(
            ledger
                .set_raffle_status(raffle.id, RaffleStatus::Draft)
                .await
                .unwrap_err(),
            RifaError::InvalidTransition { .. }
        ));

        ledger.set_raffle_status(raffle.id, RaffleStatus::Closed).await.unwrap();
        assert_eq!(
            ledger
                .set_raffle_status(raffle.id, RaffleStatus::Active)
                .await
                .unwrap_err(),
            RifaError::RaffleFrozen { id: raffle.id }
        );
    }

    #[tokio::test]
    async fn record_winner_requires_a_confirmed_number() {
        let ledger = ReservationLedger::new();
        let raffle = active_raffle(&ledger, 10).await;
        let request = RequestId::new();
        ledger.reserve(raffle.id, &numbers(&[7]), request).await.unwrap();

        // Reserved is not enough.
        assert_eq!(
            ledger
                .record_winner(raffle.id, TicketNumber::new(7))
                .await
                .unwrap_err(),
            RifaError::WinnerNotConfirmed {
                number: TicketNumber::new(7)
            }
        );
        // Neither is available.
        assert_eq!(
            ledger
                .record_winner(raffle.id, TicketNumber::new(0))
                .await
                .unwrap_err(),
            RifaError::WinnerNotConfirmed {
                number: TicketNumber::new(0)
            }
        );

        ledger.confirm(raffle.id, &numbers(&[7]), request).await.unwrap();
        let (completed, holder) = ledger
            .record_winner(raffle.id, TicketNumber::new(7))
            .await
            .unwrap();
        assert_eq!(completed.status, RaffleStatus::Completed);
        assert_eq!(completed.winning_number, Some(TicketNumber::new(7)));
        assert_eq!(holder, request);

        // Completion is one-way.
        assert_eq!(
            ledger
                .record_winner(raffle.id, TicketNumber::new(7))
                .await
                .unwrap_err(),
            RifaError::RaffleFrozen { id: raffle.id }
        );
    }

    #[tokio::test]
    async fn update_edits_presentation_fields_only_while_live() {
        let ledger = ReservationLedger::new();
        let raffle = active_raffle(&ledger, 10).await;

        let updated = ledger
            .update_raffle(
                raffle.id,
                RaffleUpdate {
                    title: Some("Moto 2026".to_string()),
                    price: Some(Money::from_dollars(10)),
                    ..RaffleUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "Moto 2026");
        assert_eq!(updated.price, Money::from_dollars(10));
        assert_eq!(updated.total_numbers, 10);

        assert!(matches!(
            ledger
                .update_raffle(
                    raffle.id,
                    RaffleUpdate {
                        price: Some(Money::from_cents(0)),
                        ..RaffleUpdate::default()
                    }
                )
                .await
                .unwrap_err(),
            RifaError::InvalidRaffle { .. }
        ));

        ledger.set_raffle_status(raffle.id, RaffleStatus::Closed).await.unwrap();
        assert_eq!(
            ledger
                .update_raffle(raffle.id, RaffleUpdate::default())
                .await
                .unwrap_err(),
            RifaError::RaffleFrozen { id: raffle.id }
        );
    }

    #[tokio::test]
    async fn catalog_views_are_ordered_and_filtered() {
        let ledger = ReservationLedger::new();
        let later = NewRaffle {
            title: "B later".to_string(),
            draw_date: Utc::now() + chrono::Duration::days(30),
            ..spec(10)
        };
        let sooner = NewRaffle {
            title: "A sooner".to_string(),
            draw_date: Utc::now() + chrono::Duration::days(7),
            ..spec(10)
        };

        let b = ledger.open_raffle(later, Utc::now()).await.unwrap();
        let a = ledger.open_raffle(sooner, Utc::now()).await.unwrap();
        ledger.set_raffle_status(a.id, RaffleStatus::Active).await.unwrap();

        let all = ledger.list_raffles().await;
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, a.id);
        assert_eq!(all[1].id, b.id);

        let storefront = ledger.active_raffles().await;
        assert_eq!(storefront.len(), 1);
        assert_eq!(storefront[0].id, a.id);
    }
}
