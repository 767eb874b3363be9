//! Deterministic test support for the raffle core.
//!
//! Provides a manually advanced [`Clock`] so submission and resolution
//! timestamps are reproducible, a shared fixed starting instant, ready
//! made domain fixtures, and a small polling assertion helper for tests
//! that observe feeds.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use chrono::{DateTime, TimeZone, Utc};
use rifa_core::providers::Clock;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

/// The fixed instant tests start from: 2025-01-01 00:00:00 UTC.
#[must_use]
pub fn test_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Clock that only moves when a test tells it to.
#[derive(Debug)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    /// Start the clock at `start`.
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            millis: AtomicI64::new(start.timestamp_millis()),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, duration: chrono::Duration) {
        self.millis
            .fetch_add(duration.num_milliseconds(), Ordering::SeqCst);
    }

    /// Jump the clock to an absolute instant.
    pub fn set(&self, to: DateTime<Utc>) {
        self.millis.store(to.timestamp_millis(), Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(test_time())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst)).unwrap_or_default()
    }
}

/// Poll `check` every few milliseconds until it returns `true` or
/// `deadline` elapses. Returns whether the condition was met.
pub async fn wait_until<F>(deadline: Duration, check: F) -> bool
where
    F: Fn() -> bool,
{
    let started = tokio::time::Instant::now();
    loop {
        if check() {
            return true;
        }
        if started.elapsed() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Ready-made domain values that pass the core's validation.
pub mod fixtures {
    use super::test_time;
    use rifa_core::workflow::NewPurchase;
    use rifa_core::{
        BuyerInfo, DEFAULT_TICKET_PRICE, NewRaffle, PaymentMethod, ProofUpload, RaffleId,
        TicketNumber,
    };
    use std::collections::BTreeSet;

    /// An ordered number set from raw values.
    #[must_use]
    pub fn numbers(values: &[u32]) -> BTreeSet<TicketNumber> {
        values.iter().copied().map(TicketNumber::new).collect()
    }

    /// A buyer who passes identity validation.
    #[must_use]
    pub fn buyer(name: &str, email: &str) -> BuyerInfo {
        BuyerInfo {
            full_name: name.to_string(),
            email: email.to_string(),
            phone: "4129981122".to_string(),
        }
    }

    /// A tiny proof-of-payment upload.
    #[must_use]
    pub fn proof_upload() -> ProofUpload {
        ProofUpload {
            file_name: "receipt.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
            bytes: vec![0xFF, 0xD8, 0xFF, 0xE0],
        }
    }

    /// A raffle definition with storefront defaults: $8 tickets, drawn
    /// thirty days after [`test_time`](super::test_time).
    #[must_use]
    pub fn raffle_spec(title: &str, total_numbers: u32) -> NewRaffle {
        NewRaffle {
            title: title.to_string(),
            description: format!("{title} prize draw"),
            price: DEFAULT_TICKET_PRICE,
            total_numbers,
            draw_date: test_time() + chrono::Duration::days(30),
        }
    }

    /// A ready-to-submit purchase claiming `values` for `email`.
    #[must_use]
    pub fn purchase(raffle_id: RaffleId, values: &[u32], email: &str) -> NewPurchase {
        NewPurchase {
            raffle_id,
            quantity: values.len() as u32,
            numbers: numbers(values),
            buyer: buyer("Maria Gonzalez", email),
            method: PaymentMethod::MobilePayment,
            reference: "482913".to_string(),
            proof: proof_upload(),
        }
    }
}
