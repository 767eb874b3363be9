//! Mock notifier that records every dispatch.

use crate::error::{Result, RifaError};
use crate::providers::Notifier;
use crate::request::PurchaseRequest;
use crate::types::{Raffle, RaffleId, RequestId, TicketNumber};
use async_trait::async_trait;
use tokio::sync::Mutex;

/// One recorded notification attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationRecord {
    /// A verification outcome was dispatched.
    Verified {
        /// The verified request
        request_id: RequestId,
        /// Where it went
        email: String,
    },
    /// A rejection outcome was dispatched.
    Rejected {
        /// The rejected request
        request_id: RequestId,
        /// Where it went
        email: String,
        /// The reviewer's reason
        reason: String,
    },
    /// A winner announcement was dispatched.
    Winner {
        /// The completed raffle
        raffle_id: RaffleId,
        /// Where it went
        email: String,
        /// The drawn number
        number: Option<TicketNumber>,
    },
}

/// Notifier that records calls instead of delivering anything.
///
/// Attempts are recorded even in failing mode, so tests can distinguish
/// "never dispatched" from "dispatched but delivery failed".
#[derive(Debug, Default)]
pub struct MockNotifier {
    should_succeed: bool,
    sent: Mutex<Vec<NotificationRecord>>,
}

impl MockNotifier {
    /// Create a mock that reports successful delivery.
    #[must_use]
    pub fn new() -> Self {
        Self {
            should_succeed: true,
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock whose every dispatch fails.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            should_succeed: false,
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Every notification attempted so far, in order.
    pub async fn sent(&self) -> Vec<NotificationRecord> {
        self.sent.lock().await.clone()
    }

    /// How many notifications were attempted.
    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    async fn record(&self, record: NotificationRecord) -> Result<()> {
        self.sent.lock().await.push(record);
        if self.should_succeed {
            Ok(())
        } else {
            Err(RifaError::Notification {
                reason: "mock notifier configured to fail".to_string(),
            })
        }
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn request_verified(&self, request: &PurchaseRequest) -> Result<()> {
        self.record(NotificationRecord::Verified {
            request_id: request.id,
            email: request.buyer.email.clone(),
        })
        .await
    }

    async fn request_rejected(&self, request: &PurchaseRequest, reason: &str) -> Result<()> {
        self.record(NotificationRecord::Rejected {
            request_id: request.id,
            email: request.buyer.email.clone(),
            reason: reason.to_string(),
        })
        .await
    }

    async fn winner_declared(&self, raffle: &Raffle, winner: &PurchaseRequest) -> Result<()> {
        self.record(NotificationRecord::Winner {
            raffle_id: raffle.id,
            email: winner.buyer.email.clone(),
            number: raffle.winning_number,
        })
        .await
    }
}
