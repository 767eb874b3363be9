//! Purchase requests: one buyer's claim on a set of ticket numbers.
//!
//! A request is created `Pending` when a buyer submits a claim and is
//! mutated only by the review workflow. Requests are never deleted;
//! rejected ones are retained for audit and to keep their identifiers
//! stable across mid-review races.

use crate::error::{Result, RifaError};
use crate::types::{BuyerInfo, PaymentProof, RaffleId, RequestId, RequestStatus, TicketNumber};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One buyer's claim on a set of ticket numbers, awaiting or past review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseRequest {
    /// Unique request ID
    pub id: RequestId,
    /// The raffle the numbers belong to
    pub raffle_id: RaffleId,
    /// Claimed numbers, ordered
    pub numbers: BTreeSet<TicketNumber>,
    /// Who is buying
    pub buyer: BuyerInfo,
    /// How they say they paid
    pub proof: PaymentProof,
    /// Review status
    pub status: RequestStatus,
    /// Reviewer's reason, set only when rejected
    pub rejection_reason: Option<String>,
    /// When the buyer submitted
    pub created_at: DateTime<Utc>,
    /// When a reviewer resolved the request
    pub resolved_at: Option<DateTime<Utc>>,
}

impl PurchaseRequest {
    /// Create a pending request. The numbers must already be reserved
    /// under the returned request's ID by the caller.
    #[must_use]
    pub fn new(
        id: RequestId,
        raffle_id: RaffleId,
        numbers: BTreeSet<TicketNumber>,
        buyer: BuyerInfo,
        proof: PaymentProof,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            raffle_id,
            numbers,
            buyer,
            proof,
            status: RequestStatus::Pending,
            rejection_reason: None,
            created_at: now,
            resolved_at: None,
        }
    }

    /// Whether the request still awaits review.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self.status, RequestStatus::Pending)
    }

    /// How many numbers this request claims.
    #[must_use]
    pub fn ticket_count(&self) -> u32 {
        self.numbers.len() as u32
    }

    /// The claimed numbers rendered for humans: `"2, 7, 13"`.
    #[must_use]
    pub fn numbers_display(&self) -> String {
        let rendered: Vec<String> = self.numbers.iter().map(ToString::to_string).collect();
        rendered.join(", ")
    }

    /// Case-insensitive match against the buyer's name or email.
    /// `needle` must already be lowercased.
    #[must_use]
    pub fn matches_buyer(&self, needle: &str) -> bool {
        self.buyer.full_name.to_lowercase().contains(needle)
            || self.buyer.email.to_lowercase().contains(needle)
    }

    /// Resolve to `Verified`. Terminal.
    ///
    /// # Errors
    ///
    /// [`RifaError::AlreadyResolved`] when the request is not pending.
    pub(crate) fn resolve_verified(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.check_pending()?;
        self.status = RequestStatus::Verified;
        self.resolved_at = Some(now);
        Ok(())
    }

    /// Resolve to `Rejected` with a reviewer-supplied reason. Terminal.
    ///
    /// # Errors
    ///
    /// - [`RifaError::EmptyReason`] when the trimmed reason is empty;
    ///   the request stays pending.
    /// - [`RifaError::AlreadyResolved`] when the request is not pending.
    pub(crate) fn resolve_rejected(&mut self, reason: &str, now: DateTime<Utc>) -> Result<()> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(RifaError::EmptyReason);
        }
        self.check_pending()?;
        self.status = RequestStatus::Rejected;
        self.rejection_reason = Some(reason.to_string());
        self.resolved_at = Some(now);
        Ok(())
    }

    fn check_pending(&self) -> Result<()> {
        if self.is_pending() {
            Ok(())
        } else {
            Err(RifaError::AlreadyResolved {
                request_id: self.id,
                status: self.status,
            })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{ArtifactRef, PaymentMethod};

    fn sample_request() -> PurchaseRequest {
        PurchaseRequest::new(
            RequestId::new(),
            RaffleId::new(),
            [2, 7, 13].into_iter().map(TicketNumber::new).collect(),
            BuyerInfo {
                full_name: "Maria Gonzalez".to_string(),
                email: "maria@example.com".to_string(),
                phone: "4121234567".to_string(),
            },
            PaymentProof {
                method: PaymentMethod::MobilePayment,
                reference: "482913".to_string(),
                artifact: ArtifactRef::new("proofs/482913.jpg".to_string()),
            },
            Utc::now(),
        )
    }

    #[test]
    fn new_requests_start_pending_and_unresolved() {
        let request = sample_request();
        assert!(request.is_pending());
        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.rejection_reason, None);
        assert_eq!(request.resolved_at, None);
        assert_eq!(request.ticket_count(), 3);
    }

    #[test]
    fn verify_is_terminal() {
        let mut request = sample_request();
        let resolved_at = Utc::now();
        request.resolve_verified(resolved_at).unwrap();
        assert_eq!(request.status, RequestStatus::Verified);
        assert_eq!(request.resolved_at, Some(resolved_at));

        let err = request.resolve_verified(Utc::now()).unwrap_err();
        assert_eq!(
            err,
            RifaError::AlreadyResolved {
                request_id: request.id,
                status: RequestStatus::Verified
            }
        );
    }

    #[test]
    fn reject_stores_the_trimmed_reason() {
        let mut request = sample_request();
        request
            .resolve_rejected("  reference not found in statement  ", Utc::now())
            .unwrap();
        assert_eq!(request.status, RequestStatus::Rejected);
        assert_eq!(
            request.rejection_reason.as_deref(),
            Some("reference not found in statement")
        );
    }

    #[test]
    fn reject_requires_a_reason_and_leaves_the_request_pending() {
        let mut request = sample_request();
        for empty in ["", "   ", "\t\n"] {
            let err = request.resolve_rejected(empty, Utc::now()).unwrap_err();
            assert_eq!(err, RifaError::EmptyReason);
        }
        assert!(request.is_pending());
        assert_eq!(request.rejection_reason, None);
    }

    #[test]
    fn resolving_a_rejected_request_reports_its_terminal_status() {
        let mut request = sample_request();
        request.resolve_rejected("no payment", Utc::now()).unwrap();

        let err = request.resolve_verified(Utc::now()).unwrap_err();
        assert_eq!(
            err,
            RifaError::AlreadyResolved {
                request_id: request.id,
                status: RequestStatus::Rejected
            }
        );
    }

    #[test]
    fn numbers_render_in_ascending_order() {
        let request = sample_request();
        assert_eq!(request.numbers_display(), "2, 7, 13");
    }

    #[test]
    fn buyer_matching_is_case_insensitive() {
        let request = sample_request();
        assert!(request.matches_buyer("maria"));
        assert!(request.matches_buyer("gonzalez"));
        assert!(request.matches_buyer("@example.com"));
        assert!(!request.matches_buyer("nobody"));
    }
}
