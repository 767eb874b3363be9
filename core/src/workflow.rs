//! The review workflow: submissions in, reviewer decisions out.
//!
//! This is the service façade the transport layer calls. It owns the
//! purchase-request table, drives every ledger mutation that a request's
//! lifecycle implies, and isolates collaborator failures: proof storage
//! fails a submission closed (a reservation without proof is
//! meaningless), while notification failures are logged and never roll
//! back a committed decision.

use crate::config::CoreConfig;
use crate::error::{Result, RifaError};
use crate::ledger::ReservationLedger;
use crate::providers::{Clock, Notifier, ProofStore};
use crate::request::PurchaseRequest;
use crate::types::{
    BuyerInfo, NewRaffle, PaymentMethod, PaymentProof, ProofUpload, Raffle, RaffleId, RequestId,
    RequestStatus, TicketNumber,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

// ============================================================================
// Environment
// ============================================================================

/// Collaborators and configuration the workflow depends on.
#[derive(Clone)]
pub struct WorkflowEnvironment {
    /// Delivers review outcomes to buyers. Best-effort.
    pub notifier: Arc<dyn Notifier>,
    /// Persists proof-of-payment artifacts. Fail-closed for submissions.
    pub proof_store: Arc<dyn ProofStore>,
    /// Source of submission/resolution timestamps.
    pub clock: Arc<dyn Clock>,
    /// Tunables (minimum ticket count, poll cadences).
    pub config: CoreConfig,
}

impl WorkflowEnvironment {
    /// Bundle the workflow's collaborators.
    #[must_use]
    pub fn new(
        notifier: Arc<dyn Notifier>,
        proof_store: Arc<dyn ProofStore>,
        clock: Arc<dyn Clock>,
        config: CoreConfig,
    ) -> Self {
        Self {
            notifier,
            proof_store,
            clock,
            config,
        }
    }
}

impl std::fmt::Debug for WorkflowEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowEnvironment")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Inputs & Views
// ============================================================================

/// A buyer's submission: which numbers, who they are, how they paid.
#[derive(Debug, Clone)]
pub struct NewPurchase {
    /// Target raffle
    pub raffle_id: RaffleId,
    /// Declared ticket count; must equal `numbers.len()`
    pub quantity: u32,
    /// The exact numbers the buyer picked
    pub numbers: BTreeSet<TicketNumber>,
    /// Buyer identity
    pub buyer: BuyerInfo,
    /// Payment channel
    pub method: PaymentMethod,
    /// Bank reference code (six digits)
    pub reference: String,
    /// Proof-of-payment upload
    pub proof: ProofUpload,
}

/// One row of the buyer's "find my tickets" view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketLookup {
    /// The underlying purchase request
    pub request_id: RequestId,
    /// Which raffle the tickets belong to
    pub raffle_id: RaffleId,
    /// Raffle title at lookup time
    pub raffle_title: String,
    /// When the draw happens
    pub draw_date: DateTime<Utc>,
    /// The claimed numbers
    pub numbers: BTreeSet<TicketNumber>,
    /// Review status of the claim
    pub status: RequestStatus,
    /// Reviewer's reason, when rejected
    pub rejection_reason: Option<String>,
}

// ============================================================================
// Review Workflow
// ============================================================================

/// Reviewer-facing state machine over purchase requests.
///
/// Requests enter `Pending` through [`Self::submit`] and leave it only
/// through an explicit [`Self::verify`] or [`Self::reject`]; there is no
/// automatic expiry. The request table is never pruned.
pub struct ReviewWorkflow {
    ledger: Arc<ReservationLedger>,
    requests: RwLock<HashMap<RequestId, PurchaseRequest>>,
    environment: WorkflowEnvironment,
}

impl ReviewWorkflow {
    /// Create a workflow over `ledger`.
    #[must_use]
    pub fn new(ledger: Arc<ReservationLedger>, environment: WorkflowEnvironment) -> Self {
        Self {
            ledger,
            requests: RwLock::new(HashMap::new()),
            environment,
        }
    }

    /// The ledger this workflow mutates. Read access for feeds, stats,
    /// and raffle administration.
    #[must_use]
    pub fn ledger(&self) -> Arc<ReservationLedger> {
        Arc::clone(&self.ledger)
    }

    /// The workflow's configuration.
    #[must_use]
    pub const fn config(&self) -> &CoreConfig {
        &self.environment.config
    }

    /// Open a new raffle, stamped with the workflow's clock.
    ///
    /// # Errors
    ///
    /// Everything [`ReservationLedger::open_raffle`] raises.
    pub async fn open_raffle(&self, spec: NewRaffle) -> Result<Raffle> {
        let now = self.environment.clock.now();
        self.ledger.open_raffle(spec, now).await
    }

    // ========================================================================
    // Submission
    // ========================================================================

    /// Submit a buyer's claim on a set of numbers.
    ///
    /// Validation happens first and touches nothing. The proof artifact
    /// is then stored; a storage failure aborts the submission before
    /// any reservation exists. Only then is the reservation attempted,
    /// all-or-nothing. On a conflict the buyer's selection is stale:
    /// the stored artifact is discarded best-effort and the error is
    /// surfaced so the caller re-presents fresh availability. Numbers
    /// are never silently substituted.
    ///
    /// # Errors
    ///
    /// - Validation: [`RifaError::InvalidBuyer`],
    ///   [`RifaError::InvalidProof`], [`RifaError::BelowMinimum`],
    ///   [`RifaError::TicketCountMismatch`],
    ///   [`RifaError::NumberOutOfRange`].
    /// - [`RifaError::RaffleNotFound`] / [`RifaError::RaffleNotOpen`].
    /// - [`RifaError::ProofStorage`] when the artifact cannot be stored.
    /// - [`RifaError::Conflict`] when any number was taken meanwhile.
    pub async fn submit(&self, purchase: NewPurchase) -> Result<PurchaseRequest> {
        validate_buyer(&purchase.buyer)?;
        let reference = validate_reference(&purchase.reference)?;
        self.validate_ticket_count(&purchase)?;

        // Cheap pre-checks against the raffle before paying for proof
        // storage. The authoritative availability check still happens
        // inside the ledger's per-raffle lock.
        let raffle = self.ledger.raffle(purchase.raffle_id).await?;
        if !raffle.status.accepts_entries() {
            return Err(RifaError::RaffleNotOpen {
                id: raffle.id,
                status: raffle.status,
            });
        }
        for number in &purchase.numbers {
            if !raffle.contains_number(*number) {
                return Err(RifaError::NumberOutOfRange {
                    number: *number,
                    total: raffle.total_numbers,
                });
            }
        }

        let artifact = self.environment.proof_store.store(purchase.proof).await?;

        let request_id = RequestId::new();
        if let Err(err) = self
            .ledger
            .reserve(purchase.raffle_id, &purchase.numbers, request_id)
            .await
        {
            if let Err(discard_err) = self.environment.proof_store.discard(&artifact).await {
                warn!(
                    artifact = %artifact,
                    error = %discard_err,
                    "could not discard proof after failed reservation"
                );
            }
            return Err(err);
        }

        let request = PurchaseRequest::new(
            request_id,
            purchase.raffle_id,
            purchase.numbers,
            purchase.buyer,
            PaymentProof {
                method: purchase.method,
                reference,
                artifact,
            },
            self.environment.clock.now(),
        );
        self.requests
            .write()
            .await
            .insert(request.id, request.clone());

        metrics::counter!("workflow.submissions").increment(1);
        info!(
            request_id = %request.id,
            raffle_id = %request.raffle_id,
            buyer = %request.buyer.email,
            numbers = %request.numbers_display(),
            "purchase submitted"
        );
        Ok(request)
    }

    // ========================================================================
    // Review Decisions
    // ========================================================================

    /// Accept a pending request: its numbers become confirmed forever
    /// and the buyer is notified exactly once, best-effort.
    ///
    /// # Errors
    ///
    /// - [`RifaError::RequestNotFound`] when the ID is unknown.
    /// - [`RifaError::AlreadyResolved`] when the request left `Pending`.
    /// - Everything [`ReservationLedger::confirm`] raises.
    pub async fn verify(&self, request_id: RequestId) -> Result<PurchaseRequest> {
        let resolved = {
            let mut requests = self.requests.write().await;
            let request = requests
                .get_mut(&request_id)
                .ok_or(RifaError::RequestNotFound { id: request_id })?;
            if !request.is_pending() {
                return Err(RifaError::AlreadyResolved {
                    request_id,
                    status: request.status,
                });
            }

            self.ledger
                .confirm(request.raffle_id, &request.numbers, request.id)
                .await?;
            request.resolve_verified(self.environment.clock.now())?;
            request.clone()
        };

        metrics::counter!("workflow.verifications").increment(1);
        info!(
            request_id = %request_id,
            raffle_id = %resolved.raffle_id,
            "purchase verified"
        );
        if let Err(err) = self.environment.notifier.request_verified(&resolved).await {
            warn!(
                request_id = %request_id,
                error = %err,
                "verification notice failed; the confirmation stands"
            );
        }
        Ok(resolved)
    }

    /// Refuse a pending request with a reason: its numbers return to
    /// the pool and the buyer is told why, best-effort.
    ///
    /// # Errors
    ///
    /// - [`RifaError::EmptyReason`] when the trimmed reason is empty;
    ///   raised before anything is touched.
    /// - [`RifaError::RequestNotFound`] / [`RifaError::AlreadyResolved`].
    /// - Everything [`ReservationLedger::release`] raises.
    pub async fn reject(&self, request_id: RequestId, reason: &str) -> Result<PurchaseRequest> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(RifaError::EmptyReason);
        }

        let resolved = {
            let mut requests = self.requests.write().await;
            let request = requests
                .get_mut(&request_id)
                .ok_or(RifaError::RequestNotFound { id: request_id })?;
            if !request.is_pending() {
                return Err(RifaError::AlreadyResolved {
                    request_id,
                    status: request.status,
                });
            }

            self.ledger
                .release(request.raffle_id, &request.numbers, request.id)
                .await?;
            request.resolve_rejected(reason, self.environment.clock.now())?;
            request.clone()
        };

        metrics::counter!("workflow.rejections").increment(1);
        info!(
            request_id = %request_id,
            raffle_id = %resolved.raffle_id,
            reason = %reason,
            "purchase rejected"
        );
        if let Err(err) = self
            .environment
            .notifier
            .request_rejected(&resolved, reason)
            .await
        {
            warn!(
                request_id = %request_id,
                error = %err,
                "rejection notice failed; the release stands"
            );
        }
        Ok(resolved)
    }

    /// Record the externally drawn winning number, completing the raffle
    /// and notifying the winning buyer best-effort. One-way.
    ///
    /// # Errors
    ///
    /// Everything [`ReservationLedger::record_winner`] raises; in
    /// particular [`RifaError::WinnerNotConfirmed`] when the number is
    /// not a confirmed ticket.
    pub async fn declare_winner(
        &self,
        raffle_id: RaffleId,
        number: TicketNumber,
    ) -> Result<Raffle> {
        let (raffle, holder) = self.ledger.record_winner(raffle_id, number).await?;

        metrics::counter!("workflow.winners_declared").increment(1);
        let winner = self.requests.read().await.get(&holder).cloned();
        match winner {
            Some(request) => {
                if let Err(err) = self
                    .environment
                    .notifier
                    .winner_declared(&raffle, &request)
                    .await
                {
                    warn!(
                        raffle_id = %raffle_id,
                        request_id = %holder,
                        error = %err,
                        "winner notice failed; the completion stands"
                    );
                }
            }
            None => warn!(
                raffle_id = %raffle_id,
                request_id = %holder,
                "winning request is not in the table; no notice sent"
            ),
        }
        Ok(raffle)
    }

    // ========================================================================
    // Read Path
    // ========================================================================

    /// Fetch one request by ID.
    ///
    /// # Errors
    ///
    /// [`RifaError::RequestNotFound`] when the ID is unknown.
    pub async fn request(&self, request_id: RequestId) -> Result<PurchaseRequest> {
        self.requests
            .read()
            .await
            .get(&request_id)
            .cloned()
            .ok_or(RifaError::RequestNotFound { id: request_id })
    }

    /// The reviewer queue: requests of one raffle in one status, oldest
    /// first.
    pub async fn list_by_status(
        &self,
        raffle_id: RaffleId,
        status: RequestStatus,
    ) -> Vec<PurchaseRequest> {
        let requests = self.requests.read().await;
        let mut matching: Vec<PurchaseRequest> = requests
            .values()
            .filter(|request| request.raffle_id == raffle_id && request.status == status)
            .cloned()
            .collect();
        sort_queue(&mut matching);
        matching
    }

    /// Queue filter across all raffles: requests in `status` whose buyer
    /// name, buyer email, or raffle title contains `query`
    /// (case-insensitive). A blank query matches everything.
    pub async fn search(&self, status: RequestStatus, query: &str) -> Vec<PurchaseRequest> {
        let needle = query.trim().to_lowercase();

        let mut matching: Vec<PurchaseRequest> = {
            let requests = self.requests.read().await;
            requests
                .values()
                .filter(|request| request.status == status)
                .cloned()
                .collect()
        };
        sort_queue(&mut matching);
        if needle.is_empty() {
            return matching;
        }

        let mut titles: HashMap<RaffleId, String> = HashMap::new();
        for request in &matching {
            if let std::collections::hash_map::Entry::Vacant(slot) = titles.entry(request.raffle_id)
            {
                if let Ok(raffle) = self.ledger.raffle(request.raffle_id).await {
                    slot.insert(raffle.title.to_lowercase());
                }
            }
        }

        matching
            .into_iter()
            .filter(|request| {
                request.matches_buyer(&needle)
                    || titles
                        .get(&request.raffle_id)
                        .is_some_and(|title| title.contains(&needle))
            })
            .collect()
    }

    /// The buyer's "find my tickets" view: every claim submitted under
    /// `email` (exact, case-insensitive), across raffles, oldest first.
    pub async fn find_by_email(&self, email: &str) -> Vec<TicketLookup> {
        let needle = email.trim().to_lowercase();

        let mut matching: Vec<PurchaseRequest> = {
            let requests = self.requests.read().await;
            requests
                .values()
                .filter(|request| request.buyer.email.to_lowercase() == needle)
                .cloned()
                .collect()
        };
        sort_queue(&mut matching);

        let mut lookups = Vec::with_capacity(matching.len());
        for request in matching {
            let (raffle_title, draw_date) = match self.ledger.raffle(request.raffle_id).await {
                Ok(raffle) => (raffle.title, raffle.draw_date),
                Err(_) => (String::new(), request.created_at),
            };
            lookups.push(TicketLookup {
                request_id: request.id,
                raffle_id: request.raffle_id,
                raffle_title,
                draw_date,
                numbers: request.numbers,
                status: request.status,
                rejection_reason: request.rejection_reason,
            });
        }
        lookups
    }

    fn validate_ticket_count(&self, purchase: &NewPurchase) -> Result<()> {
        let minimum = self.environment.config.min_ticket_count;
        if purchase.quantity < minimum {
            return Err(RifaError::BelowMinimum {
                minimum,
                requested: purchase.quantity,
            });
        }
        let actual = purchase.numbers.len() as u32;
        if actual != purchase.quantity {
            return Err(RifaError::TicketCountMismatch {
                expected: purchase.quantity,
                actual,
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for ReviewWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReviewWorkflow")
            .field("environment", &self.environment)
            .finish_non_exhaustive()
    }
}

fn sort_queue(requests: &mut [PurchaseRequest]) {
    requests.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.as_uuid().cmp(b.id.as_uuid()))
    });
}

// ============================================================================
// Input Validation
// ============================================================================

fn validate_buyer(buyer: &BuyerInfo) -> Result<()> {
    if buyer.full_name.trim().chars().count() < 3 {
        return Err(RifaError::InvalidBuyer {
            reason: "full name must be at least 3 characters".to_string(),
        });
    }
    if !is_plausible_email(buyer.email.trim()) {
        return Err(RifaError::InvalidBuyer {
            reason: "email address looks invalid".to_string(),
        });
    }
    if !is_plausible_phone(&buyer.phone) {
        return Err(RifaError::InvalidBuyer {
            reason: "phone must contain 9 or 10 digits".to_string(),
        });
    }
    Ok(())
}

fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    domain
        .split_once('.')
        .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
}

fn is_plausible_phone(phone: &str) -> bool {
    let digits: Vec<char> = phone
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '+'))
        .collect();
    (9..=10).contains(&digits.len()) && digits.iter().all(char::is_ascii_digit)
}

fn validate_reference(raw: &str) -> Result<String> {
    let reference = raw.trim();
    if reference.len() == 6 && reference.chars().all(|c| c.is_ascii_digit()) {
        Ok(reference.to_string())
    } else {
        Err(RifaError::InvalidProof {
            reason: "payment reference must be exactly 6 digits".to_string(),
        })
    }
}
