//! Buyer notification dispatch.

use crate::error::Result;
use crate::request::PurchaseRequest;
use crate::types::Raffle;
use async_trait::async_trait;
use tracing::info;

/// Delivers review outcomes to buyers.
///
/// Notification is strictly best-effort and post-commit: the workflow
/// invokes it after the ledger mutation has succeeded, and a delivery
/// failure never rolls that mutation back. Implementations must not
/// mutate core state.
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    /// Tell the buyer their payment was verified and which numbers are
    /// now permanently theirs.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RifaError::Notification`] when delivery fails;
    /// callers log and move on.
    async fn request_verified(&self, request: &PurchaseRequest) -> Result<()>;

    /// Tell the buyer their payment was refused and why.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RifaError::Notification`] when delivery fails;
    /// callers log and move on.
    async fn request_rejected(&self, request: &PurchaseRequest, reason: &str) -> Result<()>;

    /// Tell the winning buyer their number was drawn.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RifaError::Notification`] when delivery fails;
    /// callers log and move on.
    async fn winner_declared(&self, raffle: &Raffle, winner: &PurchaseRequest) -> Result<()>;
}

/// Notifier that prints to the console instead of sending anything.
///
/// Useful for development and demos where no delivery channel is wired
/// up.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl ConsoleNotifier {
    /// Create a new console notifier.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn request_verified(&self, request: &PurchaseRequest) -> Result<()> {
        info!(
            to = %request.buyer.email,
            request_id = %request.id,
            "📧 purchase verified (console notifier)"
        );
        println!("\n┌─ Purchase verified ───────────────────────────────");
        println!("│ to:      {}", request.buyer.email);
        println!("│ raffle:  {}", request.raffle_id);
        println!("│ numbers: {}", request.numbers_display());
        println!("└───────────────────────────────────────────────────\n");
        Ok(())
    }

    async fn request_rejected(&self, request: &PurchaseRequest, reason: &str) -> Result<()> {
        info!(
            to = %request.buyer.email,
            request_id = %request.id,
            reason = %reason,
            "📧 purchase rejected (console notifier)"
        );
        println!("\n┌─ Purchase rejected ───────────────────────────────");
        println!("│ to:      {}", request.buyer.email);
        println!("│ raffle:  {}", request.raffle_id);
        println!("│ reason:  {reason}");
        println!("└───────────────────────────────────────────────────\n");
        Ok(())
    }

    async fn winner_declared(&self, raffle: &Raffle, winner: &PurchaseRequest) -> Result<()> {
        let number = raffle
            .winning_number
            .map_or_else(|| "?".to_string(), |n| n.to_string());
        info!(
            to = %winner.buyer.email,
            raffle_id = %raffle.id,
            number = %number,
            "🏆 winner declared (console notifier)"
        );
        println!("\n┌─ You won! ────────────────────────────────────────");
        println!("│ to:      {}", winner.buyer.email);
        println!("│ raffle:  {}", raffle.title);
        println!("│ number:  {number}");
        println!("└───────────────────────────────────────────────────\n");
        Ok(())
    }
}
